use anyhow::Result;
use clap::Parser;

use edu_insight_client::cli::Cli;
use edu_insight_client::utils::logging;
use edu_insight_client::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置：默认值 < 配置文件 < 环境变量 < 命令行
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(api) = cli.api {
        config.api_base_url = api;
        config.validate()?;
    }
    config.verbose_logging |= cli.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config)?.run(cli.command).await
}
