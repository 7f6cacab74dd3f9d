use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 程序配置
///
/// 加载顺序：默认值 → TOML 文件（可选）→ 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 根地址
    pub api_base_url: String,
    /// 单次 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 报告主状态轮询 ---
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    // --- AI 分析状态轮询 ---
    pub ai_poll_interval_ms: u64,
    pub ai_poll_timeout_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件（为空则不写文件头）
    pub output_log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 30,
            poll_interval_ms: 3_000,
            poll_timeout_ms: 120_000,
            ai_poll_interval_ms: 5_000,
            ai_poll_timeout_ms: 180_000,
            verbose_logging: false,
            output_log_file: None,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 完整加载：文件（可选）→ 环境变量 → 校验
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            api_base_url: std::env::var("EDU_API_BASE_URL").unwrap_or(self.api_base_url),
            request_timeout_secs: env_parse("EDU_REQUEST_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs),
            poll_interval_ms: env_parse("EDU_POLL_INTERVAL_MS").unwrap_or(self.poll_interval_ms),
            poll_timeout_ms: env_parse("EDU_POLL_TIMEOUT_MS").unwrap_or(self.poll_timeout_ms),
            ai_poll_interval_ms: env_parse("EDU_AI_POLL_INTERVAL_MS").unwrap_or(self.ai_poll_interval_ms),
            ai_poll_timeout_ms: env_parse("EDU_AI_POLL_TIMEOUT_MS").unwrap_or(self.ai_poll_timeout_ms),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").ok().or(self.output_log_file),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if reqwest::Url::parse(&self.api_base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "api_base_url 不是合法地址: {}",
                self.api_base_url
            )));
        }
        let timings = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("poll_interval_ms", self.poll_interval_ms),
            ("poll_timeout_ms", self.poll_timeout_ms),
            ("ai_poll_interval_ms", self.ai_poll_interval_ms),
            ("ai_poll_timeout_ms", self.ai_poll_timeout_ms),
        ];
        if let Some((name, _)) = timings.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{} 必须大于 0", name)));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
