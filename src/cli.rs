//! 命令行参数定义

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::{AnalysisScope, ReportStatus, ScopeLevel};

#[derive(Debug, Parser)]
#[command(name = "edu-insight", version, about = "EduInsight 分析系统命令行客户端")]
pub struct Cli {
    /// TOML 配置文件
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// 覆盖后端地址
    #[arg(long, global = true)]
    pub api: Option<String>,

    /// 显示详细日志
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 分页列出分析报告
    Reports {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        page_size: u32,
        /// 报告名称关键字
        #[arg(long)]
        query: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// 查看单个报告
    Report { id: i64 },
    /// 提交分析任务
    Submit {
        #[arg(long)]
        exam_id: i64,
        /// 报告名称
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value_t = LevelArg::FullExam)]
        level: LevelArg,
        /// 年级或班级ID，逗号分隔
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
        /// 只提交，不等待结果
        #[arg(long)]
        no_wait: bool,
    },
    /// 等待报告分析完成
    Wait { id: i64 },
    /// 请求并等待 AI 分析
    Ai { id: i64 },
    /// 重试失败的分析任务
    Retry { id: i64 },
    /// 删除报告
    Delete { id: i64 },
    /// 多场考试对比分析
    Compare {
        #[arg(required = true, num_args = 2..)]
        ids: Vec<i64>,
        #[arg(long)]
        name: Option<String>,
    },
    /// 列出考试
    Exams,
    /// 定稿考试
    Finalize { exam_id: i64 },
    /// 解锁考试
    Unlock { exam_id: i64 },
    /// 年级-班级树
    Tree,
    /// 查看班级成绩表
    Scores { exam_id: i64, class_id: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    FullExam,
    Grade,
    Class,
}

impl LevelArg {
    pub fn scope(self, ids: Vec<i64>) -> AnalysisScope {
        let level = match self {
            LevelArg::FullExam => ScopeLevel::FullExam,
            LevelArg::Grade => ScopeLevel::Grade,
            LevelArg::Class => ScopeLevel::Class,
        };
        AnalysisScope { level, ids }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Submitted,
    Processing,
    Completed,
    Failed,
}

impl From<StatusArg> for ReportStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Submitted => ReportStatus::Submitted,
            StatusArg::Processing => ReportStatus::Processing,
            StatusArg::Completed => ReportStatus::Completed,
            StatusArg::Failed => ReportStatus::Failed,
        }
    }
}
