//! # EduInsight Client
//!
//! 学校成绩分析系统（EduInsight）的异步 Rust 客户端
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 HTTP 连接池，只暴露能力
//! - `ApiClient` - 统一的请求入口：拼接地址、解析 JSON、拦截错误
//!
//! ### ② 接口层（Api）
//! - `api/` - 每个函数对应一个后端接口，不持有状态
//! - `analysis` - 分析报告、AI 分析、对比分析
//! - `exams` - 考试与成绩
//! - `roster` - 年级、班级、学生
//!
//! ### ③ 服务层（Services）
//! - `services/polling` - 通用状态轮询：间隔、超时、终态、停止
//! - `services/report_service` - 报告分析与 AI 分析的等待流程
//!
//! ### ④ 状态层（Store）
//! - `store/` - 显式创建、显式销毁的客户端状态仓库
//!
//! ### ⑤ 编排层（App）
//! - `cli` / `app` - 命令行入口，把命令分派给上面各层

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{ClientError, ConfigError, Result};
pub use infrastructure::ApiClient;
pub use models::{AiAnalysisStatus, AnalysisReport, ReportStatus};
pub use services::{AiAnalysisOutcome, PollFailure, PollHandle, PollOptions, Poller, ReportService};
pub use store::{ReportStore, RosterStore, ScoreSheet};
