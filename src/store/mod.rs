//! 客户端状态仓库
//!
//! 每个仓库都是显式创建、显式销毁的上下文对象，不使用全局单例

pub mod report_store;
pub mod roster_store;
pub mod score_sheet;

pub use report_store::{Notice, NoticeLevel, ReportStore, WatchKind};
pub use roster_store::RosterStore;
pub use score_sheet::{parse_cell, ScoreSheet};
