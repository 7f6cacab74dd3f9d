//! API 模块
//!
//! 负责所有与后端 REST 接口的交互，每个函数对应一个接口

pub mod analysis;
pub mod exams;
pub mod roster;

// 重新导出常用函数
pub use analysis::{
    create_comparison, delete_report, get_report, list_reports, retry_analysis,
    submit_ai_analysis, submit_analysis,
};
pub use exams::{
    create_exam, delete_exam, finalize_exam, get_exam, list_exams, record_scores_batch,
    record_single_score, scores_for_class, unlock_exam,
};
pub use roster::class_tree;
