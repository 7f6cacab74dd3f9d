use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// 考试状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    /// 草稿：可录入、修改成绩
    Draft,
    /// 已提交全校分析
    Submitted,
    /// 已定稿
    Completed,
    #[serde(other)]
    Unknown,
}

impl ExamStatus {
    /// 只有草稿状态允许修改成绩
    pub fn is_editable(self) -> bool {
        self == ExamStatus::Draft
    }

    pub fn label(self) -> &'static str {
        match self {
            ExamStatus::Draft => "草稿",
            ExamStatus::Submitted => "已提交",
            ExamStatus::Completed => "已定稿",
            ExamStatus::Unknown => "未知",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub name: String,
    pub exam_date: NaiveDate,
    pub status: ExamStatus,
}

/// 考试学科及满分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamSubject {
    pub name: String,
    pub full_mark: f64,
}

/// 考试详情（含学科列表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamDetail {
    pub id: i64,
    pub name: String,
    pub exam_date: NaiveDate,
    pub status: ExamStatus,
    #[serde(default)]
    pub subjects: Vec<ExamSubject>,
}

impl ExamDetail {
    pub fn subject(&self, name: &str) -> Option<&ExamSubject> {
        self.subjects.iter().find(|s| s.name == name)
    }
}

/// 创建考试（草稿）的请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamCreate {
    pub name: String,
    pub exam_date: NaiveDate,
    pub subjects: Vec<ExamSubject>,
}

impl ExamCreate {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ClientError::Validation("考试名称不能为空".to_string()));
        }
        if let Some(bad) = self.subjects.iter().find(|s| s.full_mark.is_nan() || s.full_mark <= 0.0) {
            return Err(ClientError::Validation(format!(
                "学科 '{}' 的满分必须大于0",
                bad.name
            )));
        }
        let mut names: Vec<&str> = self.subjects.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if let Some(w) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ClientError::Validation(format!("学科 '{}' 重复", w[0])));
        }
        Ok(())
    }
}
