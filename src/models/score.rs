use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// 单个学生在一场考试中的各科成绩
///
/// `None` 表示该科尚未录入（或缺考）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentScores {
    pub student_id: i64,
    #[serde(default)]
    pub subject_scores: BTreeMap<String, Option<f64>>,
}

impl StudentScores {
    pub fn new(student_id: i64) -> Self {
        Self {
            student_id,
            subject_scores: BTreeMap::new(),
        }
    }

    pub fn score(&self, subject: &str) -> Option<f64> {
        self.subject_scores.get(subject).copied().flatten()
    }

    /// 已录入科目的总分
    pub fn total(&self) -> f64 {
        self.subject_scores.values().flatten().sum()
    }
}

/// 批量录入请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoresBatch {
    pub exam_id: i64,
    pub scores: Vec<StudentScores>,
}

impl ScoresBatch {
    pub fn validate(&self) -> Result<()> {
        if self.scores.is_empty() {
            return Err(ClientError::Validation("没有可以录入的成绩".to_string()));
        }
        Ok(())
    }
}

/// 单个成绩录入（自动保存）请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleScoreUpdate {
    pub exam_id: i64,
    pub student_id: i64,
    pub subject_name: String,
    pub score: Option<f64>,
}

/// 成绩接口返回的提示消息
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
