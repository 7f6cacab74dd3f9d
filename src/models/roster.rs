//! 年级 / 班级 / 学生模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCreate {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub enrollment_year: i32,
    pub grade_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCreate {
    pub name: String,
    pub enrollment_year: i32,
    pub grade_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_year: Option<i32>,
}

/// 树状结构中的班级节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    pub id: i64,
    pub name: String,
    pub student_count: u32,
    pub enrollment_year: i32,
}

/// 年级-班级树的年级节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeTree {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub classes: Vec<ClassNode>,
}

impl GradeTree {
    pub fn student_count(&self) -> u32 {
        self.classes.iter().map(|c| c.student_count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub student_no: String,
    pub name: String,
    pub class_id: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentCreate {
    pub name: String,
    pub class_id: i64,
}

impl StudentCreate {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ClientError::Validation("学生姓名不能为空".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<i64>,
}

/// 批量启用 / 停用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentBatchStatusUpdate {
    pub student_ids: Vec<i64>,
    pub is_active: bool,
}

/// 批量分班 / 升学
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentBatchClassUpdate {
    pub student_ids: Vec<i64>,
    pub target_class_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentDetail {
    pub id: i64,
    pub student_no: String,
    pub name: String,
    pub class_id: i64,
    pub is_active: bool,
    pub grade_name: String,
    pub class_name: String,
    pub enrollment_year: i32,
}

/// 一次考试中的学生表现摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub exam_id: i64,
    pub exam_name: String,
    pub exam_date: NaiveDate,
    #[serde(default)]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub class_rank: Option<u32>,
    #[serde(default)]
    pub grade_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceHistory {
    pub records: Vec<PerformanceRecord>,
}

/// 批量接口通用的非空校验
pub(crate) fn require_ids(ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Err(ClientError::Validation("至少需要选择一名学生".to_string()));
    }
    Ok(())
}
