//! 分析报告模型
//!
//! 一个报告上挂着两个互相独立的状态机：
//! - `status`：主分析任务
//! - `ai_analysis_status`：AI 分析子任务
//!
//! 主报告 `completed` 时 AI 任务仍可能是 `processing`，两者分开轮询。

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{ClientError, Result};
use crate::models::exam::Exam;

/// 主报告状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// 已提交
    Submitted,
    /// 处理中
    Processing,
    /// 已完成
    Completed,
    /// 失败
    Failed,
    /// 无法识别的状态，按非终态处理
    #[serde(other)]
    Unknown,
}

impl ReportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Submitted => "submitted",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
            ReportStatus::Unknown => "unknown",
        }
    }

    /// 中文标签（用于提示信息）
    pub fn label(self) -> &'static str {
        match self {
            ReportStatus::Submitted => "已提交",
            ReportStatus::Processing => "处理中",
            ReportStatus::Completed => "已完成",
            ReportStatus::Failed => "失败",
            ReportStatus::Unknown => "未知",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// AI 分析子任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiAnalysisStatus {
    #[default]
    NotStarted,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl AiAnalysisStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AiAnalysisStatus::Completed | AiAnalysisStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AiAnalysisStatus::NotStarted => "not_started",
            AiAnalysisStatus::Processing => "processing",
            AiAnalysisStatus::Completed => "completed",
            AiAnalysisStatus::Failed => "failed",
            AiAnalysisStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AiAnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 报告类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// 单场考试分析
    #[default]
    Single,
    /// 多场考试对比分析
    Comparison,
}

/// 分析报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: i64,
    pub report_name: String,
    #[serde(default)]
    pub exam_id: Option<i64>,
    pub status: ReportStatus,
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub error_message: Option<String>,
    /// 统计结果（各班级 / 学生明细），结构由后端决定
    #[serde(default)]
    pub full_report_data: Option<Map<String, JsonValue>>,
    #[serde(default)]
    pub chart_data: Option<Map<String, JsonValue>>,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub created_at: NaiveDateTime,
    #[serde(default, deserialize_with = "deserialize_opt_datetime")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub exam: Option<Exam>,
    #[serde(default)]
    pub ai_analysis_status: AiAnalysisStatus,
    /// AI 分析结果，后端可能以文本或 JSON 形式返回
    #[serde(default, alias = "ai_analysis_cache")]
    pub ai_analysis: Option<JsonValue>,
}

impl AnalysisReport {
    /// AI 分析的文本内容
    ///
    /// 缓存可能是 JSON 字符串（需二次解析）、纯文本或对象
    pub fn ai_analysis_text(&self) -> Option<String> {
        match self.ai_analysis.as_ref()? {
            JsonValue::String(s) => match serde_json::from_str::<JsonValue>(s) {
                Ok(JsonValue::String(inner)) => Some(inner),
                Ok(JsonValue::Object(obj)) => obj
                    .get("analysis")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .or_else(|| Some(s.clone())),
                _ => Some(s.clone()),
            },
            JsonValue::Object(obj) => obj
                .get("analysis")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// 失败原因（没有错误信息时给出默认提示）
    pub fn failure_reason(&self) -> String {
        self.error_message
            .clone()
            .unwrap_or_else(|| "后端未提供错误信息".to_string())
    }
}

/// 分析范围层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeLevel {
    /// 全校
    #[serde(rename = "FULL_EXAM")]
    FullExam,
    /// 年级
    #[serde(rename = "GRADE")]
    Grade,
    /// 班级
    #[serde(rename = "CLASS")]
    Class,
}

/// 分析范围
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisScope {
    pub level: ScopeLevel,
    #[serde(default)]
    pub ids: Vec<i64>,
}

impl AnalysisScope {
    pub fn full_exam() -> Self {
        Self {
            level: ScopeLevel::FullExam,
            ids: Vec::new(),
        }
    }

    pub fn grades(ids: Vec<i64>) -> Self {
        Self {
            level: ScopeLevel::Grade,
            ids,
        }
    }

    pub fn classes(ids: Vec<i64>) -> Self {
        Self {
            level: ScopeLevel::Class,
            ids,
        }
    }
}

/// 提交分析任务的请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSubmission {
    pub exam_id: i64,
    pub report_name: String,
    pub scope: AnalysisScope,
}

impl AnalysisSubmission {
    pub fn new(exam_id: i64, report_name: impl Into<String>, scope: AnalysisScope) -> Self {
        Self {
            exam_id,
            report_name: report_name.into(),
            scope,
        }
    }

    /// 发送前校验（与后端约束一致）
    pub fn validate(&self) -> Result<()> {
        if self.exam_id <= 0 {
            return Err(ClientError::Validation(format!(
                "考试ID必须大于0，当前为 {}",
                self.exam_id
            )));
        }
        if self.report_name.trim().is_empty() {
            return Err(ClientError::Validation("报告名称不能为空".to_string()));
        }
        if self.scope.level != ScopeLevel::FullExam && self.scope.ids.is_empty() {
            return Err(ClientError::Validation(
                "按年级或班级分析时必须指定至少一个ID".to_string(),
            ));
        }
        Ok(())
    }
}

/// 提交（或重试）分析任务后的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAccepted {
    pub message: String,
    pub report_id: i64,
}

/// 提交 AI 分析任务后的响应
///
/// 若 AI 分析已完成，后端直接返回缓存结果（`analysis` 有值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSubmissionAccepted {
    pub message: String,
    pub report_id: i64,
    pub ai_analysis_status: AiAnalysisStatus,
    #[serde(default)]
    pub analysis: Option<JsonValue>,
}

/// 对比分析请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub report_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_name: Option<String>,
}

/// 创建对比分析任务后的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonAccepted {
    pub message: String,
    pub comparison_report_id: i64,
}

impl ComparisonRequest {
    pub fn validate(&self) -> Result<()> {
        if self.report_ids.len() < 2 {
            return Err(ClientError::Validation(
                "对比分析至少需要2个报告".to_string(),
            ));
        }
        Ok(())
    }
}

/// 报告列表查询参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportQuery {
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReportStatus>,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            query: None,
            status: None,
        }
    }
}

impl ReportQuery {
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(ClientError::Validation("页码从1开始".to_string()));
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(ClientError::Validation(format!(
                "每页数量必须在1到100之间，当前为 {}",
                self.page_size
            )));
        }
        Ok(())
    }
}

/// 分页的报告列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPage {
    pub items: Vec<AnalysisReport>,
    pub total: u64,
    pub page: u32,
    #[serde(rename = "pageSize")]
    pub page_size: u32,
}

impl ReportPage {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }
}

// 后端时间可能带时区（"2024-05-01T08:00:00+08:00"）也可能不带，统一取本地时间部分
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
}

fn deserialize_datetime<'de, D>(deserializer: D) -> std::result::Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_datetime(&s).ok_or_else(|| serde::de::Error::custom(format!("无法解析时间: {}", s)))
}

fn deserialize_opt_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) => parse_datetime(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("无法解析时间: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report_json() -> JsonValue {
        json!({
            "id": 12,
            "report_name": "期中考试全校分析",
            "exam_id": 3,
            "status": "completed",
            "report_type": "single",
            "error_message": null,
            "full_report_data": {"summary": {"avg": 87.5}},
            "chart_data": null,
            "created_at": "2024-11-02T09:15:00.123456",
            "updated_at": "2024-11-02T09:16:30+08:00",
            "exam": {"id": 3, "name": "期中考试", "exam_date": "2024-11-01", "status": "completed"},
            "ai_analysis_status": "processing"
        })
    }

    #[test]
    fn test_statuses_are_independent() {
        let report: AnalysisReport = serde_json::from_value(report_json()).unwrap();
        assert_eq!(report.status, ReportStatus::Completed);
        assert_eq!(report.ai_analysis_status, AiAnalysisStatus::Processing);
        assert!(report.status.is_terminal());
        assert!(!report.ai_analysis_status.is_terminal());
        assert!(report.updated_at.is_some());
    }

    #[test]
    fn test_missing_ai_status_defaults_to_not_started() {
        let mut value = report_json();
        value.as_object_mut().unwrap().remove("ai_analysis_status");
        let report: AnalysisReport = serde_json::from_value(value).unwrap();
        assert_eq!(report.ai_analysis_status, AiAnalysisStatus::NotStarted);
    }

    #[test]
    fn test_unknown_status_is_not_terminal() {
        let mut value = report_json();
        value["status"] = json!("queued");
        let report: AnalysisReport = serde_json::from_value(value).unwrap();
        assert_eq!(report.status, ReportStatus::Unknown);
        assert!(!report.status.is_terminal());
    }

    #[test]
    fn test_ai_analysis_text_from_json_string_cache() {
        let mut value = report_json();
        value["ai_analysis_cache"] = json!("\"整体成绩稳定，数学学科需加强。\"");
        let report: AnalysisReport = serde_json::from_value(value).unwrap();
        assert_eq!(
            report.ai_analysis_text().as_deref(),
            Some("整体成绩稳定，数学学科需加强。")
        );
    }

    #[test]
    fn test_submission_validation() {
        assert!(AnalysisSubmission::new(1, "报告", AnalysisScope::full_exam())
            .validate()
            .is_ok());
        assert!(AnalysisSubmission::new(0, "报告", AnalysisScope::full_exam())
            .validate()
            .is_err());
        assert!(AnalysisSubmission::new(1, "  ", AnalysisScope::full_exam())
            .validate()
            .is_err());
        assert!(AnalysisSubmission::new(1, "报告", AnalysisScope::classes(vec![]))
            .validate()
            .is_err());
    }

    #[test]
    fn test_scope_serializes_upper_case_level() {
        let value = serde_json::to_value(AnalysisScope::grades(vec![1, 2])).unwrap();
        assert_eq!(value, json!({"level": "GRADE", "ids": [1, 2]}));
    }

    #[test]
    fn test_report_page_total_pages() {
        let page: ReportPage = serde_json::from_value(json!({
            "items": [], "total": 21, "page": 1, "pageSize": 10
        }))
        .unwrap();
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn test_query_validation() {
        assert!(ReportQuery::default().validate().is_ok());
        let bad = ReportQuery {
            page_size: 101,
            ..ReportQuery::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_comparison_accepted_uses_comparison_report_id() {
        let accepted: ComparisonAccepted = serde_json::from_value(json!({
            "message": "对比分析任务已创建。",
            "comparison_report_id": 21
        }))
        .unwrap();
        assert_eq!(accepted.comparison_report_id, 21);
    }
}
