//! 分析报告 API 模块
//!
//! 负责分析任务的提交、查询、重试、删除，以及 AI 分析子任务的提交

use tracing::{debug, info};

use crate::error::Result;
use crate::infrastructure::ApiClient;
use crate::models::{
    AiSubmissionAccepted, AnalysisReport, AnalysisSubmission, ComparisonAccepted, ComparisonRequest, ReportPage,
    ReportQuery, SubmissionAccepted,
};

const BASE: &str = "/api/analysis";

/// 获取单个报告（状态 + 结果）
///
/// 轮询服务每次 tick 调用的就是这个接口
pub async fn get_report(client: &ApiClient, report_id: i64) -> Result<AnalysisReport> {
    let report: AnalysisReport = client
        .get(&format!("{}/reports/{}", BASE, report_id))
        .await?;
    debug!(
        "报告 #{} 状态: {} / AI: {}",
        report.id, report.status, report.ai_analysis_status
    );
    Ok(report)
}

/// 分页获取报告列表
///
/// # 参数
/// - `query`: 页码、每页数量、名称关键字、状态筛选
pub async fn list_reports(client: &ApiClient, query: &ReportQuery) -> Result<ReportPage> {
    query.validate()?;
    client
        .get_with_query(&format!("{}/reports", BASE), query)
        .await
}

/// 提交分析任务
///
/// # 返回
/// 后端立即返回新建的报告ID，分析在后台进行
pub async fn submit_analysis(
    client: &ApiClient,
    submission: &AnalysisSubmission,
) -> Result<SubmissionAccepted> {
    submission.validate()?;
    let accepted: SubmissionAccepted = client
        .post(&format!("{}/submit", BASE), submission)
        .await?;
    info!(
        "📋 分析任务已提交: {} → 报告 #{}",
        submission.report_name, accepted.report_id
    );
    Ok(accepted)
}

/// 提交 AI 分析任务
///
/// 若 AI 分析已完成，返回值的 `analysis` 即为缓存结果，无需轮询
pub async fn submit_ai_analysis(client: &ApiClient, report_id: i64) -> Result<AiSubmissionAccepted> {
    let accepted: AiSubmissionAccepted = client
        .post_empty(&format!("{}/reports/{}/ai-analysis", BASE, report_id))
        .await?;
    info!(
        "🤖 AI 分析请求已受理: 报告 #{} ({})",
        report_id, accepted.ai_analysis_status
    );
    Ok(accepted)
}

/// 重试失败的分析任务（仅限 `failed` 状态）
pub async fn retry_analysis(client: &ApiClient, report_id: i64) -> Result<SubmissionAccepted> {
    let accepted: SubmissionAccepted = client
        .post_empty(&format!("{}/reports/{}/retry", BASE, report_id))
        .await?;
    info!("🔁 报告 #{} 已重新提交", report_id);
    Ok(accepted)
}

pub async fn delete_report(client: &ApiClient, report_id: i64) -> Result<()> {
    client
        .delete(&format!("{}/reports/{}", BASE, report_id))
        .await?;
    info!("🗑️ 报告 #{} 已删除", report_id);
    Ok(())
}

/// 创建多场考试对比分析任务（源报告必须都已完成）
pub async fn create_comparison(
    client: &ApiClient,
    request: &ComparisonRequest,
) -> Result<ComparisonAccepted> {
    request.validate()?;
    let accepted: ComparisonAccepted = client
        .post(&format!("{}/compare", BASE), request)
        .await?;
    info!(
        "📊 对比分析已提交: {} 个报告 → 报告 #{}",
        request.report_ids.len(),
        accepted.comparison_report_id
    );
    Ok(accepted)
}
