//! 报告服务 - 业务能力层
//!
//! 把轮询服务绑定到分析报告 API：
//! - 主状态轮询（`status`）
//! - AI 分析状态轮询（`ai_analysis_status`）
//! - 提交 / 重试后等待完成

use serde_json::Value as JsonValue;
use tracing::info;

use crate::api;
use crate::config::Config;
use crate::infrastructure::ApiClient;
use crate::models::{AiAnalysisStatus, AnalysisReport, AnalysisSubmission};
use crate::services::polling::{
    AiAnalysisProbe, PollFailure, PollHandle, PollOptions, Poller, ReportStatusProbe,
};

pub type WaitResult = std::result::Result<AnalysisReport, PollFailure<AnalysisReport>>;

/// 请求 AI 分析的结果
#[derive(Debug, Clone, PartialEq)]
pub enum AiAnalysisOutcome {
    /// 后端已有缓存，直接返回
    Cached { report_id: i64, analysis: JsonValue },
    /// 新生成，轮询到完成时的报告
    Generated(AnalysisReport),
}

impl AiAnalysisOutcome {
    pub fn report_id(&self) -> i64 {
        match self {
            AiAnalysisOutcome::Cached { report_id, .. } => *report_id,
            AiAnalysisOutcome::Generated(report) => report.id,
        }
    }

    pub fn text(&self) -> Option<String> {
        match self {
            AiAnalysisOutcome::Cached { analysis, .. } => match analysis {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Null => None,
                other => other
                    .get("analysis")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .or_else(|| Some(other.to_string())),
            },
            AiAnalysisOutcome::Generated(report) => report.ai_analysis_text(),
        }
    }
}

/// 报告服务
///
/// 职责：
/// - 为单个报告创建轮询会话
/// - 组合"提交 + 等待"
/// - 不持有任何视图状态
#[derive(Clone, Debug)]
pub struct ReportService {
    client: ApiClient,
    report_options: PollOptions,
    ai_options: PollOptions,
}

impl ReportService {
    pub fn new(client: ApiClient, config: &Config) -> Self {
        Self::with_options(
            client,
            PollOptions::report_status_from(config),
            PollOptions::ai_analysis_from(config),
        )
    }

    pub fn with_options(client: ApiClient, report_options: PollOptions, ai_options: PollOptions) -> Self {
        Self {
            client,
            report_options,
            ai_options,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// 主状态轮询会话（未启动）
    pub fn report_poller(&self, report_id: i64) -> Poller<AnalysisReport, ReportStatusProbe> {
        let client = self.client.clone();
        Poller::new(ReportStatusProbe, move || {
            let client = client.clone();
            async move { api::get_report(&client, report_id).await }
        })
        .label(format!("报告 #{}", report_id))
        .options(self.report_options)
    }

    /// AI 分析状态轮询会话（未启动）
    pub fn ai_poller(&self, report_id: i64) -> Poller<AnalysisReport, AiAnalysisProbe> {
        let client = self.client.clone();
        Poller::new(AiAnalysisProbe, move || {
            let client = client.clone();
            async move { api::get_report(&client, report_id).await }
        })
        .label(format!("报告 #{} AI", report_id))
        .options(self.ai_options)
    }

    /// 后台轮询报告主状态
    pub fn watch_report<S, E>(&self, report_id: i64, on_success: S, on_failure: E) -> PollHandle
    where
        S: FnOnce(AnalysisReport) + Send + 'static,
        E: FnOnce(PollFailure<AnalysisReport>) + Send + 'static,
    {
        self.report_poller(report_id).spawn(on_success, on_failure)
    }

    /// 后台轮询 AI 分析状态
    pub fn watch_ai_analysis<S, E>(&self, report_id: i64, on_success: S, on_failure: E) -> PollHandle
    where
        S: FnOnce(AnalysisReport) + Send + 'static,
        E: FnOnce(PollFailure<AnalysisReport>) + Send + 'static,
    {
        self.ai_poller(report_id).spawn(on_success, on_failure)
    }

    pub async fn wait_for_report(&self, report_id: i64) -> WaitResult {
        self.report_poller(report_id).wait().await
    }

    pub async fn wait_for_ai_analysis(&self, report_id: i64) -> WaitResult {
        self.ai_poller(report_id).wait().await
    }

    /// 提交分析任务并等待完成
    ///
    /// 提交失败同样以 `PollFailure::Fetch` 返回
    pub async fn submit_and_wait(&self, submission: &AnalysisSubmission) -> WaitResult {
        let accepted = api::submit_analysis(&self.client, submission)
            .await
            .map_err(PollFailure::Fetch)?;
        info!("⏳ 等待报告 #{} 分析完成...", accepted.report_id);
        self.wait_for_report(accepted.report_id).await
    }

    /// 重新提交失败的任务并等待完成
    pub async fn retry_and_wait(&self, report_id: i64) -> WaitResult {
        let accepted = api::retry_analysis(&self.client, report_id)
            .await
            .map_err(PollFailure::Fetch)?;
        self.wait_for_report(accepted.report_id).await
    }

    /// 请求 AI 分析
    ///
    /// 已有缓存时直接返回，否则轮询 AI 状态直到终态
    pub async fn request_ai_analysis(
        &self,
        report_id: i64,
    ) -> std::result::Result<AiAnalysisOutcome, PollFailure<AnalysisReport>> {
        let accepted = api::submit_ai_analysis(&self.client, report_id)
            .await
            .map_err(PollFailure::Fetch)?;

        if accepted.ai_analysis_status == AiAnalysisStatus::Completed {
            if let Some(analysis) = accepted.analysis {
                info!("🤖 报告 #{} 的 AI 分析来自缓存", report_id);
                return Ok(AiAnalysisOutcome::Cached {
                    report_id: accepted.report_id,
                    analysis,
                });
            }
        }

        info!("⏳ 等待报告 #{} 的 AI 分析完成...", report_id);
        self.wait_for_ai_analysis(report_id)
            .await
            .map(AiAnalysisOutcome::Generated)
    }
}
