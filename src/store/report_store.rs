//! 报告状态仓库
//!
//! 一个会话（页面）一个实例：创建时为空，销毁时调用 [`ReportStore::teardown`]
//! 停止所有仍在运行的轮询。
//!
//! 轮询回调只在这里更新缓存和提示，不直接接触视图。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::try_join_all;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::api;
use crate::error::Result;
use crate::models::{
    AiAnalysisStatus, AnalysisReport, AnalysisSubmission, ComparisonRequest, ReportPage, ReportQuery,
};
use crate::services::polling::{PollFailure, PollHandle};
use crate::services::report_service::ReportService;

const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(25);

/// 轮询的是哪一个状态字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    Report,
    AiAnalysis,
}

impl WatchKind {
    fn label(self) -> &'static str {
        match self {
            WatchKind::Report => "分析",
            WatchKind::AiAnalysis => "AI 分析",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// 面向用户的提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub report_id: i64,
    pub message: String,
}

struct Session {
    generation: u64,
    handle: PollHandle,
}

#[derive(Default)]
struct StoreState {
    reports: BTreeMap<i64, AnalysisReport>,
    last_page: Option<(u64, u32, u32)>,
    sessions: HashMap<(i64, WatchKind), Session>,
    notices: Vec<Notice>,
    next_generation: u64,
    closed: bool,
}

impl StoreState {
    fn notify(&mut self, level: NoticeLevel, report_id: i64, message: String) {
        match level {
            NoticeLevel::Success => info!("🔔 {}", message),
            NoticeLevel::Error => warn!("🔔 {}", message),
        }
        self.notices.push(Notice {
            level,
            report_id,
            message,
        });
    }

    /// 会话是否仍是该键下登记的当前会话（仓库未销毁）
    fn is_current(&self, key: (i64, WatchKind), generation: u64) -> bool {
        !self.closed && self.sessions.get(&key).map(|s| s.generation) == Some(generation)
    }

    /// 只移除同一代的会话，避免旧会话的回调删掉新会话
    ///
    /// 返回 false 表示会话已被停止、替换或仓库已销毁，回调应丢弃结果
    fn finish_session(&mut self, key: (i64, WatchKind), generation: u64) -> bool {
        if !self.is_current(key, generation) {
            return false;
        }
        self.sessions.remove(&key);
        true
    }

    fn apply_update(&mut self, key: (i64, WatchKind), generation: u64, report: &AnalysisReport) {
        if self.is_current(key, generation) {
            self.reports.insert(report.id, report.clone());
        }
    }

    fn complete(&mut self, key: (i64, WatchKind), generation: u64, report: AnalysisReport) {
        let (report_id, kind) = key;
        if !self.finish_session(key, generation) {
            debug!("报告 #{} 的会话已失效，丢弃结果", report_id);
            return;
        }
        self.notify(
            NoticeLevel::Success,
            report_id,
            format!("报告 #{}「{}」{}完成", report_id, report.report_name, kind.label()),
        );
        self.reports.insert(report.id, report);
    }

    fn fail(&mut self, key: (i64, WatchKind), generation: u64, failure: PollFailure<AnalysisReport>) {
        let (report_id, kind) = key;
        if !self.finish_session(key, generation) {
            debug!("报告 #{} 的会话已失效，丢弃结果", report_id);
            return;
        }
        let message = failure_message(report_id, kind, &failure);
        self.notify(NoticeLevel::Error, report_id, message);
        if let PollFailure::Terminal(report) = failure {
            self.reports.insert(report.id, report);
        }
    }
}

/// 报告状态仓库（可 clone，内部共享状态）
#[derive(Clone)]
pub struct ReportStore {
    service: ReportService,
    state: Arc<Mutex<StoreState>>,
}

impl ReportStore {
    pub fn new(service: ReportService) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        lock_state(&self.state)
    }

    pub fn service(&self) -> &ReportService {
        &self.service
    }

    // ========== 读取 ==========

    pub fn report(&self, report_id: i64) -> Option<AnalysisReport> {
        self.lock().reports.get(&report_id).cloned()
    }

    /// 缓存中的全部报告，按创建时间倒序
    pub fn reports(&self) -> Vec<AnalysisReport> {
        let mut reports: Vec<AnalysisReport> = self.lock().reports.values().cloned().collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reports
    }

    /// 最近一次加载的分页信息 (total, page, page_size)
    pub fn last_page(&self) -> Option<(u64, u32, u32)> {
        self.lock().last_page
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.lock().notices.clone()
    }

    /// 取出并清空提示
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.lock().notices)
    }

    pub fn is_tracking(&self, report_id: i64, kind: WatchKind) -> bool {
        self.lock()
            .sessions
            .get(&(report_id, kind))
            .is_some_and(|s| !s.handle.is_finished())
    }

    pub fn active_sessions(&self) -> usize {
        self.lock()
            .sessions
            .values()
            .filter(|s| !s.handle.is_finished())
            .count()
    }

    // ========== 加载 ==========

    pub async fn load_page(&self, query: &ReportQuery) -> Result<ReportPage> {
        let page = api::list_reports(self.service.client(), query).await?;
        let mut state = self.lock();
        for report in &page.items {
            state.reports.insert(report.id, report.clone());
        }
        state.last_page = Some((page.total, page.page, page.page_size));
        debug!("已加载报告列表第 {} 页 ({} 条)", page.page, page.items.len());
        Ok(page)
    }

    pub async fn refresh(&self, report_id: i64) -> Result<AnalysisReport> {
        let report = api::get_report(self.service.client(), report_id).await?;
        self.lock().reports.insert(report.id, report.clone());
        Ok(report)
    }

    /// 并发刷新多个报告
    pub async fn refresh_many(&self, report_ids: &[i64]) -> Result<Vec<AnalysisReport>> {
        let client = self.service.client();
        let reports = try_join_all(report_ids.iter().map(|id| api::get_report(client, *id))).await?;
        let mut state = self.lock();
        for report in &reports {
            state.reports.insert(report.id, report.clone());
        }
        Ok(reports)
    }

    // ========== 动作 ==========

    /// 提交分析任务并开始跟踪，返回报告ID
    pub async fn submit(&self, submission: &AnalysisSubmission) -> Result<i64> {
        let accepted = api::submit_analysis(self.service.client(), submission).await?;
        self.track(accepted.report_id);
        Ok(accepted.report_id)
    }

    /// 重试失败的任务并重新跟踪
    pub async fn retry(&self, report_id: i64) -> Result<()> {
        let accepted = api::retry_analysis(self.service.client(), report_id).await?;
        if let Some(report) = self.lock().reports.get_mut(&report_id) {
            report.error_message = None;
        }
        self.track(accepted.report_id);
        Ok(())
    }

    /// 请求 AI 分析：有缓存则直接写入，否则开始跟踪 AI 状态
    pub async fn request_ai(&self, report_id: i64) -> Result<()> {
        let accepted = api::submit_ai_analysis(self.service.client(), report_id).await?;

        let cached = accepted.ai_analysis_status == AiAnalysisStatus::Completed
            && accepted.analysis.is_some();
        if cached {
            let mut state = self.lock();
            if let Some(report) = state.reports.get_mut(&report_id) {
                report.ai_analysis_status = AiAnalysisStatus::Completed;
                report.ai_analysis = accepted.analysis;
            }
            state.notify(
                NoticeLevel::Success,
                report_id,
                format!("报告 #{} 的 AI 分析已就绪", report_id),
            );
            return Ok(());
        }

        self.track_ai(report_id);
        Ok(())
    }

    /// 删除报告；后端确认删除后才停止轮询并移出缓存
    pub async fn delete(&self, report_id: i64) -> Result<()> {
        api::delete_report(self.service.client(), report_id).await?;
        self.stop_tracking(report_id);
        self.lock().reports.remove(&report_id);
        Ok(())
    }

    /// 创建对比分析并跟踪新报告，返回对比报告ID
    pub async fn compare(&self, request: &ComparisonRequest) -> Result<i64> {
        let accepted = api::create_comparison(self.service.client(), request).await?;
        self.track(accepted.comparison_report_id);
        Ok(accepted.comparison_report_id)
    }

    // ========== 轮询会话 ==========

    /// 跟踪报告主状态；同一报告已有会话时先停止旧会话
    pub fn track(&self, report_id: i64) {
        self.start_session(report_id, WatchKind::Report);
    }

    /// 跟踪 AI 分析状态
    pub fn track_ai(&self, report_id: i64) {
        self.start_session(report_id, WatchKind::AiAnalysis);
    }

    pub fn stop_tracking(&self, report_id: i64) {
        let mut state = self.lock();
        for kind in [WatchKind::Report, WatchKind::AiAnalysis] {
            if let Some(session) = state.sessions.remove(&(report_id, kind)) {
                session.handle.stop();
            }
        }
    }

    fn start_session(&self, report_id: i64, kind: WatchKind) {
        // 持锁启动：回调在锁释放前无法写入，保证会话先登记
        let mut state = self.lock();
        if state.closed {
            warn!("仓库已销毁，忽略报告 #{} 的轮询请求", report_id);
            return;
        }

        let key = (report_id, kind);
        if let Some(old) = state.sessions.remove(&key) {
            old.handle.stop();
        }
        state.next_generation += 1;
        let generation = state.next_generation;

        let on_update = {
            let shared = Arc::clone(&self.state);
            move |report: &AnalysisReport| lock_state(&shared).apply_update(key, generation, report)
        };
        let on_success = {
            let shared = Arc::clone(&self.state);
            move |report: AnalysisReport| lock_state(&shared).complete(key, generation, report)
        };
        let on_failure = {
            let shared = Arc::clone(&self.state);
            move |failure: PollFailure<AnalysisReport>| {
                lock_state(&shared).fail(key, generation, failure)
            }
        };

        let handle = match kind {
            WatchKind::Report => self
                .service
                .report_poller(report_id)
                .on_update(on_update)
                .spawn(on_success, on_failure),
            WatchKind::AiAnalysis => self
                .service
                .ai_poller(report_id)
                .on_update(on_update)
                .spawn(on_success, on_failure),
        };
        debug!("开始跟踪报告 #{} 的{}状态", report_id, kind.label());
        state.sessions.insert(key, Session { generation, handle });
    }

    /// 销毁：停止所有会话，之后不再接受新的跟踪请求
    pub fn teardown(&self) {
        let mut state = self.lock();
        state.closed = true;
        let count = state.sessions.len();
        for (_, session) in state.sessions.drain() {
            session.handle.stop();
        }
        if count > 0 {
            info!("已停止 {} 个轮询会话", count);
        }
    }

    /// 等待所有会话自然结束（不取消）
    ///
    /// 会话在等待期间仍留在仓库中，`teardown` 随时可以停止它们
    pub async fn wait_idle(&self) {
        loop {
            {
                let mut state = self.lock();
                state.sessions.retain(|_, s| !s.handle.is_finished());
                if state.sessions.is_empty() {
                    return;
                }
            }
            sleep(IDLE_CHECK_INTERVAL).await;
        }
    }
}

fn lock_state(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn failure_message(report_id: i64, kind: WatchKind, failure: &PollFailure<AnalysisReport>) -> String {
    match failure {
        PollFailure::Terminal(report) => format!(
            "报告 #{} {}失败: {}",
            report_id,
            kind.label(),
            report.failure_reason()
        ),
        PollFailure::Fetch(e) => format!("报告 #{} 状态查询失败: {}", report_id, e),
        PollFailure::TimedOut { timeout, .. } => format!(
            "报告 #{} {}超时（超过 {} 秒），请稍后刷新或重试",
            report_id,
            kind.label(),
            timeout.as_secs()
        ),
    }
}
