//! 状态轮询服务 - 业务能力层
//!
//! 反复拉取某个资源的当前状态，直到进入终态、出错或超时。
//!
//! ## 语义
//!
//! - 调用时立即拉取一次，之后每隔 `interval` 再拉取
//! - 每次拉取前检查是否超时，超时则不再拉取，直接以超时失败结束
//! - 成功终态 → `on_success`；失败终态 / 请求出错 / 超时 → `on_failure`
//! - 非终态 → `on_update`（如果提供）
//! - 每个会话最多触发一次终态回调；`stop()` 之后不再触发任何回调
//!
//! 下一次拉取在上一次返回之后才开始计时，因此同一会话的请求不会重叠。

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::models::{AiAnalysisStatus, AnalysisReport, ReportStatus};

/// 一次拉取结果所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// 非终态，继续轮询
    Pending,
    /// 成功终态
    Succeeded,
    /// 失败终态
    Failed,
}

/// 状态探针：决定轮询关注资源的哪个字段
pub trait StatusProbe<T>: Send + Sync {
    fn phase(&self, resource: &T) -> PollPhase;

    /// 用于日志的字段名
    fn name(&self) -> &'static str;
}

/// 观察报告主状态 `status`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportStatusProbe;

impl StatusProbe<AnalysisReport> for ReportStatusProbe {
    fn phase(&self, report: &AnalysisReport) -> PollPhase {
        match report.status {
            ReportStatus::Completed => PollPhase::Succeeded,
            ReportStatus::Failed => PollPhase::Failed,
            _ => PollPhase::Pending,
        }
    }

    fn name(&self) -> &'static str {
        "status"
    }
}

/// 观察 AI 分析子任务状态 `ai_analysis_status`
#[derive(Debug, Clone, Copy, Default)]
pub struct AiAnalysisProbe;

impl StatusProbe<AnalysisReport> for AiAnalysisProbe {
    fn phase(&self, report: &AnalysisReport) -> PollPhase {
        match report.ai_analysis_status {
            AiAnalysisStatus::Completed => PollPhase::Succeeded,
            AiAnalysisStatus::Failed => PollPhase::Failed,
            _ => PollPhase::Pending,
        }
    }

    fn name(&self) -> &'static str {
        "ai_analysis_status"
    }
}

/// 轮询间隔与总时限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollOptions {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// 报告主状态：3 秒 / 120 秒
    pub fn report_status() -> Self {
        Self::new(Duration::from_millis(3_000), Duration::from_millis(120_000))
    }

    /// AI 分析状态：5 秒 / 180 秒
    pub fn ai_analysis() -> Self {
        Self::new(Duration::from_millis(5_000), Duration::from_millis(180_000))
    }

    pub fn report_status_from(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.poll_interval_ms),
            Duration::from_millis(config.poll_timeout_ms),
        )
    }

    pub fn ai_analysis_from(config: &Config) -> Self {
        Self::new(
            Duration::from_millis(config.ai_poll_interval_ms),
            Duration::from_millis(config.ai_poll_timeout_ms),
        )
    }
}

/// 轮询失败的三种形态
///
/// - `Terminal`：请求成功，但资源自身报告失败（携带该次拉取结果）
/// - `Fetch`：请求本身失败（无响应或被服务端拒绝）
/// - `TimedOut`：超过时限仍未进入终态
#[derive(Debug, thiserror::Error)]
pub enum PollFailure<T> {
    #[error("任务执行失败")]
    Terminal(T),

    #[error("轮询请求失败: {0}")]
    Fetch(#[source] ClientError),

    #[error("轮询超时: 已等待 {}ms，时限 {}ms", .elapsed.as_millis(), .timeout.as_millis())]
    TimedOut { elapsed: Duration, timeout: Duration },
}

impl<T> PollFailure<T> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollFailure::TimedOut { .. })
    }

    /// 失败终态时的资源
    pub fn resource(&self) -> Option<&T> {
        match self {
            PollFailure::Terminal(r) => Some(r),
            _ => None,
        }
    }
}

/// 轮询主循环
///
/// 返回成功终态时的资源，或 [`PollFailure`]
///
/// # 参数
/// - `label`: 日志前缀，例如 "报告 #12"
/// - `fetch`: 每次调用拉取一次资源
/// - `probe`: 判断终态
/// - `on_update`: 非终态时调用
pub async fn poll_until_terminal<T, F, Fut, P, U>(
    label: &str,
    mut fetch: F,
    probe: &P,
    options: PollOptions,
    mut on_update: U,
) -> std::result::Result<T, PollFailure<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: StatusProbe<T> + ?Sized,
    U: FnMut(&T),
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let elapsed = started.elapsed();
        if elapsed > options.timeout {
            warn!(
                "[{}] ⏰ {} 轮询超时 ({} 次拉取, {}ms)",
                label,
                probe.name(),
                attempt,
                elapsed.as_millis()
            );
            return Err(PollFailure::TimedOut {
                elapsed,
                timeout: options.timeout,
            });
        }

        attempt += 1;
        let resource = match fetch().await {
            Ok(resource) => resource,
            Err(e) => {
                warn!("[{}] ❌ 第 {} 次拉取失败: {}", label, attempt, e);
                return Err(PollFailure::Fetch(e));
            }
        };

        match probe.phase(&resource) {
            PollPhase::Succeeded => {
                info!("[{}] ✓ {} 已完成 (第 {} 次拉取)", label, probe.name(), attempt);
                return Ok(resource);
            }
            PollPhase::Failed => {
                warn!("[{}] ❌ {} 报告失败 (第 {} 次拉取)", label, probe.name(), attempt);
                return Err(PollFailure::Terminal(resource));
            }
            PollPhase::Pending => {
                debug!("[{}] {} 处理中 (第 {} 次拉取)", label, probe.name(), attempt);
                on_update(&resource);
            }
        }

        sleep(options.interval).await;
    }
}

/// 装箱的拉取函数
pub type BoxFetch<T> = Box<dyn FnMut() -> BoxFuture<'static, Result<T>> + Send>;

type UpdateFn<T> = Box<dyn FnMut(&T) + Send>;

/// 轮询会话构建器
///
/// ```no_run
/// # use edu_insight_client::services::polling::{Poller, ReportStatusProbe, PollOptions};
/// # use edu_insight_client::{api, ApiClient};
/// # async fn example(client: ApiClient) {
/// let handle = Poller::new(ReportStatusProbe, move || {
///     let client = client.clone();
///     async move { api::get_report(&client, 12).await }
/// })
/// .options(PollOptions::report_status())
/// .on_update(|r| println!("仍在处理: {}", r.status))
/// .spawn(
///     |r| println!("完成: {}", r.report_name),
///     |e| eprintln!("失败: {}", e),
/// );
/// // 视图销毁时
/// handle.stop();
/// # }
/// ```
pub struct Poller<T, P> {
    label: String,
    fetch: BoxFetch<T>,
    probe: P,
    options: PollOptions,
    on_update: Option<UpdateFn<T>>,
}

impl<T, P> Poller<T, P>
where
    T: Send + 'static,
    P: StatusProbe<T> + 'static,
{
    pub fn new<F, Fut>(probe: P, mut fetch: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            label: probe.name().to_string(),
            fetch: Box::new(move || fetch().boxed()),
            probe,
            options: PollOptions::report_status(),
            on_update: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    pub fn on_update<U>(mut self, on_update: U) -> Self
    where
        U: FnMut(&T) + Send + 'static,
    {
        self.on_update = Some(Box::new(on_update));
        self
    }

    /// 在当前任务中运行，直接等待结果
    pub async fn wait(self) -> std::result::Result<T, PollFailure<T>> {
        let Poller {
            label,
            fetch,
            probe,
            options,
            mut on_update,
        } = self;

        poll_until_terminal(&label, fetch, &probe, options, |r| {
            if let Some(cb) = on_update.as_mut() {
                cb(r);
            }
        })
        .await
    }

    /// 在后台任务中运行，返回可随时取消的句柄
    ///
    /// 恰好调用 `on_success` / `on_failure` 之一一次；在此之前调用过 `stop()` 则都不调用
    pub fn spawn<S, E>(self, on_success: S, on_failure: E) -> PollHandle
    where
        S: FnOnce(T) + Send + 'static,
        E: FnOnce(PollFailure<T>) + Send + 'static,
    {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let label = self.label.clone();

        let task = tokio::spawn(async move {
            let Poller {
                label,
                fetch,
                probe,
                options,
                mut on_update,
            } = self;

            let update_flag = Arc::clone(&flag);
            let result = poll_until_terminal(&label, fetch, &probe, options, |r| {
                if update_flag.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(cb) = on_update.as_mut() {
                    cb(r);
                }
            })
            .await;

            // 置位同时检查：stop() 先到则丢弃结果
            if flag.swap(true, Ordering::SeqCst) {
                debug!("[{}] 会话已取消，丢弃结果", label);
                return;
            }

            match result {
                Ok(resource) => on_success(resource),
                Err(failure) => on_failure(failure),
            }
        });

        PollHandle {
            label,
            stopped,
            task,
        }
    }
}

/// 轮询会话句柄
///
/// 不会在 drop 时自动取消；消费方销毁时需显式调用 [`PollHandle::stop`]
#[derive(Debug)]
pub struct PollHandle {
    label: String,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// 取消轮询；会话已结束时调用也是安全的
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("[{}] 轮询已停止", self.label);
        }
        self.task.abort();
    }

    /// 会话任务是否已结束（完成或被取消）
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// 等待会话任务退出
    ///
    /// 被 `stop()` 取消属于正常结束；回调内 panic 会记录为警告，返回 false
    pub async fn join(self) -> bool {
        match self.task.await {
            Ok(()) => true,
            Err(e) if e.is_cancelled() => true,
            Err(e) => {
                warn!("[{}] 轮询任务异常退出: {}", self.label, e);
                false
            }
        }
    }
}
