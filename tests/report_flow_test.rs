mod common;

use std::time::Duration;

use edu_insight_client::models::{
    AiAnalysisStatus, AnalysisScope, AnalysisSubmission, ComparisonRequest, ReportStatus,
};
use edu_insight_client::services::{AiAnalysisOutcome, PollFailure, PollOptions};
use edu_insight_client::store::{NoticeLevel, ReportStore, WatchKind};
use edu_insight_client::{api, ApiClient, ClientError, ReportService};
use tokio_test::{assert_err, assert_ok};

use common::{MockBackend, MISSING_REPORT};

fn fast_service(client: ApiClient) -> ReportService {
    let options = PollOptions::new(Duration::from_millis(20), Duration::from_secs(3));
    ReportService::with_options(client, options, options)
}

#[tokio::test]
async fn test_wait_for_report_until_completed() {
    let (client, mock) = common::spawn(MockBackend {
        ready_after: 3,
        ..MockBackend::default()
    })
    .await;
    let service = fast_service(client);

    let report = assert_ok!(service.wait_for_report(5).await);
    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(mock.fetches(), 3);
}

#[tokio::test]
async fn test_failed_report_carries_error_message() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: 2,
        fail_report: true,
        ..MockBackend::default()
    })
    .await;
    let service = fast_service(client);

    let failure = assert_err!(service.wait_for_report(5).await);
    let report = failure.resource().unwrap();
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(report.failure_reason(), "数据不足，无法分析");
}

#[tokio::test]
async fn test_fetch_error_stops_polling() {
    let (client, _mock) = common::spawn(MockBackend::default()).await;
    let service = fast_service(client);

    match service.wait_for_report(MISSING_REPORT).await {
        Err(PollFailure::Fetch(err)) => assert!(err.is_not_found()),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_times_out_when_never_terminal() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: usize::MAX,
        ..MockBackend::default()
    })
    .await;
    let options = PollOptions::new(Duration::from_millis(20), Duration::from_millis(150));
    let service = ReportService::with_options(client, options, options);

    let failure = assert_err!(service.wait_for_report(5).await);
    assert!(failure.is_timeout());
}

#[tokio::test]
async fn test_submit_and_wait() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: 2,
        ..MockBackend::default()
    })
    .await;
    let service = fast_service(client);
    let submission = AnalysisSubmission::new(3, "全年级分析".to_string(), AnalysisScope::full_exam());

    let report = assert_ok!(service.submit_and_wait(&submission).await);
    assert_eq!(report.id, 7);
    assert!(report.status.is_terminal());
}

#[tokio::test]
async fn test_ai_analysis_from_cache() {
    let (client, mock) = common::spawn(MockBackend {
        ai_cached: true,
        ..MockBackend::default()
    })
    .await;
    let service = fast_service(client);

    let outcome = assert_ok!(service.request_ai_analysis(5).await);
    assert!(matches!(outcome, AiAnalysisOutcome::Cached { .. }));
    assert_eq!(outcome.text().as_deref(), Some("缓存的 AI 分析"));
    assert_eq!(mock.fetches(), 0);
}

#[tokio::test]
async fn test_ai_analysis_polls_its_own_status() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: 1,
        ..MockBackend::default()
    })
    .await;
    let service = fast_service(client);

    let outcome = assert_ok!(service.request_ai_analysis(5).await);
    match outcome {
        AiAnalysisOutcome::Generated(report) => {
            assert_eq!(report.ai_analysis_status, AiAnalysisStatus::Completed);
            assert_eq!(
                report.ai_analysis_text().as_deref(),
                Some("数学成绩整体偏弱，建议加强函数专题训练")
            );
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_store_submit_tracks_and_notifies() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: 3,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));
    let submission = AnalysisSubmission::new(3, "一班分析".to_string(), AnalysisScope::classes(vec![10]));

    let id = assert_ok!(store.submit(&submission).await);
    assert!(store.is_tracking(id, WatchKind::Report));
    store.wait_idle().await;

    assert_eq!(store.active_sessions(), 0);
    assert_eq!(store.report(id).map(|r| r.status), Some(ReportStatus::Completed));
    let notices = store.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(notices[0].report_id, id);
}

#[tokio::test]
async fn test_store_teardown_stops_sessions() {
    let (client, mock) = common::spawn(MockBackend {
        ready_after: usize::MAX,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));

    store.track(5);
    store.track_ai(6);
    assert_eq!(store.active_sessions(), 2);
    tokio::time::sleep(Duration::from_millis(60)).await;

    store.teardown();
    assert_eq!(store.active_sessions(), 0);
    tokio::time::sleep(Duration::from_millis(30)).await;
    let fetched = mock.fetches();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.fetches(), fetched);
    assert!(store.notices().is_empty());

    // 销毁后不再接受新的跟踪
    store.track(5);
    assert!(!store.is_tracking(5, WatchKind::Report));
}

#[tokio::test]
async fn test_store_cached_ai_notice() {
    let (client, _mock) = common::spawn(MockBackend {
        ai_cached: true,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));

    assert_ok!(store.refresh(5).await);
    assert_ok!(store.request_ai(5).await);

    assert!(!store.is_tracking(5, WatchKind::AiAnalysis));
    let report = store.report(5).unwrap();
    assert_eq!(report.ai_analysis_status, AiAnalysisStatus::Completed);
    assert_eq!(report.ai_analysis_text().as_deref(), Some("缓存的 AI 分析"));
    assert_eq!(store.take_notices().len(), 1);
}

#[tokio::test]
async fn test_store_failed_report_notice() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: 1,
        fail_report: true,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));

    store.track(8);
    store.wait_idle().await;

    let notices = store.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].message.contains("数据不足"));
    assert_eq!(store.report(8).map(|r| r.status), Some(ReportStatus::Failed));
}

#[tokio::test]
async fn test_compare_returns_comparison_report_id() {
    let (client, _mock) = common::spawn(MockBackend::default()).await;
    let request = ComparisonRequest {
        report_ids: vec![1, 2],
        report_name: Some("期中 vs 期末".to_string()),
    };

    let accepted = assert_ok!(api::create_comparison(&client, &request).await);
    assert_eq!(accepted.comparison_report_id, 20);
}

#[tokio::test]
async fn test_store_compare_tracks_comparison_report() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: 2,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));
    let request = ComparisonRequest {
        report_ids: vec![1, 2, 3],
        report_name: None,
    };

    let id = assert_ok!(store.compare(&request).await);
    assert_eq!(id, 20);
    assert!(store.is_tracking(20, WatchKind::Report));
    store.wait_idle().await;

    assert_eq!(store.report(20).map(|r| r.status), Some(ReportStatus::Completed));
    let notices = store.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].report_id, 20);
}

#[tokio::test]
async fn test_compare_needs_two_reports_before_sending() {
    let (client, _mock) = common::spawn(MockBackend::default()).await;
    let store = ReportStore::new(fast_service(client));
    let request = ComparisonRequest {
        report_ids: vec![1],
        report_name: None,
    };

    let err = assert_err!(store.compare(&request).await);
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(store.active_sessions(), 0);
}

#[tokio::test]
async fn test_store_retry_after_failure() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: 1,
        fail_report: true,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));

    store.track(5);
    store.wait_idle().await;
    assert_eq!(store.take_notices()[0].level, NoticeLevel::Error);
    assert!(store.report(5).unwrap().error_message.is_some());

    assert_ok!(store.retry(5).await);
    assert!(store.report(5).unwrap().error_message.is_none());
    assert!(store.is_tracking(5, WatchKind::Report));
    store.wait_idle().await;

    let notices = store.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(store.report(5).map(|r| r.status), Some(ReportStatus::Completed));
}

#[tokio::test]
async fn test_store_delete_stops_tracking_and_evicts() {
    let (client, mock) = common::spawn(MockBackend {
        ready_after: usize::MAX,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));

    assert_ok!(store.refresh(5).await);
    store.track(5);
    assert_ok!(store.delete(5).await);

    assert!(!store.is_tracking(5, WatchKind::Report));
    assert!(store.report(5).is_none());
    tokio::time::sleep(Duration::from_millis(30)).await;
    let fetched = mock.fetches();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.fetches(), fetched);
}

#[tokio::test]
async fn test_rejected_delete_keeps_tracking() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: usize::MAX,
        reject_delete: true,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));

    assert_ok!(store.refresh(5).await);
    store.track(5);
    let err = assert_err!(store.delete(5).await);

    assert_eq!(err.status(), Some(409));
    assert!(store.is_tracking(5, WatchKind::Report));
    assert!(store.report(5).is_some());
    store.teardown();
}

#[tokio::test]
async fn test_track_again_replaces_session() {
    let (client, _mock) = common::spawn(MockBackend {
        ready_after: 4,
        ..MockBackend::default()
    })
    .await;
    let store = ReportStore::new(fast_service(client));

    store.track(5);
    tokio::time::sleep(Duration::from_millis(30)).await;
    store.track(5);
    assert_eq!(store.active_sessions(), 1);
    store.wait_idle().await;

    let notices = store.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(store.report(5).map(|r| r.status), Some(ReportStatus::Completed));
}

#[tokio::test]
async fn test_teardown_during_inflight_fetch_leaves_store_untouched() {
    let (client, _mock) = common::spawn(MockBackend::default()).await;
    let store = ReportStore::new(fast_service(client));

    store.track(5);
    store.teardown();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(store.notices().is_empty());
    assert!(store.report(5).is_none());
}
