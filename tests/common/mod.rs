//! 进程内的 axum 模拟后端
//!
//! 每个测试启动一个独立实例（随机端口），通过 `MockBackend` 的字段控制行为、检查调用

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use edu_insight_client::ApiClient;
use serde::Deserialize;
use serde_json::{json, Value};

pub const MISSING_REPORT: i64 = 404;

#[derive(Default)]
pub struct MockBackend {
    /// 第几次查询时报告进入终态
    pub ready_after: usize,
    /// 终态为 failed 而不是 completed
    pub fail_report: bool,
    /// AI 分析请求直接返回缓存
    pub ai_cached: bool,
    /// 单格成绩保存返回 403
    pub reject_score_writes: bool,
    /// 删除报告返回 409
    pub reject_delete: bool,

    pub report_fetches: AtomicUsize,
    pub retried: AtomicBool,
    pub ai_requested: AtomicBool,
    pub ai_fetches: AtomicUsize,
    pub score_writes: Mutex<Vec<Value>>,
    pub batch_writes: Mutex<Vec<Value>>,
}

impl MockBackend {
    pub fn fetches(&self) -> usize {
        self.report_fetches.load(Ordering::SeqCst)
    }
}

/// 启动模拟后端，返回指向它的客户端
pub async fn spawn(backend: MockBackend) -> (ApiClient, Arc<MockBackend>) {
    let backend = Arc::new(backend);
    let app = Router::new()
        .route("/api/analysis/reports", get(list_reports))
        .route("/api/analysis/reports/:id", get(get_report).delete(delete_report))
        .route("/api/analysis/reports/:id/ai-analysis", post(request_ai))
        .route("/api/analysis/reports/:id/retry", post(retry))
        .route("/api/analysis/submit", post(submit))
        .route("/api/analysis/compare", post(compare))
        .route("/api/exams/", post(create_exam))
        .route("/api/exams/:id", get(get_exam))
        .route("/api/exams/:id/finalize", put(finalize_exam))
        .route("/api/scores/exam/:exam_id/class/:class_id", get(class_scores))
        .route("/api/scores/single", put(single_score))
        .route("/api/scores/batch", post(batch_scores))
        .route("/api/classes/tree", get(class_tree))
        .route("/api/students/by_class/:id", get(students_by_class))
        .with_state(Arc::clone(&backend));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ApiClient::with_base_url(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
    (client, backend)
}

type Shared = State<Arc<MockBackend>>;

fn report_json(id: i64, status: &str, ai_status: &str, ai_analysis: Option<&str>) -> Value {
    json!({
        "id": id,
        "report_name": format!("期中考试分析 {}", id),
        "exam_id": 3,
        "status": status,
        "report_type": "single",
        "error_message": if status == "failed" { Some("数据不足，无法分析") } else { None },
        "full_report_data": if status == "completed" { Some(json!({"summary": {"avg": 78.5}})) } else { None },
        "created_at": "2024-11-02T09:15:00",
        "ai_analysis_status": ai_status,
        "ai_analysis": ai_analysis,
    })
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

async fn get_report(State(mock): Shared, Path(id): Path<i64>) -> Response {
    if id == MISSING_REPORT {
        return detail(StatusCode::NOT_FOUND, "报告未找到");
    }
    let n = mock.report_fetches.fetch_add(1, Ordering::SeqCst) + 1;
    let status = if n < mock.ready_after {
        "processing"
    } else if mock.fail_report && !mock.retried.load(Ordering::SeqCst) {
        "failed"
    } else {
        "completed"
    };

    let (ai_status, ai_text) = if mock.ai_requested.load(Ordering::SeqCst) {
        if mock.ai_fetches.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
            ("completed", Some("数学成绩整体偏弱，建议加强函数专题训练"))
        } else {
            ("processing", None)
        }
    } else {
        ("not_started", None)
    };
    Json(report_json(id, status, ai_status, ai_text)).into_response()
}

#[derive(Deserialize)]
struct PageParams {
    page: u32,
    page_size: u32,
    status: Option<String>,
}

async fn list_reports(Query(params): Query<PageParams>) -> Response {
    let status = params.status.unwrap_or_else(|| "completed".to_string());
    let items: Vec<Value> = (1..=2)
        .map(|id| report_json(id, &status, "not_started", None))
        .collect();
    Json(json!({
        "items": items,
        "total": 12,
        "page": params.page,
        "pageSize": params.page_size,
    }))
    .into_response()
}

async fn delete_report(State(mock): Shared, Path(id): Path<i64>) -> Response {
    if id == MISSING_REPORT {
        return detail(StatusCode::NOT_FOUND, "报告未找到");
    }
    if mock.reject_delete {
        return detail(StatusCode::CONFLICT, "报告正在分析中，无法删除");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn submit(Json(body): Json<Value>) -> Response {
    if body["report_name"].as_str().unwrap_or("").is_empty() {
        return detail(StatusCode::BAD_REQUEST, "报告名称不能为空");
    }
    Json(json!({ "message": "分析任务已提交", "report_id": 7 })).into_response()
}

async fn compare(Json(body): Json<Value>) -> Response {
    let ids = body["report_ids"].as_array().map(Vec::len).unwrap_or(0);
    if ids < 2 {
        return detail(StatusCode::BAD_REQUEST, "对比分析至少需要2个报告");
    }
    Json(json!({ "message": "对比分析任务已创建。", "comparison_report_id": 20 })).into_response()
}

async fn retry(State(mock): Shared, Path(id): Path<i64>) -> Response {
    mock.retried.store(true, Ordering::SeqCst);
    mock.report_fetches.store(0, Ordering::SeqCst);
    Json(json!({ "message": "已重新提交", "report_id": id })).into_response()
}

async fn request_ai(State(mock): Shared, Path(id): Path<i64>) -> Response {
    if mock.ai_cached {
        return Json(json!({
            "message": "AI 分析已存在",
            "report_id": id,
            "ai_analysis_status": "completed",
            "analysis": "缓存的 AI 分析",
        }))
        .into_response();
    }
    mock.ai_requested.store(true, Ordering::SeqCst);
    Json(json!({
        "message": "AI 分析任务已提交",
        "report_id": id,
        "ai_analysis_status": "processing",
    }))
    .into_response()
}

async fn create_exam() -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "detail": [
                {"loc": ["body", "name"], "msg": "field required", "type": "value_error.missing"},
                {"loc": ["body", "subjects"], "msg": "ensure this value has at least 1 items", "type": "value_error"}
            ]
        })),
    )
        .into_response()
}

fn exam_json(id: i64, status: &str) -> Value {
    json!({
        "id": id,
        "name": "十月月考",
        "exam_date": "2024-10-08",
        "status": status,
        "subjects": [
            {"name": "语文", "full_mark": 150.0},
            {"name": "数学", "full_mark": 150.0}
        ]
    })
}

async fn get_exam(Path(id): Path<i64>) -> Response {
    Json(exam_json(id, "draft")).into_response()
}

async fn finalize_exam(Path(id): Path<i64>) -> Response {
    Json(exam_json(id, "completed")).into_response()
}

async fn class_scores(Path((_exam_id, _class_id)): Path<(i64, i64)>) -> Response {
    Json(json!([
        {"student_id": 1, "subject_scores": {"语文": 120.0, "数学": null}},
        {"student_id": 2, "subject_scores": {"语文": 98.5, "数学": 135.0}}
    ]))
    .into_response()
}

async fn single_score(State(mock): Shared, Json(body): Json<Value>) -> Response {
    if mock.reject_score_writes {
        return detail(StatusCode::FORBIDDEN, "考试已定稿，无法修改成绩");
    }
    mock.score_writes.lock().unwrap().push(body);
    Json(json!({ "message": "成绩已保存" })).into_response()
}

async fn batch_scores(State(mock): Shared, Json(body): Json<Value>) -> Response {
    let count = body["scores"].as_array().map(Vec::len).unwrap_or(0);
    mock.batch_writes.lock().unwrap().push(body);
    Json(json!({ "message": format!("已保存 {} 名学生的成绩", count) })).into_response()
}

async fn class_tree() -> Response {
    Json(json!([
        {"id": 1, "name": "高一", "classes": [
            {"id": 10, "name": "1班", "student_count": 42, "enrollment_year": 2024},
            {"id": 11, "name": "2班", "student_count": 40, "enrollment_year": 2024}
        ]},
        {"id": 2, "name": "高二", "classes": [
            {"id": 20, "name": "1班", "student_count": 38, "enrollment_year": 2023}
        ]}
    ]))
    .into_response()
}

#[derive(Deserialize)]
struct InactiveParam {
    #[serde(default)]
    include_inactive: bool,
}

async fn students_by_class(Path(id): Path<i64>, Query(params): Query<InactiveParam>) -> Response {
    let mut students = vec![
        json!({"id": 1, "student_no": "2024001", "name": "张三", "class_id": id, "is_active": true}),
    ];
    if params.include_inactive {
        students.push(json!({"id": 2, "student_no": "2024002", "name": "李四", "class_id": id, "is_active": false}));
    }
    Json(Value::Array(students)).into_response()
}
