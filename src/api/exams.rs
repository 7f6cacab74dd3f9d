//! 考试与成绩 API 模块

use tracing::info;

use crate::error::Result;
use crate::infrastructure::ApiClient;
use crate::models::{
    Exam, ExamCreate, ExamDetail, MessageResponse, ScoresBatch, SingleScoreUpdate, StudentScores,
};

// ========== 考试 ==========

pub async fn list_exams(client: &ApiClient) -> Result<Vec<Exam>> {
    client.get("/api/exams/").await
}

/// 获取考试详情（含学科及满分）
pub async fn get_exam(client: &ApiClient, exam_id: i64) -> Result<ExamDetail> {
    client.get(&format!("/api/exams/{}", exam_id)).await
}

/// 创建考试（草稿状态）
pub async fn create_exam(client: &ApiClient, exam: &ExamCreate) -> Result<Exam> {
    exam.validate()?;
    let created: Exam = client.post("/api/exams/", exam).await?;
    info!("✓ 考试已创建: {} (#{})", created.name, created.id);
    Ok(created)
}

/// 定稿：草稿 → 已定稿，之后不可修改成绩
pub async fn finalize_exam(client: &ApiClient, exam_id: i64) -> Result<Exam> {
    let exam: Exam = client
        .put_empty(&format!("/api/exams/{}/finalize", exam_id))
        .await?;
    info!("🔒 考试 #{} 已定稿", exam_id);
    Ok(exam)
}

/// 解锁：重置为草稿以便更正成绩
pub async fn unlock_exam(client: &ApiClient, exam_id: i64) -> Result<Exam> {
    let exam: Exam = client
        .put_empty(&format!("/api/exams/{}/unlock", exam_id))
        .await?;
    info!("🔓 考试 #{} 已解锁", exam_id);
    Ok(exam)
}

/// 删除考试（仅限未录入成绩的草稿）
pub async fn delete_exam(client: &ApiClient, exam_id: i64) -> Result<()> {
    client.delete(&format!("/api/exams/{}", exam_id)).await
}

// ========== 成绩 ==========

/// 获取班级在某场考试中的所有成绩（只含在读学生）
pub async fn scores_for_class(
    client: &ApiClient,
    exam_id: i64,
    class_id: i64,
) -> Result<Vec<StudentScores>> {
    client
        .get(&format!("/api/scores/exam/{}/class/{}", exam_id, class_id))
        .await
}

/// 批量录入或更新成绩（仅限草稿考试）
pub async fn record_scores_batch(client: &ApiClient, batch: &ScoresBatch) -> Result<MessageResponse> {
    batch.validate()?;
    client.post("/api/scores/batch", batch).await
}

/// 录入或更新单个成绩（自动保存）
pub async fn record_single_score(
    client: &ApiClient,
    update: &SingleScoreUpdate,
) -> Result<MessageResponse> {
    client.put("/api/scores/single", update).await
}
