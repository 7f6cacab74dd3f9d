//! 年级 / 班级 / 学生 API 模块

use serde_json::json;
use tracing::info;

use crate::error::{ClientError, Result};
use crate::infrastructure::ApiClient;
use crate::models::roster::require_ids;
use crate::models::{
    Class, ClassCreate, ClassUpdate, Grade, GradeCreate, GradeTree, GradeUpdate,
    MessageResponse, PerformanceHistory, Student, StudentBatchClassUpdate,
    StudentBatchStatusUpdate, StudentCreate, StudentDetail, StudentUpdate,
};

// ========== 年级 ==========

pub async fn list_grades(client: &ApiClient) -> Result<Vec<Grade>> {
    client.get("/api/grades/").await
}

pub async fn create_grade(client: &ApiClient, grade: &GradeCreate) -> Result<Grade> {
    if grade.name.trim().is_empty() {
        return Err(ClientError::Validation("年级名称不能为空".to_string()));
    }
    let created: Grade = client.post("/api/grades/", grade).await?;
    info!("✓ 年级已创建: {} (#{})", created.name, created.id);
    Ok(created)
}

pub async fn update_grade(client: &ApiClient, grade_id: i64, update: &GradeUpdate) -> Result<Grade> {
    client.put(&format!("/api/grades/{}", grade_id), update).await
}

/// 删除年级（下属班级仍有学生时后端会拒绝）
pub async fn delete_grade(client: &ApiClient, grade_id: i64) -> Result<()> {
    client.delete(&format!("/api/grades/{}", grade_id)).await
}

// ========== 班级 ==========

pub async fn list_classes(client: &ApiClient) -> Result<Vec<Class>> {
    client.get("/api/classes/").await
}

/// 年级-班级树（含每班人数）
pub async fn class_tree(client: &ApiClient) -> Result<Vec<GradeTree>> {
    client.get("/api/classes/tree").await
}

pub async fn get_class(client: &ApiClient, class_id: i64) -> Result<Class> {
    client.get(&format!("/api/classes/{}", class_id)).await
}

pub async fn create_class(client: &ApiClient, class: &ClassCreate) -> Result<Class> {
    if class.name.trim().is_empty() {
        return Err(ClientError::Validation("班级名称不能为空".to_string()));
    }
    let created: Class = client.post("/api/classes/", class).await?;
    info!("✓ 班级已创建: {} (#{})", created.name, created.id);
    Ok(created)
}

pub async fn update_class(client: &ApiClient, class_id: i64, update: &ClassUpdate) -> Result<Class> {
    client.put(&format!("/api/classes/{}", class_id), update).await
}

pub async fn delete_class(client: &ApiClient, class_id: i64) -> Result<()> {
    client.delete(&format!("/api/classes/{}", class_id)).await
}

// ========== 学生 ==========

pub async fn create_student(client: &ApiClient, student: &StudentCreate) -> Result<Student> {
    student.validate()?;
    client.post("/api/students/", student).await
}

/// 批量新增学生（学号由后端按入学年份生成）
pub async fn create_students_batch(
    client: &ApiClient,
    students: &[StudentCreate],
) -> Result<Vec<Student>> {
    if students.is_empty() {
        return Err(ClientError::Validation("至少需要一名学生".to_string()));
    }
    for s in students {
        s.validate()?;
    }
    let created: Vec<Student> = client
        .post("/api/students/batch", &json!({ "students": students }))
        .await?;
    info!("✓ 批量新增 {} 名学生", created.len());
    Ok(created)
}

pub async fn students_by_class(
    client: &ApiClient,
    class_id: i64,
    include_inactive: bool,
) -> Result<Vec<Student>> {
    client
        .get_with_query(
            &format!("/api/students/by_class/{}", class_id),
            &[("include_inactive", include_inactive)],
        )
        .await
}

pub async fn update_student(
    client: &ApiClient,
    student_id: i64,
    update: &StudentUpdate,
) -> Result<Student> {
    client.put(&format!("/api/students/{}", student_id), update).await
}

pub async fn set_student_active(client: &ApiClient, student_id: i64, active: bool) -> Result<Student> {
    let action = if active { "activate" } else { "deactivate" };
    client
        .put_empty(&format!("/api/students/{}/{}", student_id, action))
        .await
}

pub async fn batch_update_status(
    client: &ApiClient,
    update: &StudentBatchStatusUpdate,
) -> Result<MessageResponse> {
    require_ids(&update.student_ids)?;
    client.post("/api/students/batch-update-status", update).await
}

/// 批量分班或升学
pub async fn batch_update_class(
    client: &ApiClient,
    update: &StudentBatchClassUpdate,
) -> Result<MessageResponse> {
    require_ids(&update.student_ids)?;
    client.post("/api/students/batch-update-class", update).await
}

pub async fn student_details(client: &ApiClient, student_id: i64) -> Result<StudentDetail> {
    client
        .get(&format!("/api/students/{}/details", student_id))
        .await
}

/// 学生历次考试表现
pub async fn student_performance(client: &ApiClient, student_id: i64) -> Result<PerformanceHistory> {
    client
        .get(&format!("/api/students/{}/performance", student_id))
        .await
}
