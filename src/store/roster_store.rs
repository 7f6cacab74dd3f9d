//! 年级-班级-学生仓库
//!
//! 缓存年级-班级树和各班学生名单；写操作成功后刷新对应缓存

use std::collections::HashMap;

use tracing::info;

use crate::api::roster as api;
use crate::error::Result;
use crate::infrastructure::ApiClient;
use crate::models::{
    Class, ClassCreate, ClassNode, Grade, GradeCreate, GradeTree, GradeUpdate, Student,
    StudentBatchClassUpdate, StudentBatchStatusUpdate, StudentCreate,
};

pub struct RosterStore {
    client: ApiClient,
    tree: Vec<GradeTree>,
    students: HashMap<i64, Vec<Student>>,
}

impl RosterStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            tree: Vec::new(),
            students: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &[GradeTree] {
        &self.tree
    }

    /// 查找班级及其所属年级
    pub fn find_class(&self, class_id: i64) -> Option<(&GradeTree, &ClassNode)> {
        self.tree.iter().find_map(|grade| {
            grade
                .classes
                .iter()
                .find(|c| c.id == class_id)
                .map(|c| (grade, c))
        })
    }

    pub fn total_students(&self) -> u32 {
        self.tree.iter().map(GradeTree::student_count).sum()
    }

    /// 已加载的班级学生名单
    pub fn students(&self, class_id: i64) -> Option<&[Student]> {
        self.students.get(&class_id).map(Vec::as_slice)
    }

    pub async fn load_tree(&mut self) -> Result<&[GradeTree]> {
        self.tree = api::class_tree(&self.client).await?;
        info!(
            "✓ 已加载 {} 个年级, {} 名学生",
            self.tree.len(),
            self.total_students()
        );
        Ok(&self.tree)
    }

    pub async fn load_students(&mut self, class_id: i64, include_inactive: bool) -> Result<&[Student]> {
        let students = api::students_by_class(&self.client, class_id, include_inactive).await?;
        let slot = self.students.entry(class_id).or_default();
        *slot = students;
        Ok(slot.as_slice())
    }

    // ========== 年级 / 班级 ==========

    pub async fn create_grade(&mut self, name: &str) -> Result<Grade> {
        let grade = api::create_grade(
            &self.client,
            &GradeCreate {
                name: name.to_string(),
            },
        )
        .await?;
        self.load_tree().await?;
        Ok(grade)
    }

    pub async fn rename_grade(&mut self, grade_id: i64, name: &str) -> Result<Grade> {
        let update = GradeUpdate {
            name: Some(name.to_string()),
        };
        let grade = api::update_grade(&self.client, grade_id, &update).await?;
        if let Some(node) = self.tree.iter_mut().find(|g| g.id == grade_id) {
            node.name = grade.name.clone();
        }
        Ok(grade)
    }

    pub async fn delete_grade(&mut self, grade_id: i64) -> Result<()> {
        api::delete_grade(&self.client, grade_id).await?;
        self.tree.retain(|g| g.id != grade_id);
        Ok(())
    }

    pub async fn create_class(&mut self, class: &ClassCreate) -> Result<Class> {
        let created = api::create_class(&self.client, class).await?;
        self.load_tree().await?;
        Ok(created)
    }

    pub async fn delete_class(&mut self, class_id: i64) -> Result<()> {
        api::delete_class(&self.client, class_id).await?;
        for grade in &mut self.tree {
            grade.classes.retain(|c| c.id != class_id);
        }
        self.students.remove(&class_id);
        Ok(())
    }

    // ========== 学生 ==========

    pub async fn add_students(&mut self, class_id: i64, names: &[String]) -> Result<Vec<Student>> {
        let batch: Vec<StudentCreate> = names
            .iter()
            .map(|name| StudentCreate {
                name: name.trim().to_string(),
                class_id,
            })
            .collect();
        let created = api::create_students_batch(&self.client, &batch).await?;
        self.students
            .entry(class_id)
            .or_default()
            .extend(created.iter().cloned());
        self.load_tree().await?;
        Ok(created)
    }

    /// 批量分班；源班级与目标班级的名单缓存失效
    pub async fn move_students(&mut self, student_ids: &[i64], target_class_id: i64) -> Result<()> {
        let update = StudentBatchClassUpdate {
            student_ids: student_ids.to_vec(),
            target_class_id,
        };
        let response = api::batch_update_class(&self.client, &update).await?;
        info!("✓ {}", response.message);
        self.invalidate_students_of(student_ids);
        self.students.remove(&target_class_id);
        self.load_tree().await?;
        Ok(())
    }

    pub async fn set_students_active(&mut self, student_ids: &[i64], active: bool) -> Result<()> {
        let update = StudentBatchStatusUpdate {
            student_ids: student_ids.to_vec(),
            is_active: active,
        };
        let response = api::batch_update_status(&self.client, &update).await?;
        info!("✓ {}", response.message);
        for students in self.students.values_mut() {
            for s in students.iter_mut().filter(|s| student_ids.contains(&s.id)) {
                s.is_active = active;
            }
        }
        Ok(())
    }

    fn invalidate_students_of(&mut self, student_ids: &[i64]) {
        self.students
            .retain(|_, list| !list.iter().any(|s| student_ids.contains(&s.id)));
    }
}
