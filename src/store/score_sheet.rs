//! 成绩录入表
//!
//! 一场考试 × 一个班级的成绩网格：
//! - 行：学生；列：考试学科
//! - 单元格修改先校验，再自动保存（`PUT /api/scores/single`）
//! - 保存失败时回滚本地值
//! - 也可以先暂存多处修改，最后批量保存

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::api::exams as api;
use crate::error::{ClientError, Result};
use crate::infrastructure::ApiClient;
use crate::models::{
    ExamDetail, ExamSubject, MessageResponse, ScoresBatch, SingleScoreUpdate, StudentScores,
};

pub struct ScoreSheet {
    client: ApiClient,
    exam: ExamDetail,
    class_id: i64,
    rows: BTreeMap<i64, StudentScores>,
    /// 暂存未保存的学生
    dirty: BTreeSet<i64>,
}

/// 把单元格文本解析为成绩，空白表示清空
pub fn parse_cell(text: &str) -> Result<Option<f64>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ClientError::Validation(format!("'{}' 不是有效的分数", trimmed)))
}

impl ScoreSheet {
    /// 加载考试详情与班级成绩
    pub async fn load(client: ApiClient, exam_id: i64, class_id: i64) -> Result<Self> {
        let exam = api::get_exam(&client, exam_id).await?;
        let scores = api::scores_for_class(&client, exam_id, class_id).await?;
        info!(
            "✓ 成绩表已加载: {} / 班级 #{} ({} 名学生, {} 个学科)",
            exam.name,
            class_id,
            scores.len(),
            exam.subjects.len()
        );
        Ok(Self::from_parts(client, exam, class_id, scores))
    }

    pub fn from_parts(
        client: ApiClient,
        exam: ExamDetail,
        class_id: i64,
        scores: Vec<StudentScores>,
    ) -> Self {
        let rows = scores.into_iter().map(|s| (s.student_id, s)).collect();
        Self {
            client,
            exam,
            class_id,
            rows,
            dirty: BTreeSet::new(),
        }
    }

    pub fn exam(&self) -> &ExamDetail {
        &self.exam
    }

    pub fn class_id(&self) -> i64 {
        self.class_id
    }

    pub fn subjects(&self) -> &[ExamSubject] {
        &self.exam.subjects
    }

    pub fn row(&self, student_id: i64) -> Option<&StudentScores> {
        self.rows.get(&student_id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &StudentScores> {
        self.rows.values()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// 校验一次单元格修改
    pub fn validate(&self, student_id: i64, subject: &str, score: Option<f64>) -> Result<()> {
        if !self.exam.status.is_editable() {
            return Err(ClientError::Validation(format!(
                "考试 '{}' 已锁定（{}），无法修改成绩",
                self.exam.name,
                self.exam.status.label()
            )));
        }
        if !self.rows.contains_key(&student_id) {
            return Err(ClientError::Validation(format!(
                "学生 #{} 不在本班成绩表中",
                student_id
            )));
        }
        let Some(meta) = self.exam.subject(subject) else {
            return Err(ClientError::Validation(format!(
                "考试 '{}' 不包含学科 '{}'",
                self.exam.name, subject
            )));
        };
        if let Some(value) = score {
            if !value.is_finite() || value < 0.0 || value > meta.full_mark {
                return Err(ClientError::Validation(format!(
                    "{} 成绩必须在 0 到 {} 之间，当前为 {}",
                    subject, meta.full_mark, value
                )));
            }
        }
        Ok(())
    }

    /// 修改单元格并立即保存
    pub async fn set_score(&mut self, student_id: i64, subject: &str, score: Option<f64>) -> Result<()> {
        self.validate(student_id, subject, score)?;
        let previous = self.write_cell(student_id, subject, score);

        let update = SingleScoreUpdate {
            exam_id: self.exam.id,
            student_id,
            subject_name: subject.to_string(),
            score,
        };
        match api::record_single_score(&self.client, &update).await {
            Ok(_) => {
                debug!("成绩已保存: 学生 #{} {} = {:?}", student_id, subject, score);
                Ok(())
            }
            Err(e) => {
                warn!("成绩保存失败，已回滚: 学生 #{} {}: {}", student_id, subject, e);
                self.write_cell(student_id, subject, previous);
                Err(e)
            }
        }
    }

    pub async fn clear_score(&mut self, student_id: i64, subject: &str) -> Result<()> {
        self.set_score(student_id, subject, None).await
    }

    /// 只修改本地值，稍后由 [`ScoreSheet::save_all`] 批量保存
    pub fn stage_score(&mut self, student_id: i64, subject: &str, score: Option<f64>) -> Result<()> {
        self.validate(student_id, subject, score)?;
        self.write_cell(student_id, subject, score);
        self.dirty.insert(student_id);
        Ok(())
    }

    /// 批量保存所有暂存修改
    pub async fn save_all(&mut self) -> Result<MessageResponse> {
        if self.dirty.is_empty() {
            return Ok(MessageResponse {
                message: "没有需要保存的修改".to_string(),
            });
        }
        let batch = ScoresBatch {
            exam_id: self.exam.id,
            scores: self
                .dirty
                .iter()
                .filter_map(|id| self.rows.get(id).cloned())
                .collect(),
        };
        let response = api::record_scores_batch(&self.client, &batch).await?;
        info!("✓ 批量保存 {} 名学生的成绩", batch.scores.len());
        self.dirty.clear();
        Ok(response)
    }

    /// (已录入单元格数, 总单元格数)
    pub fn completion(&self) -> (usize, usize) {
        let total = self.rows.len() * self.exam.subjects.len();
        let filled = self
            .rows
            .values()
            .map(|row| {
                self.exam
                    .subjects
                    .iter()
                    .filter(|s| row.score(&s.name).is_some())
                    .count()
            })
            .sum();
        (filled, total)
    }

    /// 学科平均分（只计已录入的成绩）
    pub fn subject_average(&self, subject: &str) -> Option<f64> {
        let values: Vec<f64> = self.rows.values().filter_map(|r| r.score(subject)).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    fn write_cell(&mut self, student_id: i64, subject: &str, score: Option<f64>) -> Option<f64> {
        let row = self
            .rows
            .entry(student_id)
            .or_insert_with(|| StudentScores::new(student_id));
        row.subject_scores
            .insert(subject.to_string(), score)
            .flatten()
    }
}
