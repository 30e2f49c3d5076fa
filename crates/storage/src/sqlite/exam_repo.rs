use study_core::model::{Exam, ExamId, PreparationStatus, UserId};

use super::SqliteRepository;
use super::mapping::{conn, exam_id_from_i64, id_to_i64, map_exam_row};
use crate::repository::{ExamRepository, NewExamRecord, StorageError};

const EXAM_COLUMNS: &str = "id, user_id, subject_id, title, exam_date, duration_minutes, \
     total_marks, weightage, exam_type, preparation_status, study_progress, is_passed";

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn insert_new_exam(&self, record: NewExamRecord) -> Result<ExamId, StorageError> {
        let exam = record.exam();
        let subject_id = exam
            .subject_id()
            .map(|id| id_to_i64("subject_id", id.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
            INSERT INTO exams (
                user_id, subject_id, title, exam_date, duration_minutes, total_marks,
                weightage, exam_type, preparation_status, study_progress, is_passed
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(id_to_i64("user_id", exam.user_id().value())?)
        .bind(subject_id)
        .bind(exam.title())
        .bind(exam.exam_date())
        .bind(i64::from(exam.duration_minutes()))
        .bind(i64::from(exam.total_marks()))
        .bind(i64::from(exam.weightage()))
        .bind(exam.exam_type().as_str())
        .bind(exam.preparation_status().as_str())
        .bind(i64::from(exam.study_progress()))
        .bind(i64::from(exam.is_passed()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        exam_id_from_i64(res.last_insert_rowid())
    }

    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let subject_id = exam
            .subject_id()
            .map(|id| id_to_i64("subject_id", id.value()))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO exams (
                id, user_id, subject_id, title, exam_date, duration_minutes, total_marks,
                weightage, exam_type, preparation_status, study_progress, is_passed
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(id) DO UPDATE SET
                subject_id = excluded.subject_id,
                title = excluded.title,
                exam_date = excluded.exam_date,
                duration_minutes = excluded.duration_minutes,
                total_marks = excluded.total_marks,
                weightage = excluded.weightage,
                exam_type = excluded.exam_type,
                preparation_status = excluded.preparation_status,
                study_progress = excluded.study_progress,
                is_passed = excluded.is_passed
            ",
        )
        .bind(id_to_i64("exam_id", exam.id().value())?)
        .bind(id_to_i64("user_id", exam.user_id().value())?)
        .bind(subject_id)
        .bind(exam.title())
        .bind(exam.exam_date())
        .bind(i64::from(exam.duration_minutes()))
        .bind(i64::from(exam.total_marks()))
        .bind(i64::from(exam.weightage()))
        .bind(exam.exam_type().as_str())
        .bind(exam.preparation_status().as_str())
        .bind(i64::from(exam.study_progress()))
        .bind(i64::from(exam.is_passed()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let sql = format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("exam_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_exam_row).transpose()
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM exams WHERE id = ?1")
            .bind(id_to_i64("exam_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn find_pending_exams(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Exam>, StorageError> {
        let sql = format!(
            "SELECT {EXAM_COLUMNS} FROM exams \
             WHERE user_id = ?1 AND preparation_status != ?2 \
             ORDER BY exam_date ASC, id ASC LIMIT ?3"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("user_id", user_id.value())?)
            .bind(PreparationStatus::Completed.as_str())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_exam_row).collect()
    }

    async fn list_exams(&self, user_id: UserId) -> Result<Vec<Exam>, StorageError> {
        let sql = format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE user_id = ?1 ORDER BY exam_date ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("user_id", user_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_exam_row).collect()
    }
}
