use std::sync::Arc;

use chrono::Duration;
use storage::repository::{ExamFilter, ExamRepository, NewExamRecord, SubjectRepository};
use study_core::model::{
    Exam, ExamDraft, ExamEdit, ExamId, ExamStats, PreparationStatus, SubjectId, UserId,
};
use tracing::info;

use crate::Clock;
use crate::error::ExamServiceError;

/// Look-ahead used by `ExamService::upcoming_exams` when the caller has no preference.
pub const DEFAULT_UPCOMING_DAYS: u32 = 30;

/// Orchestrates exam creation, preparation tracking and stats.
#[derive(Clone)]
pub struct ExamService {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    subjects: Arc<dyn SubjectRepository>,
}

impl ExamService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        subjects: Arc<dyn SubjectRepository>,
    ) -> Self {
        Self {
            clock,
            exams,
            subjects,
        }
    }

    /// Validate and persist a new exam.
    ///
    /// A linked subject must exist and belong to the same user.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::SubjectNotFound` for a missing or foreign
    /// subject, `ExamServiceError::Exam` for validation failures, or
    /// `ExamServiceError::Storage` if persistence fails.
    pub async fn create_exam(
        &self,
        user_id: UserId,
        draft: ExamDraft,
    ) -> Result<Exam, ExamServiceError> {
        if let Some(subject_id) = draft.subject_id {
            self.ensure_owned_subject(user_id, subject_id).await?;
        }

        let exam = Exam::new(ExamId::new(0), user_id, draft)?;
        let record = NewExamRecord::from_exam(&exam);
        let id = self.exams.insert_new_exam(record.clone()).await?;
        info!(exam_id = %id, user_id = %user_id, "exam created");
        Ok(record.into_exam(id)?)
    }

    async fn ensure_owned_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<(), ExamServiceError> {
        let owned = self
            .subjects
            .get_subject(subject_id)
            .await?
            .is_some_and(|s| s.user_id() == user_id);
        if !owned {
            return Err(ExamServiceError::SubjectNotFound(subject_id));
        }
        Ok(())
    }

    /// Fetch an exam owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::NotFound` or `ExamServiceError::Forbidden`.
    pub async fn get_exam(&self, user_id: UserId, exam_id: ExamId) -> Result<Exam, ExamServiceError> {
        let exam = self
            .exams
            .get_exam(exam_id)
            .await?
            .ok_or(ExamServiceError::NotFound(exam_id))?;
        if exam.user_id() != user_id {
            return Err(ExamServiceError::Forbidden(exam_id));
        }
        Ok(exam)
    }

    /// A user's exams matching `filter`, earliest first.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if repository access fails.
    pub async fn list_exams(
        &self,
        user_id: UserId,
        filter: ExamFilter,
    ) -> Result<Vec<Exam>, ExamServiceError> {
        let now = self.clock.now();
        let mut exams = self.exams.list_exams(user_id).await?;
        exams.retain(|e| filter.matches(e, now));
        Ok(exams)
    }

    /// Exams dated within the next `days` days, earliest first.
    ///
    /// Selection is by date alone; preparation status does not matter.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if repository access fails.
    pub async fn upcoming_exams(
        &self,
        user_id: UserId,
        days: u32,
    ) -> Result<Vec<Exam>, ExamServiceError> {
        let now = self.clock.now();
        let horizon = now + Duration::days(i64::from(days));
        let mut exams = self.exams.list_exams(user_id).await?;
        exams.retain(|e| e.exam_date() >= now && e.exam_date() <= horizon);
        Ok(exams)
    }

    /// Change an exam's details. Omitted fields stay as they are.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if the exam is missing or foreign, a relinked
    /// subject is missing or foreign, the edit is invalid, or storage fails.
    pub async fn update_exam(
        &self,
        user_id: UserId,
        exam_id: ExamId,
        edit: ExamEdit,
    ) -> Result<Exam, ExamServiceError> {
        let mut exam = self.get_exam(user_id, exam_id).await?;
        if let Some(subject_id) = edit.subject_id {
            self.ensure_owned_subject(user_id, subject_id).await?;
        }
        exam.apply_edit(edit)?;
        self.exams.upsert_exam(&exam).await?;
        info!(exam_id = %exam_id, "exam updated");
        Ok(exam)
    }

    /// # Errors
    ///
    /// Returns `ExamServiceError` if the exam is missing or foreign, or
    /// storage fails.
    pub async fn delete_exam(&self, user_id: UserId, exam_id: ExamId) -> Result<(), ExamServiceError> {
        self.get_exam(user_id, exam_id).await?;
        self.exams.delete_exam(exam_id).await?;
        info!(exam_id = %exam_id, user_id = %user_id, "exam deleted");
        Ok(())
    }

    /// Record preparation status and, optionally, study progress.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if the exam is missing or foreign, the
    /// progress is out of range, or storage fails.
    pub async fn update_preparation(
        &self,
        user_id: UserId,
        exam_id: ExamId,
        status: PreparationStatus,
        progress: Option<u8>,
    ) -> Result<Exam, ExamServiceError> {
        let mut exam = self.get_exam(user_id, exam_id).await?;
        exam.set_preparation(status, progress)?;
        self.exams.upsert_exam(&exam).await?;
        Ok(exam)
    }

    /// Record whether the exam was passed.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError` if the exam is missing or foreign, or
    /// storage fails.
    pub async fn record_result(
        &self,
        user_id: UserId,
        exam_id: ExamId,
        passed: bool,
    ) -> Result<Exam, ExamServiceError> {
        let mut exam = self.get_exam(user_id, exam_id).await?;
        exam.set_passed(passed);
        self.exams.upsert_exam(&exam).await?;
        Ok(exam)
    }

    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if repository access fails.
    pub async fn exam_stats(&self, user_id: UserId) -> Result<ExamStats, ExamServiceError> {
        let exams = self.exams.list_exams(user_id).await?;
        Ok(ExamStats::from_exams(&exams, self.clock.now()))
    }
}
