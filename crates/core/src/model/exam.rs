use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ExamId, SubjectId, UserId};

pub const DEFAULT_EXAM_MINUTES: u32 = 180;
pub const DEFAULT_WEIGHTAGE: u8 = 100;

const SECONDS_PER_DAY: i64 = 86_400;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("weightage must be between 0 and 100, got {0}")]
    InvalidWeightage(u8),

    #[error("study progress must be between 0 and 100, got {0}")]
    InvalidProgress(u8),

    #[error("invalid preparation status: {0}")]
    InvalidStatus(String),

    #[error("invalid exam type: {0}")]
    InvalidType(String),
}

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

/// How far along the user is in preparing for an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreparationStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Revision,
}

impl PreparationStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PreparationStatus::NotStarted => "not-started",
            PreparationStatus::InProgress => "in-progress",
            PreparationStatus::Completed => "completed",
            PreparationStatus::Revision => "revision",
        }
    }
}

impl fmt::Display for PreparationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreparationStatus {
    type Err = ExamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not-started" => Ok(Self::NotStarted),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "revision" => Ok(Self::Revision),
            other => Err(ExamError::InvalidStatus(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Midterm,
    Final,
    Quiz,
    Assignment,
    Project,
    #[default]
    Other,
}

impl ExamType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExamType::Midterm => "midterm",
            ExamType::Final => "final",
            ExamType::Quiz => "quiz",
            ExamType::Assignment => "assignment",
            ExamType::Project => "project",
            ExamType::Other => "other",
        }
    }
}

impl FromStr for ExamType {
    type Err = ExamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "midterm" => Ok(Self::Midterm),
            "final" => Ok(Self::Final),
            "quiz" => Ok(Self::Quiz),
            "assignment" => Ok(Self::Assignment),
            "project" => Ok(Self::Project),
            "other" => Ok(Self::Other),
            other => Err(ExamError::InvalidType(other.to_owned())),
        }
    }
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

/// Input shape for creating an exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamDraft {
    pub subject_id: Option<SubjectId>,
    pub title: String,
    pub exam_date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub total_marks: u32,
    pub weightage: u8,
    pub exam_type: ExamType,
}

impl ExamDraft {
    #[must_use]
    pub fn new(
        subject_id: Option<SubjectId>,
        title: impl Into<String>,
        exam_date: DateTime<Utc>,
    ) -> Self {
        Self {
            subject_id,
            title: title.into(),
            exam_date,
            duration_minutes: DEFAULT_EXAM_MINUTES,
            total_marks: 100,
            weightage: DEFAULT_WEIGHTAGE,
            exam_type: ExamType::default(),
        }
    }
}

/// Partial update of an exam's details.
///
/// Preparation and results have their own operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamEdit {
    /// Relink the exam to another subject.
    pub subject_id: Option<SubjectId>,
    pub title: Option<String>,
    pub exam_date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u32>,
    pub total_marks: Option<u32>,
    pub weightage: Option<u8>,
    pub exam_type: Option<ExamType>,
}

/// A dated assessment, optionally linked to a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    id: ExamId,
    user_id: UserId,
    subject_id: Option<SubjectId>,
    title: String,
    exam_date: DateTime<Utc>,
    duration_minutes: u32,
    total_marks: u32,
    weightage: u8,
    exam_type: ExamType,
    preparation_status: PreparationStatus,
    study_progress: u8,
    is_passed: bool,
}

impl Exam {
    /// Creates a not-started exam from a draft.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptyTitle` or `ExamError::InvalidWeightage`.
    pub fn new(id: ExamId, user_id: UserId, draft: ExamDraft) -> Result<Self, ExamError> {
        Self::from_persisted(
            id,
            user_id,
            draft.subject_id,
            draft.title,
            draft.exam_date,
            draft.duration_minutes,
            draft.total_marks,
            draft.weightage,
            draft.exam_type,
            PreparationStatus::NotStarted,
            0,
            false,
        )
    }

    /// Rehydrate an exam from storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` if title, weightage or progress are invalid.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ExamId,
        user_id: UserId,
        subject_id: Option<SubjectId>,
        title: impl Into<String>,
        exam_date: DateTime<Utc>,
        duration_minutes: u32,
        total_marks: u32,
        weightage: u8,
        exam_type: ExamType,
        preparation_status: PreparationStatus,
        study_progress: u8,
        is_passed: bool,
    ) -> Result<Self, ExamError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if weightage > 100 {
            return Err(ExamError::InvalidWeightage(weightage));
        }
        if study_progress > 100 {
            return Err(ExamError::InvalidProgress(study_progress));
        }

        Ok(Self {
            id,
            user_id,
            subject_id,
            title: title.trim().to_owned(),
            exam_date,
            duration_minutes,
            total_marks,
            weightage,
            exam_type,
            preparation_status,
            study_progress,
            is_passed,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn subject_id(&self) -> Option<SubjectId> {
        self.subject_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn exam_date(&self) -> DateTime<Utc> {
        self.exam_date
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn total_marks(&self) -> u32 {
        self.total_marks
    }

    #[must_use]
    pub fn weightage(&self) -> u8 {
        self.weightage
    }

    #[must_use]
    pub fn exam_type(&self) -> ExamType {
        self.exam_type
    }

    #[must_use]
    pub fn preparation_status(&self) -> PreparationStatus {
        self.preparation_status
    }

    #[must_use]
    pub fn study_progress(&self) -> u8 {
        self.study_progress
    }

    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.is_passed
    }

    /// Only exams that are not completed act as urgency signals.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.preparation_status != PreparationStatus::Completed
    }

    /// Whole days until the exam, rounded up; negative once it has passed.
    #[must_use]
    pub fn days_until(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.exam_date - now).num_seconds();
        secs.div_euclid(SECONDS_PER_DAY) + i64::from(secs.rem_euclid(SECONDS_PER_DAY) != 0)
    }

    /// Update preparation status and, optionally, study progress.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidProgress` if progress exceeds 100.
    pub fn set_preparation(
        &mut self,
        status: PreparationStatus,
        progress: Option<u8>,
    ) -> Result<(), ExamError> {
        if let Some(p) = progress {
            if p > 100 {
                return Err(ExamError::InvalidProgress(p));
            }
            self.study_progress = p;
        }
        self.preparation_status = status;
        Ok(())
    }

    pub fn set_passed(&mut self, passed: bool) {
        self.is_passed = passed;
    }

    /// Apply an edit. Nothing changes unless every supplied field is valid.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::EmptyTitle` or `ExamError::InvalidWeightage`.
    pub fn apply_edit(&mut self, edit: ExamEdit) -> Result<(), ExamError> {
        let title = match edit.title {
            Some(t) if t.trim().is_empty() => return Err(ExamError::EmptyTitle),
            Some(t) => t.trim().to_owned(),
            None => self.title.clone(),
        };
        if let Some(w) = edit.weightage.filter(|w| *w > 100) {
            return Err(ExamError::InvalidWeightage(w));
        }

        self.title = title;
        if let Some(subject_id) = edit.subject_id {
            self.subject_id = Some(subject_id);
        }
        if let Some(date) = edit.exam_date {
            self.exam_date = date;
        }
        if let Some(minutes) = edit.duration_minutes {
            self.duration_minutes = minutes;
        }
        if let Some(marks) = edit.total_marks {
            self.total_marks = marks;
        }
        if let Some(w) = edit.weightage {
            self.weightage = w;
        }
        if let Some(kind) = edit.exam_type {
            self.exam_type = kind;
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn exam_at(date: DateTime<Utc>) -> Exam {
        Exam::new(
            ExamId::new(1),
            UserId::new(1),
            ExamDraft::new(Some(SubjectId::new(1)), "Midterm", date),
        )
        .unwrap()
    }

    #[test]
    fn exam_rejects_empty_title() {
        let err = Exam::new(
            ExamId::new(1),
            UserId::new(1),
            ExamDraft::new(None, "  ", fixed_now()),
        )
        .unwrap_err();
        assert_eq!(err, ExamError::EmptyTitle);
    }

    #[test]
    fn new_exam_is_pending_until_completed() {
        let mut exam = exam_at(fixed_now());
        assert_eq!(exam.preparation_status(), PreparationStatus::NotStarted);
        assert!(exam.is_pending());

        exam.set_preparation(PreparationStatus::Revision, Some(80)).unwrap();
        assert!(exam.is_pending());
        assert_eq!(exam.study_progress(), 80);

        exam.set_preparation(PreparationStatus::Completed, None).unwrap();
        assert!(!exam.is_pending());
        assert_eq!(exam.study_progress(), 80);
    }

    #[test]
    fn set_preparation_rejects_progress_over_100() {
        let mut exam = exam_at(fixed_now());
        let err = exam
            .set_preparation(PreparationStatus::InProgress, Some(101))
            .unwrap_err();
        assert_eq!(err, ExamError::InvalidProgress(101));
        assert_eq!(exam.preparation_status(), PreparationStatus::NotStarted);
    }

    #[test]
    fn days_until_rounds_up() {
        let now = fixed_now();
        assert_eq!(exam_at(now + Duration::hours(25)).days_until(now), 2);
        assert_eq!(exam_at(now + Duration::days(3)).days_until(now), 3);
        assert_eq!(exam_at(now).days_until(now), 0);
        assert_eq!(exam_at(now - Duration::hours(36)).days_until(now), -1);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            PreparationStatus::NotStarted,
            PreparationStatus::InProgress,
            PreparationStatus::Completed,
            PreparationStatus::Revision,
        ] {
            assert_eq!(status.as_str().parse::<PreparationStatus>().unwrap(), status);
        }
        assert!("done".parse::<PreparationStatus>().is_err());
    }

    #[test]
    fn edit_moves_date_and_validates() {
        let mut exam = exam_at(fixed_now());
        exam.apply_edit(ExamEdit {
            title: Some("Final".into()),
            exam_date: Some(fixed_now() + Duration::days(10)),
            exam_type: Some(ExamType::Final),
            ..ExamEdit::default()
        })
        .unwrap();
        assert_eq!(exam.title(), "Final");
        assert_eq!(exam.days_until(fixed_now()), 10);
        assert_eq!(exam.exam_type(), ExamType::Final);
        assert_eq!(exam.subject_id(), Some(SubjectId::new(1)));

        let before = exam.clone();
        let err = exam
            .apply_edit(ExamEdit {
                title: Some("Retake".into()),
                weightage: Some(120),
                ..ExamEdit::default()
            })
            .unwrap_err();
        assert_eq!(err, ExamError::InvalidWeightage(120));
        assert_eq!(exam, before);
    }
}
