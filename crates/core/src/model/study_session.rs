use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{ExamId, StudySessionId, SubjectId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySessionError {
    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("productivity must be between 1 and 10, got {0}")]
    InvalidProductivity(u8),
}

/// Input shape for logging a study session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySessionDraft {
    pub subject_id: Option<SubjectId>,
    pub exam_id: Option<ExamId>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub topics_covered: Vec<String>,
    pub notes: Option<String>,
    pub productivity: Option<u8>,
}

impl StudySessionDraft {
    #[must_use]
    pub fn new(
        subject_id: Option<SubjectId>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject_id,
            exam_id: None,
            started_at,
            ended_at,
            topics_covered: Vec::new(),
            notes: None,
            productivity: None,
        }
    }
}

/// Partial update of a logged session, e.g. closing it when a timer stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudySessionEdit {
    pub ended_at: Option<DateTime<Utc>>,
    pub topics_covered: Option<Vec<String>>,
    pub notes: Option<String>,
    pub productivity: Option<u8>,
}

/// A block of logged study time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySession {
    id: StudySessionId,
    user_id: UserId,
    subject_id: Option<SubjectId>,
    exam_id: Option<ExamId>,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    topics_covered: Vec<String>,
    notes: Option<String>,
    productivity: Option<u8>,
}

impl StudySession {
    /// Validate a draft into a session.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::InvalidTimeRange` if the session ends before it
    /// starts, or `InvalidProductivity` for ratings outside 1..=10.
    pub fn new(
        id: StudySessionId,
        user_id: UserId,
        draft: StudySessionDraft,
    ) -> Result<Self, StudySessionError> {
        if draft.ended_at < draft.started_at {
            return Err(StudySessionError::InvalidTimeRange);
        }
        if let Some(p) = draft.productivity {
            if !(1..=10).contains(&p) {
                return Err(StudySessionError::InvalidProductivity(p));
            }
        }

        let topics_covered = draft
            .topics_covered
            .into_iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        let notes = draft
            .notes
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());

        Ok(Self {
            id,
            user_id,
            subject_id: draft.subject_id,
            exam_id: draft.exam_id,
            started_at: draft.started_at,
            ended_at: draft.ended_at,
            topics_covered,
            notes,
            productivity: draft.productivity,
        })
    }

    /// Apply an edit, revalidating the whole session.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError` if the edited session would be invalid; the
    /// session is left unchanged.
    pub fn apply_edit(&mut self, edit: StudySessionEdit) -> Result<(), StudySessionError> {
        let draft = StudySessionDraft {
            subject_id: self.subject_id,
            exam_id: self.exam_id,
            started_at: self.started_at,
            ended_at: edit.ended_at.unwrap_or(self.ended_at),
            topics_covered: edit
                .topics_covered
                .unwrap_or_else(|| self.topics_covered.clone()),
            notes: edit.notes.or_else(|| self.notes.clone()),
            productivity: edit.productivity.or(self.productivity),
        };
        *self = Self::new(self.id, self.user_id, draft)?;
        Ok(())
    }

    /// Return a copy of this session under a storage-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: StudySessionId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn id(&self) -> StudySessionId {
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
    pub fn exam_id(&self) -> Option<ExamId> {
        self.exam_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    #[must_use]
    pub fn topics_covered(&self) -> &[String] {
        &self.topics_covered
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    #[must_use]
    pub fn productivity(&self) -> Option<u8> {
        self.productivity
    }

    /// Session length in whole minutes, rounded up.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        let secs = (self.ended_at - self.started_at).num_seconds().max(0);
        let minutes = secs / 60 + i64::from(secs % 60 != 0);
        u32::try_from(minutes).unwrap_or(u32::MAX)
    }
}
