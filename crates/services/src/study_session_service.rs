use std::collections::HashMap;
use std::sync::Arc;

use storage::repository::{
    SessionFilter, StudySessionRepository, SubjectFilter, SubjectRepository,
};
use study_core::model::{
    AnalyticsPeriod, StudyAnalytics, StudySession, StudySessionDraft, StudySessionEdit,
    StudySessionId, UserId,
};
use tracing::{debug, info};

use crate::Clock;
use crate::error::StudySessionServiceError;

/// Upper bound on sessions returned by `StudySessionService::list_sessions`.
pub const MAX_LISTED_SESSIONS: u32 = 50;

/// Logs study time and summarizes it.
#[derive(Clone)]
pub struct StudySessionService {
    clock: Clock,
    sessions: Arc<dyn StudySessionRepository>,
    subjects: Arc<dyn SubjectRepository>,
}

impl StudySessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn StudySessionRepository>,
        subjects: Arc<dyn SubjectRepository>,
    ) -> Self {
        Self {
            clock,
            sessions,
            subjects,
        }
    }

    /// Persist a study session.
    ///
    /// When the session is linked to one of the user's subjects, its length is
    /// added to that subject's accumulated study time.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::Session` for an invalid draft, or
    /// `StudySessionServiceError::Storage` if persistence fails.
    pub async fn log_session(
        &self,
        user_id: UserId,
        draft: StudySessionDraft,
    ) -> Result<StudySession, StudySessionServiceError> {
        let session = StudySession::new(StudySessionId::new(0), user_id, draft)?;
        let id = self.sessions.append_session(&session).await?;
        let session = session.with_id(id);

        if let Some(subject_id) = session.subject_id() {
            match self.subjects.get_subject(subject_id).await? {
                Some(mut subject) if subject.user_id() == user_id => {
                    subject.add_study_minutes(session.duration_minutes());
                    self.subjects.upsert_subject(&subject).await?;
                }
                _ => debug!(subject_id = %subject_id, "session subject not owned; study time not credited"),
            }
        }

        info!(
            session_id = %id,
            minutes = session.duration_minutes(),
            "study session logged"
        );
        Ok(session)
    }

    async fn owned_session(
        &self,
        user_id: UserId,
        session_id: StudySessionId,
    ) -> Result<StudySession, StudySessionServiceError> {
        self.sessions
            .get_session(session_id)
            .await?
            .filter(|s| s.user_id() == user_id)
            .ok_or(StudySessionServiceError::NotFound(session_id))
    }

    /// Change the end time, topics, notes or rating of a logged session.
    ///
    /// Subject study time credited at logging is not adjusted.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::NotFound` for a missing or foreign
    /// session, `StudySessionServiceError::Session` if the edited session is
    /// invalid, or `StudySessionServiceError::Storage` if persistence fails.
    pub async fn update_session(
        &self,
        user_id: UserId,
        session_id: StudySessionId,
        edit: StudySessionEdit,
    ) -> Result<StudySession, StudySessionServiceError> {
        let mut session = self.owned_session(user_id, session_id).await?;
        session.apply_edit(edit)?;
        self.sessions.update_session(&session).await?;
        info!(session_id = %session_id, "study session updated");
        Ok(session)
    }

    /// # Errors
    ///
    /// Returns `StudySessionServiceError::NotFound` for a missing or foreign
    /// session, or `StudySessionServiceError::Storage` if deletion fails.
    pub async fn delete_session(
        &self,
        user_id: UserId,
        session_id: StudySessionId,
    ) -> Result<(), StudySessionServiceError> {
        self.owned_session(user_id, session_id).await?;
        self.sessions.delete_session(session_id).await?;
        info!(session_id = %session_id, "study session deleted");
        Ok(())
    }

    /// Most recent sessions matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::Storage` if repository access fails.
    pub async fn list_sessions(
        &self,
        user_id: UserId,
        filter: SessionFilter,
    ) -> Result<Vec<StudySession>, StudySessionServiceError> {
        Ok(self
            .sessions
            .list_sessions(user_id, filter, MAX_LISTED_SESSIONS)
            .await?)
    }

    /// Summarize sessions started within `period`.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionServiceError::Storage` if repository access fails.
    pub async fn analytics(
        &self,
        user_id: UserId,
        period: AnalyticsPeriod,
    ) -> Result<StudyAnalytics, StudySessionServiceError> {
        let filter = SessionFilter {
            from: period.since(self.clock.now()),
            ..SessionFilter::default()
        };
        let sessions = self
            .sessions
            .list_sessions(user_id, filter, u32::MAX)
            .await?;

        let names: HashMap<_, _> = self
            .subjects
            .list_subjects(user_id, SubjectFilter::default())
            .await?
            .into_iter()
            .map(|s| (s.id(), s.name().to_owned()))
            .collect();

        Ok(StudyAnalytics::from_sessions(&sessions, &names))
    }
}
