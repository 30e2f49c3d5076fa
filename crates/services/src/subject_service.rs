use std::sync::Arc;

use storage::repository::{NewSubjectRecord, SubjectFilter, SubjectRepository};
use study_core::model::{
    Subject, SubjectDraft, SubjectEdit, SubjectId, SubjectStats, TopicId, TopicUpdate, UserId,
};
use tracing::info;

use crate::Clock;
use crate::error::SubjectServiceError;

/// Orchestrates subject creation, syllabus progress and per-user stats.
#[derive(Clone)]
pub struct SubjectService {
    clock: Clock,
    subjects: Arc<dyn SubjectRepository>,
}

impl SubjectService {
    #[must_use]
    pub fn new(clock: Clock, subjects: Arc<dyn SubjectRepository>) -> Self {
        Self { clock, subjects }
    }

    /// Validate and persist a new active subject.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Subject` for validation failures.
    /// Returns `SubjectServiceError::Storage` if persistence fails.
    pub async fn create_subject(
        &self,
        user_id: UserId,
        draft: SubjectDraft,
    ) -> Result<Subject, SubjectServiceError> {
        let subject = Subject::new(SubjectId::new(0), user_id, draft, self.clock.now())?;
        let record = NewSubjectRecord::from_subject(&subject);
        let id = self.subjects.insert_new_subject(record.clone()).await?;
        info!(subject_id = %id, user_id = %user_id, "subject created");
        Ok(record.into_subject(id)?)
    }

    /// Fetch a subject owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::NotFound` if it does not exist,
    /// `SubjectServiceError::Forbidden` if another user owns it.
    pub async fn get_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<Subject, SubjectServiceError> {
        let subject = self
            .subjects
            .get_subject(subject_id)
            .await?
            .ok_or(SubjectServiceError::NotFound(subject_id))?;
        if subject.user_id() != user_id {
            return Err(SubjectServiceError::Forbidden(subject_id));
        }
        Ok(subject)
    }

    /// List a user's subjects, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn list_subjects(
        &self,
        user_id: UserId,
        filter: SubjectFilter,
    ) -> Result<Vec<Subject>, SubjectServiceError> {
        Ok(self.subjects.list_subjects(user_id, filter).await?)
    }

    /// Mark progress on one syllabus topic.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError` if the subject is missing or foreign, the
    /// topic does not exist, the confidence is out of range, or storage fails.
    pub async fn update_topic(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        topic_id: TopicId,
        update: TopicUpdate,
    ) -> Result<Subject, SubjectServiceError> {
        let mut subject = self.get_subject(user_id, subject_id).await?;
        subject.update_topic(topic_id, update, self.clock.now())?;
        self.subjects.upsert_subject(&subject).await?;
        Ok(subject)
    }

    /// Pause or resume a subject. Paused subjects are left out of plans.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError` if the subject is missing or foreign, or
    /// storage fails.
    pub async fn set_active(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        active: bool,
    ) -> Result<Subject, SubjectServiceError> {
        let mut subject = self.get_subject(user_id, subject_id).await?;
        subject.set_active(active);
        self.subjects.upsert_subject(&subject).await?;
        Ok(subject)
    }

    /// Change a subject's details. Omitted fields stay as they are.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError` if the subject is missing or foreign, the
    /// edit is invalid, or storage fails.
    pub async fn update_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        edit: SubjectEdit,
    ) -> Result<Subject, SubjectServiceError> {
        let mut subject = self.get_subject(user_id, subject_id).await?;
        subject.apply_edit(edit)?;
        self.subjects.upsert_subject(&subject).await?;
        info!(subject_id = %subject_id, "subject updated");
        Ok(subject)
    }

    /// Remove a subject and its syllabus.
    ///
    /// Exams and sessions linked to it are left in place; plans treat such
    /// exams as unlinked.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError` if the subject is missing or foreign, or
    /// storage fails.
    pub async fn delete_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<(), SubjectServiceError> {
        self.get_subject(user_id, subject_id).await?;
        self.subjects.delete_subject(subject_id).await?;
        info!(subject_id = %subject_id, user_id = %user_id, "subject deleted");
        Ok(())
    }

    /// Aggregate stats over the user's active subjects.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn subject_stats(&self, user_id: UserId) -> Result<SubjectStats, SubjectServiceError> {
        let subjects = self.subjects.find_active_subjects(user_id).await?;
        Ok(SubjectStats::from_subjects(&subjects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;
    use study_core::model::{SubjectError, SubjectPriority, TopicDraft};
    use study_core::time::fixed_clock;

    fn service() -> SubjectService {
        SubjectService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    fn draft(name: &str) -> SubjectDraft {
        let mut draft = SubjectDraft::new(name);
        draft.priority = SubjectPriority::High;
        draft.difficulty = 4;
        draft.syllabus = vec![TopicDraft::new("Sets"), TopicDraft::new("Logic")];
        draft
    }

    #[tokio::test]
    async fn create_then_get() {
        let svc = service();
        let created = svc.create_subject(UserId::new(1), draft("Maths")).await.unwrap();
        assert_eq!(created.total_topics(), 2);
        assert!(created.is_active());

        let fetched = svc.get_subject(UserId::new(1), created.id()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn other_users_subject_is_forbidden() {
        let svc = service();
        let created = svc.create_subject(UserId::new(1), draft("Maths")).await.unwrap();
        let err = svc.get_subject(UserId::new(2), created.id()).await.unwrap_err();
        assert!(matches!(err, SubjectServiceError::Forbidden(id) if id == created.id()));

        let err = svc
            .get_subject(UserId::new(1), SubjectId::new(77))
            .await
            .unwrap_err();
        assert!(matches!(err, SubjectServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected() {
        let svc = service();
        let mut bad = draft("Maths");
        bad.difficulty = 9;
        let err = svc.create_subject(UserId::new(1), bad).await.unwrap_err();
        assert!(matches!(
            err,
            SubjectServiceError::Subject(SubjectError::InvalidDifficulty(9))
        ));
    }

    #[tokio::test]
    async fn topic_progress_updates_completion() {
        let svc = service();
        let created = svc.create_subject(UserId::new(1), draft("Maths")).await.unwrap();
        let updated = svc
            .update_topic(
                UserId::new(1),
                created.id(),
                TopicId::new(1),
                TopicUpdate {
                    completed: Some(true),
                    confidence: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.completion_percentage(), 50);
        assert!(updated.syllabus()[0].last_studied().is_some());

        let err = svc
            .update_topic(
                UserId::new(1),
                created.id(),
                TopicId::new(9),
                TopicUpdate::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubjectServiceError::Subject(SubjectError::TopicNotFound(_))
        ));
    }

    #[tokio::test]
    async fn stats_ignore_paused_subjects() {
        let svc = service();
        let user = UserId::new(1);
        svc.create_subject(user, draft("Maths")).await.unwrap();
        let paused = svc.create_subject(user, draft("Music")).await.unwrap();
        svc.set_active(user, paused.id(), false).await.unwrap();

        let stats = svc.subject_stats(user).await.unwrap();
        assert_eq!(stats.total_subjects, 1);
        assert_eq!(stats.subjects_by_priority.high, 1);
        assert_eq!(stats.subjects_by_difficulty[&4], 1);

        let listed = svc
            .list_subjects(
                user,
                SubjectFilter {
                    priority: None,
                    is_active: Some(false),
                },
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name(), "Music");
    }

    #[tokio::test]
    async fn update_changes_details_but_not_progress() {
        let svc = service();
        let user = UserId::new(1);
        let created = svc.create_subject(user, draft("Maths")).await.unwrap();

        let updated = svc
            .update_subject(
                user,
                created.id(),
                SubjectEdit {
                    name: Some("Pure Maths".into()),
                    priority: Some(SubjectPriority::Low),
                    color: Some("#00ff00".into()),
                    ..SubjectEdit::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name(), "Pure Maths");
        assert_eq!(updated.priority(), SubjectPriority::Low);
        assert_eq!(updated.difficulty(), Some(4));
        assert_eq!(updated.total_topics(), 2);
        assert_eq!(svc.get_subject(user, created.id()).await.unwrap(), updated);

        let err = svc
            .update_subject(
                UserId::new(2),
                created.id(),
                SubjectEdit {
                    name: Some("Stolen".into()),
                    ..SubjectEdit::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SubjectServiceError::Forbidden(_)));

        let err = svc
            .update_subject(
                user,
                created.id(),
                SubjectEdit {
                    difficulty: Some(0),
                    ..SubjectEdit::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubjectServiceError::Subject(SubjectError::InvalidDifficulty(0))
        ));
    }

    #[tokio::test]
    async fn delete_is_owner_only() {
        let svc = service();
        let user = UserId::new(1);
        let created = svc.create_subject(user, draft("Maths")).await.unwrap();

        let err = svc.delete_subject(UserId::new(2), created.id()).await.unwrap_err();
        assert!(matches!(err, SubjectServiceError::Forbidden(_)));

        svc.delete_subject(user, created.id()).await.unwrap();
        let err = svc.get_subject(user, created.id()).await.unwrap_err();
        assert!(matches!(err, SubjectServiceError::NotFound(_)));
        let err = svc.delete_subject(user, created.id()).await.unwrap_err();
        assert!(matches!(err, SubjectServiceError::NotFound(_)));
    }
}
