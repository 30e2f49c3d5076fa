use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::exam_service::ExamService;
use crate::schedule_service::ScheduleService;
use crate::study_session_service::StudySessionService;
use crate::subject_service::SubjectService;

/// Assembles app-facing services over one storage backend and clock.
#[derive(Clone)]
pub struct AppServices {
    schedule: Arc<ScheduleService>,
    subjects: Arc<SubjectService>,
    exams: Arc<ExamService>,
    study_sessions: Arc<StudySessionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over an already constructed storage aggregate.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let schedule = Arc::new(ScheduleService::new(
            clock,
            Arc::clone(&storage.subjects),
            Arc::clone(&storage.exams),
        ));
        let subjects = Arc::new(SubjectService::new(clock, Arc::clone(&storage.subjects)));
        let exams = Arc::new(ExamService::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.subjects),
        ));
        let study_sessions = Arc::new(StudySessionService::new(
            clock,
            Arc::clone(&storage.study_sessions),
            Arc::clone(&storage.subjects),
        ));

        Self {
            schedule,
            subjects,
            exams,
            study_sessions,
        }
    }

    #[must_use]
    pub fn schedule(&self) -> Arc<ScheduleService> {
        Arc::clone(&self.schedule)
    }

    #[must_use]
    pub fn subjects(&self) -> Arc<SubjectService> {
        Arc::clone(&self.subjects)
    }

    #[must_use]
    pub fn exams(&self) -> Arc<ExamService> {
        Arc::clone(&self.exams)
    }

    #[must_use]
    pub fn study_sessions(&self) -> Arc<StudySessionService> {
        Arc::clone(&self.study_sessions)
    }
}
