use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use study_core::model::{
    Exam, ExamId, PreparationStatus, StudySession, StudySessionId, Subject, SubjectId,
    SubjectPriority, Topic, UserId,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS AND FILTERS ───────────────────────────────────────────────────────
//

/// Persisted shape for a subject that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewSubjectRecord {
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub difficulty: Option<u8>,
    pub priority: SubjectPriority,
    pub color: String,
    pub syllabus: Vec<Topic>,
    pub total_study_minutes: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl NewSubjectRecord {
    #[must_use]
    pub fn from_subject(subject: &Subject) -> Self {
        Self {
            user_id: subject.user_id(),
            name: subject.name().to_owned(),
            description: subject.description().map(ToOwned::to_owned),
            difficulty: subject.difficulty(),
            priority: subject.priority(),
            color: subject.color().to_owned(),
            syllabus: subject.syllabus().to_vec(),
            total_study_minutes: subject.total_study_minutes(),
            is_active: subject.is_active(),
            created_at: subject.created_at(),
        }
    }

    /// Materialize the record under a storage-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the record no longer validates.
    pub fn into_subject(self, id: SubjectId) -> Result<Subject, StorageError> {
        Subject::from_persisted(
            id,
            self.user_id,
            self.name,
            self.description,
            self.difficulty,
            self.priority,
            Some(self.color),
            self.syllabus,
            self.total_study_minutes,
            self.is_active,
            self.created_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Persisted shape for an exam that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewExamRecord {
    exam: Exam,
}

impl NewExamRecord {
    #[must_use]
    pub fn from_exam(exam: &Exam) -> Self {
        Self { exam: exam.clone() }
    }

    #[must_use]
    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    /// Materialize the record under a storage-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the record no longer validates.
    pub fn into_exam(self, id: ExamId) -> Result<Exam, StorageError> {
        let e = self.exam;
        Exam::from_persisted(
            id,
            e.user_id(),
            e.subject_id(),
            e.title(),
            e.exam_date(),
            e.duration_minutes(),
            e.total_marks(),
            e.weightage(),
            e.exam_type(),
            e.preparation_status(),
            e.study_progress(),
            e.is_passed(),
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Optional narrowing for subject listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubjectFilter {
    pub priority: Option<SubjectPriority>,
    pub is_active: Option<bool>,
}

impl SubjectFilter {
    #[must_use]
    pub fn matches(&self, subject: &Subject) -> bool {
        self.priority.is_none_or(|p| subject.priority() == p)
            && self.is_active.is_none_or(|a| subject.is_active() == a)
    }
}

/// Optional narrowing for exam listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExamFilter {
    pub subject_id: Option<SubjectId>,
    pub preparation_status: Option<PreparationStatus>,
    /// Keep only exams dated at or after `now`.
    pub upcoming: bool,
}

impl ExamFilter {
    #[must_use]
    pub fn matches(&self, exam: &Exam, now: DateTime<Utc>) -> bool {
        self.subject_id.is_none_or(|id| exam.subject_id() == Some(id))
            && self
                .preparation_status
                .is_none_or(|status| exam.preparation_status() == status)
            && (!self.upcoming || exam.exam_date() >= now)
    }
}

/// Optional narrowing for study session listings.
///
/// `from`/`until` bound `started_at` inclusively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub subject_id: Option<SubjectId>,
    pub exam_id: Option<ExamId>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl SessionFilter {
    #[must_use]
    pub fn matches(&self, session: &StudySession) -> bool {
        self.subject_id.is_none_or(|id| session.subject_id() == Some(id))
            && self.exam_id.is_none_or(|id| session.exam_id() == Some(id))
            && self.from.is_none_or(|from| session.started_at() >= from)
            && self.until.is_none_or(|until| session.started_at() <= until)
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for subjects and their syllabus.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Persist a new subject and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn insert_new_subject(&self, subject: NewSubjectRecord)
    -> Result<SubjectId, StorageError>;

    /// Persist or update a subject, replacing its syllabus.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Fetch a subject by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError>;

    /// Active subjects of a user in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn find_active_subjects(&self, user_id: UserId) -> Result<Vec<Subject>, StorageError>;

    /// Remove a subject and its syllabus. Exams and sessions that point at it
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such subject exists.
    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError>;

    /// Subjects of a user, highest priority first, newest first within a tier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_subjects(
        &self,
        user_id: UserId,
        filter: SubjectFilter,
    ) -> Result<Vec<Subject>, StorageError>;
}

/// Repository contract for exams.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Persist a new exam and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn insert_new_exam(&self, exam: NewExamRecord) -> Result<ExamId, StorageError>;

    /// Persist or update an exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError>;

    /// Fetch an exam by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such exam exists.
    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError>;

    /// Up to `limit` not-completed exams of a user, earliest date first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn find_pending_exams(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Exam>, StorageError>;

    /// All exams of a user, earliest date first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_exams(&self, user_id: UserId) -> Result<Vec<Exam>, StorageError>;
}

/// Repository contract for logged study sessions.
#[async_trait]
pub trait StudySessionRepository: Send + Sync {
    /// Append a session; the id carried by `session` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn append_session(&self, session: &StudySession)
    -> Result<StudySessionId, StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_session(&self, id: StudySessionId) -> Result<Option<StudySession>, StorageError>;

    /// Overwrite a stored session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no session carries its id.
    async fn update_session(&self, session: &StudySession) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such session exists.
    async fn delete_session(&self, id: StudySessionId) -> Result<(), StorageError>;

    /// Sessions of a user matching `filter`, newest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_sessions(
        &self,
        user_id: UserId,
        filter: SessionFilter,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Ids are handed out from per-table counters and never reused after a delete.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    subjects: Arc<Mutex<HashMap<SubjectId, Subject>>>,
    exams: Arc<Mutex<HashMap<ExamId, Exam>>>,
    sessions: Arc<Mutex<Vec<StudySession>>>,
    last_subject_id: Arc<AtomicU64>,
    last_exam_id: Arc<AtomicU64>,
    last_session_id: Arc<AtomicU64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn insert_new_subject(
        &self,
        subject: NewSubjectRecord,
    ) -> Result<SubjectId, StorageError> {
        let mut guard = lock(&self.subjects)?;
        let id = SubjectId::new(next_id(&self.last_subject_id));
        guard.insert(id, subject.into_subject(id)?);
        Ok(id)
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut guard = lock(&self.subjects)?;
        guard.insert(subject.id(), subject.clone());
        Ok(())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let guard = lock(&self.subjects)?;
        Ok(guard.get(&id).cloned())
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let mut guard = lock(&self.subjects)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }

    async fn find_active_subjects(&self, user_id: UserId) -> Result<Vec<Subject>, StorageError> {
        let guard = lock(&self.subjects)?;
        let mut found: Vec<Subject> = guard
            .values()
            .filter(|s| s.user_id() == user_id && s.is_active())
            .cloned()
            .collect();
        found.sort_by_key(Subject::id);
        Ok(found)
    }

    async fn list_subjects(
        &self,
        user_id: UserId,
        filter: SubjectFilter,
    ) -> Result<Vec<Subject>, StorageError> {
        let guard = lock(&self.subjects)?;
        let mut found: Vec<Subject> = guard
            .values()
            .filter(|s| s.user_id() == user_id && filter.matches(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.priority()
                .weight()
                .cmp(&a.priority().weight())
                .then(b.created_at().cmp(&a.created_at()))
                .then(b.id().cmp(&a.id()))
        });
        Ok(found)
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn insert_new_exam(&self, exam: NewExamRecord) -> Result<ExamId, StorageError> {
        let mut guard = lock(&self.exams)?;
        let id = ExamId::new(next_id(&self.last_exam_id));
        guard.insert(id, exam.into_exam(id)?);
        Ok(id)
    }

    async fn upsert_exam(&self, exam: &Exam) -> Result<(), StorageError> {
        let mut guard = lock(&self.exams)?;
        guard.insert(exam.id(), exam.clone());
        Ok(())
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        let guard = lock(&self.exams)?;
        Ok(guard.get(&id).cloned())
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let mut guard = lock(&self.exams)?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }

    async fn find_pending_exams(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> Result<Vec<Exam>, StorageError> {
        let mut found = self.list_exams(user_id).await?;
        found.retain(Exam::is_pending);
        found.truncate(limit);
        Ok(found)
    }

    async fn list_exams(&self, user_id: UserId) -> Result<Vec<Exam>, StorageError> {
        let guard = lock(&self.exams)?;
        let mut found: Vec<Exam> = guard
            .values()
            .filter(|e| e.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|e| (e.exam_date(), e.id()));
        Ok(found)
    }
}

#[async_trait]
impl StudySessionRepository for InMemoryRepository {
    async fn append_session(
        &self,
        session: &StudySession,
    ) -> Result<StudySessionId, StorageError> {
        let mut guard = lock(&self.sessions)?;
        let id = StudySessionId::new(next_id(&self.last_session_id));
        guard.push(session.clone().with_id(id));
        Ok(id)
    }

    async fn get_session(&self, id: StudySessionId) -> Result<Option<StudySession>, StorageError> {
        let guard = lock(&self.sessions)?;
        Ok(guard.iter().find(|s| s.id() == id).cloned())
    }

    async fn update_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let mut guard = lock(&self.sessions)?;
        let slot = guard
            .iter_mut()
            .find(|s| s.id() == session.id())
            .ok_or(StorageError::NotFound)?;
        *slot = session.clone();
        Ok(())
    }

    async fn delete_session(&self, id: StudySessionId) -> Result<(), StorageError> {
        let mut guard = lock(&self.sessions)?;
        let before = guard.len();
        guard.retain(|s| s.id() != id);
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        filter: SessionFilter,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError> {
        let guard = lock(&self.sessions)?;
        let mut found: Vec<StudySession> = guard
            .iter()
            .filter(|s| s.user_id() == user_id && filter.matches(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.started_at()
                .cmp(&a.started_at())
                .then(b.id().cmp(&a.id()))
        });
        found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(found)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub subjects: Arc<dyn SubjectRepository>,
    pub exams: Arc<dyn ExamRepository>,
    pub study_sessions: Arc<dyn StudySessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let subjects: Arc<dyn SubjectRepository> = Arc::new(repo.clone());
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let study_sessions: Arc<dyn StudySessionRepository> = Arc::new(repo);
        Self {
            subjects,
            exams,
            study_sessions,
        }
    }
}
