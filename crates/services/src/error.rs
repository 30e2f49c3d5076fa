//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{
    ExamError, ExamId, StudySessionError, StudySessionId, SubjectError, SubjectId,
};

/// Errors emitted by `ScheduleService`.
///
/// Only data-store failures reach the caller; empty input and out-of-range
/// windows produce an empty plan instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SubjectService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubjectServiceError {
    #[error("subject {0} not found")]
    NotFound(SubjectId),
    #[error("subject {0} belongs to another user")]
    Forbidden(SubjectId),
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ExamService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServiceError {
    #[error("exam {0} not found")]
    NotFound(ExamId),
    #[error("exam {0} belongs to another user")]
    Forbidden(ExamId),
    #[error("subject {0} not found")]
    SubjectNotFound(SubjectId),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StudySessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudySessionServiceError {
    /// Missing, or logged by another user.
    #[error("study session {0} not found")]
    NotFound(StudySessionId),
    #[error(transparent)]
    Session(#[from] StudySessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
