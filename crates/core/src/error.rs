use thiserror::Error;

use crate::model::{ExamError, StudySessionError, SubjectError, TopicError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    StudySession(#[from] StudySessionError),
}
