#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ExamFilter, ExamRepository, InMemoryRepository, NewExamRecord, NewSubjectRecord,
    SessionFilter, Storage, StorageError, StudySessionRepository, SubjectFilter,
    SubjectRepository,
};
