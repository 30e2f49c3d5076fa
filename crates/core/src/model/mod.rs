mod exam;
mod ids;
mod stats;
mod study_session;
pub mod subject;

pub use exam::{
    DEFAULT_EXAM_MINUTES, DEFAULT_WEIGHTAGE, Exam, ExamDraft, ExamEdit, ExamError, ExamType,
    PreparationStatus,
};
pub use ids::{ExamId, ParseIdError, StudySessionId, SubjectId, TopicId, UserId};
pub use stats::{
    AnalyticsPeriod, DEFAULT_PRODUCTIVITY, ExamStats, GENERAL_SUBJECT_LABEL, ParsePeriodError,
    PriorityCounts, StatusCounts, StudyAnalytics, SubjectStats,
};
pub use study_session::{StudySession, StudySessionDraft, StudySessionEdit, StudySessionError};
pub use subject::{
    DEFAULT_DIFFICULTY, Subject, SubjectDraft, SubjectEdit, SubjectError, SubjectPriority, Topic,
    TopicDraft, TopicError, TopicUpdate,
};
