#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod exam_service;
pub mod schedule_service;
pub mod study_session_service;
pub mod subject_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, ExamServiceError, ScheduleError, StudySessionServiceError,
    SubjectServiceError,
};
pub use exam_service::{DEFAULT_UPCOMING_DAYS, ExamService};
pub use schedule_service::ScheduleService;
pub use study_session_service::{MAX_LISTED_SESSIONS, StudySessionService};
pub use subject_service::SubjectService;
