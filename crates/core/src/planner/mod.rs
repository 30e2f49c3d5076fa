//! Study plan generation.
//!
//! The pipeline runs in four steps over a snapshot of a user's data:
//! [`rank_subjects`] scores every active subject, [`select_topics`] picks the
//! syllabus topics to surface, [`allocate`] walks the calendar window handing
//! one subject to each study day, and [`assemble`] returns the ordered plan.
//! Everything here is pure and synchronous; fetching the snapshot is the
//! caller's job.

mod priority;
mod rotation;
mod schedule;
mod topics;

pub use priority::{
    DEFAULT_EXAM_HORIZON_DAYS, EXAMS_PER_SUBJECT, PrioritizedSubject, days_to_exam,
    exam_lookahead, imminent_exams, priority_score, rank_subjects, study_time_factor,
};
pub use rotation::{
    BASE_SESSION_MINUTES, MINUTES_PER_PRIORITY_POINT, TOPICS_PER_ENTRY, WeeksAhead, allocate,
    completion_boost, is_study_day, leading_integer, session_minutes,
};
pub use schedule::{ScheduleEntry, assemble, build_schedule};
pub use topics::{MAX_CANDIDATE_TOPICS, select_topics};
