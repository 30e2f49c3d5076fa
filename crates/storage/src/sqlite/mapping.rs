use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::model::{
    Exam, ExamId, ExamType, PreparationStatus, StudySession, StudySessionDraft, StudySessionId,
    Subject, SubjectId, SubjectPriority, Topic, TopicId, UserId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn subject_id_from_i64(v: i64) -> Result<SubjectId, StorageError> {
    Ok(SubjectId::new(i64_to_u64("subject_id", v)?))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    Ok(ExamId::new(i64_to_u64("exam_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<StudySessionId, StorageError> {
    Ok(StudySessionId::new(i64_to_u64("study_session_id", v)?))
}

fn topic_id_from_i64(v: i64) -> Result<TopicId, StorageError> {
    Ok(TopicId::new(i64_to_u64("topic_id", v)?))
}

//
// ─── SUBJECTS ──────────────────────────────────────────────────────────────────
//

pub(crate) fn map_topic_row(row: &SqliteRow) -> Result<(SubjectId, Topic), StorageError> {
    let subject_id = subject_id_from_i64(row.try_get::<i64, _>("subject_id").map_err(ser)?)?;
    let topic = Topic::from_persisted(
        topic_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<i64, _>("completed").map_err(ser)? != 0,
        u8_from_i64("confidence", row.try_get::<i64, _>("confidence").map_err(ser)?)?,
        row.try_get::<String, _>("notes").map_err(ser)?,
        row.try_get::<Option<DateTime<Utc>>, _>("last_studied")
            .map_err(ser)?,
    )
    .map_err(ser)?;
    Ok((subject_id, topic))
}

/// Build a subject from its row plus the already-mapped syllabus.
pub(crate) fn map_subject_row(row: &SqliteRow, syllabus: Vec<Topic>) -> Result<Subject, StorageError> {
    let priority: SubjectPriority = row
        .try_get::<String, _>("priority")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    // Out-of-range values are dropped to `None` by the domain constructor.
    let difficulty = row
        .try_get::<Option<i64>, _>("difficulty")
        .map_err(ser)?
        .and_then(|d| u8::try_from(d).ok());

    Subject::from_persisted(
        subject_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        difficulty,
        priority,
        Some(row.try_get::<String, _>("color").map_err(ser)?),
        syllabus,
        u32_from_i64(
            "total_study_minutes",
            row.try_get::<i64, _>("total_study_minutes").map_err(ser)?,
        )?,
        row.try_get::<i64, _>("is_active").map_err(ser)? != 0,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

//
// ─── EXAMS ─────────────────────────────────────────────────────────────────────
//

pub(crate) fn map_exam_row(row: &SqliteRow) -> Result<Exam, StorageError> {
    let exam_type: ExamType = row
        .try_get::<String, _>("exam_type")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let status: PreparationStatus = row
        .try_get::<String, _>("preparation_status")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;

    Exam::from_persisted(
        exam_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get::<Option<i64>, _>("subject_id")
            .map_err(ser)?
            .map(subject_id_from_i64)
            .transpose()?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get("exam_date").map_err(ser)?,
        u32_from_i64(
            "duration_minutes",
            row.try_get::<i64, _>("duration_minutes").map_err(ser)?,
        )?,
        u32_from_i64("total_marks", row.try_get::<i64, _>("total_marks").map_err(ser)?)?,
        u8_from_i64("weightage", row.try_get::<i64, _>("weightage").map_err(ser)?)?,
        exam_type,
        status,
        u8_from_i64(
            "study_progress",
            row.try_get::<i64, _>("study_progress").map_err(ser)?,
        )?,
        row.try_get::<i64, _>("is_passed").map_err(ser)? != 0,
    )
    .map_err(ser)
}

//
// ─── STUDY SESSIONS ────────────────────────────────────────────────────────────
//

/// Topics covered are stored as a JSON array of strings.
pub(crate) fn topics_to_json(topics: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(topics).map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<StudySession, StorageError> {
    let topics_raw: String = row.try_get("topics_covered").map_err(ser)?;
    let topics_covered: Vec<String> = serde_json::from_str(&topics_raw).map_err(ser)?;

    let mut draft = StudySessionDraft::new(
        row.try_get::<Option<i64>, _>("subject_id")
            .map_err(ser)?
            .map(subject_id_from_i64)
            .transpose()?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("ended_at").map_err(ser)?,
    );
    draft.exam_id = row
        .try_get::<Option<i64>, _>("exam_id")
        .map_err(ser)?
        .map(exam_id_from_i64)
        .transpose()?;
    draft.topics_covered = topics_covered;
    draft.notes = row.try_get("notes").map_err(ser)?;
    draft.productivity = row
        .try_get::<Option<i64>, _>("productivity")
        .map_err(ser)?
        .map(|p| u8_from_i64("productivity", p))
        .transpose()?;

    StudySession::new(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        draft,
    )
    .map_err(ser)
}
