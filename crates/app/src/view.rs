use chrono::{DateTime, Utc};
use serde::Serialize;
use study_core::model::{
    Exam, ExamId, PreparationStatus, StudySession, StudySessionId, Subject, SubjectId,
    SubjectPriority,
};

/// JSON shape of a subject in CLI output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectView {
    pub id: SubjectId,
    pub name: String,
    pub priority: SubjectPriority,
    pub difficulty: Option<u8>,
    pub total_topics: usize,
    pub completed_topics: usize,
    pub completion_percentage: u8,
    pub total_study_minutes: u32,
    pub is_active: bool,
}

impl From<&Subject> for SubjectView {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id(),
            name: subject.name().to_owned(),
            priority: subject.priority(),
            difficulty: subject.difficulty(),
            total_topics: subject.total_topics(),
            completed_topics: subject.completed_topics(),
            completion_percentage: subject.completion_percentage(),
            total_study_minutes: subject.total_study_minutes(),
            is_active: subject.is_active(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamView {
    pub id: ExamId,
    pub subject_id: Option<SubjectId>,
    pub title: String,
    pub exam_date: DateTime<Utc>,
    pub days_until: i64,
    pub preparation_status: PreparationStatus,
    pub study_progress: u8,
}

impl ExamView {
    pub fn new(exam: &Exam, now: DateTime<Utc>) -> Self {
        Self {
            id: exam.id(),
            subject_id: exam.subject_id(),
            title: exam.title().to_owned(),
            exam_date: exam.exam_date(),
            days_until: exam.days_until(now),
            preparation_status: exam.preparation_status(),
            study_progress: exam.study_progress(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: StudySessionId,
    pub subject_id: Option<SubjectId>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub topics_covered: Vec<String>,
    pub productivity: Option<u8>,
}

impl From<&StudySession> for SessionView {
    fn from(session: &StudySession) -> Self {
        Self {
            id: session.id(),
            subject_id: session.subject_id(),
            started_at: session.started_at(),
            ended_at: session.ended_at(),
            duration_minutes: session.duration_minutes(),
            topics_covered: session.topics_covered().to_vec(),
            productivity: session.productivity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use study_core::model::{ExamDraft, SubjectDraft, TopicDraft, UserId};
    use study_core::time::fixed_now;

    #[test]
    fn subject_view_uses_camel_case() {
        let mut draft = SubjectDraft::new("Chemistry");
        draft.syllabus = vec![TopicDraft::new("Bonds")];
        let subject = Subject::new(SubjectId::new(4), UserId::new(1), draft, fixed_now()).unwrap();

        let json = serde_json::to_value(SubjectView::from(&subject)).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["totalTopics"], 1);
        assert_eq!(json["completionPercentage"], 0);
        assert_eq!(json["isActive"], true);
    }

    #[test]
    fn exam_view_counts_days() {
        let exam = Exam::new(
            ExamId::new(2),
            UserId::new(1),
            ExamDraft::new(None, "Finals", fixed_now() + Duration::days(3)),
        )
        .unwrap();

        let json = serde_json::to_value(ExamView::new(&exam, fixed_now())).unwrap();
        assert_eq!(json["daysUntil"], 3);
        assert_eq!(json["preparationStatus"], "not-started");
        assert!(json["subjectId"].is_null());
    }
}
