use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Exam, Subject, SubjectId};

use super::priority::{PrioritizedSubject, rank_subjects};
use super::rotation::{TOPICS_PER_ENTRY, WeeksAhead, allocate, completion_boost, session_minutes};

/// One planned study block for a single calendar day.
///
/// Serializes with camelCase keys and the day as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub day: NaiveDate,
    /// Three-letter English abbreviation, e.g. `Mon`.
    pub day_of_week: String,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub duration_minutes: u32,
    pub topics: Vec<String>,
    pub estimated_completion_boost: u32,
}

impl ScheduleEntry {
    pub(crate) fn for_day(day: NaiveDate, pick: &PrioritizedSubject<'_>) -> Self {
        let subject = pick.subject();
        let duration_minutes = session_minutes(pick.priority_num());

        Self {
            day,
            day_of_week: day.weekday().to_string(),
            subject_id: subject.id(),
            subject_name: subject.name().to_owned(),
            duration_minutes,
            topics: pick.topics().iter().take(TOPICS_PER_ENTRY).cloned().collect(),
            estimated_completion_boost: completion_boost(duration_minutes, subject.total_topics()),
        }
    }
}

/// Final ordered plan from allocator output.
///
/// The allocator already emits entries in calendar order; this only enforces
/// that ordering so callers can rely on it.
#[must_use]
pub fn assemble(entries: Vec<ScheduleEntry>) -> Vec<ScheduleEntry> {
    let mut entries = entries;
    if !entries.windows(2).all(|w| w[0].day <= w[1].day) {
        entries.sort_by_key(|e| e.day);
    }
    entries
}

/// Run the whole pipeline over a snapshot of one user's subjects and exams.
///
/// `now` drives exam proximity; `today` is the first calendar day planned.
/// Returns an empty plan when there are no active subjects or the window is
/// empty.
#[must_use]
pub fn build_schedule(
    subjects: &[Subject],
    exams: &[Exam],
    now: DateTime<Utc>,
    today: NaiveDate,
    weeks: WeeksAhead,
) -> Vec<ScheduleEntry> {
    if weeks.is_empty() {
        return Vec::new();
    }
    let ranked = rank_subjects(subjects, exams, now);
    assemble(allocate(&ranked, today, weeks))
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ExamDraft, ExamId, SubjectDraft, SubjectPriority, TopicDraft, UserId,
    };
    use crate::planner::is_study_day;
    use crate::time::{fixed_clock, fixed_now};
    use chrono::Duration;
    use serde_json::json;

    fn subject(
        id: u64,
        name: &str,
        priority: SubjectPriority,
        difficulty: u8,
        topics: &[(&str, bool)],
    ) -> Subject {
        let mut draft = SubjectDraft::new(name);
        draft.priority = priority;
        draft.difficulty = difficulty;
        draft.syllabus = topics
            .iter()
            .map(|(n, done)| {
                let t = TopicDraft::new(*n);
                if *done { t.completed() } else { t }
            })
            .collect();
        Subject::new(SubjectId::new(id), UserId::new(1), draft, fixed_now()).unwrap()
    }

    fn today() -> NaiveDate {
        fixed_clock().today()
    }

    #[test]
    fn worked_example_first_week() {
        let a = subject(
            1,
            "Algebra",
            SubjectPriority::High,
            5,
            &[("Groups", false), ("Rings", false), ("Fields", false), ("Modules", false)],
        );
        let mut b = subject(
            2,
            "Biology",
            SubjectPriority::Medium,
            2,
            &[("C1", true), ("C2", true), ("C3", true), ("C4", true), ("C5", false)],
        );
        b.add_study_minutes(300);
        let exams = vec![
            Exam::new(
                ExamId::new(1),
                UserId::new(1),
                ExamDraft::new(Some(SubjectId::new(1)), "Algebra final", fixed_now() + Duration::days(2)),
            )
            .unwrap(),
        ];

        let plan = build_schedule(&[b, a], &exams, fixed_now(), today(), WeeksAhead::DEFAULT);

        // Tue 14 .. Mon 20 November 2023, weekend skipped.
        let days: Vec<&str> = plan.iter().map(|e| e.day_of_week.as_str()).collect();
        assert_eq!(days, vec!["Tue", "Wed", "Thu", "Fri", "Mon"]);
        let ids: Vec<u64> = plan.iter().map(|e| e.subject_id.value()).collect();
        assert_eq!(ids, vec![1, 2, 1, 2, 1]);

        assert_eq!(plan[0].duration_minutes, 100);
        assert_eq!(plan[0].topics, vec!["Groups", "Rings"]);
        assert_eq!(plan[0].estimated_completion_boost, 25);

        assert_eq!(plan[1].subject_name, "Biology");
        assert_eq!(plan[1].duration_minutes, 80);
        assert_eq!(plan[1].topics, vec!["C5"]);
        assert_eq!(plan[1].estimated_completion_boost, 16);

        assert_eq!(plan[4].day, NaiveDate::from_ymd_opt(2023, 11, 20).unwrap());
    }

    #[test]
    fn single_completed_subject_revisits_first_topics() {
        let s = subject(
            7,
            "Chemistry",
            SubjectPriority::Low,
            3,
            &[("T1", true), ("T2", true), ("T3", true), ("T4", true)],
        );
        let plan = build_schedule(&[s], &[], fixed_now(), today(), WeeksAhead::DEFAULT);

        assert_eq!(plan.len(), 5);
        for entry in &plan {
            assert_eq!(entry.subject_id, SubjectId::new(7));
            assert_eq!(entry.duration_minutes, 60);
            assert_eq!(entry.topics, vec!["T1", "T2"]);
            assert_eq!(entry.estimated_completion_boost, 15);
        }
    }

    #[test]
    fn empty_syllabus_gets_review_item() {
        let s = subject(3, "History", SubjectPriority::Medium, 3, &[]);
        let plan = build_schedule(&[s], &[], fixed_now(), today(), WeeksAhead::DEFAULT);
        assert_eq!(plan[0].topics, vec!["Review History"]);
        assert_eq!(plan[0].estimated_completion_boost, 80);
    }

    #[test]
    fn every_entry_is_a_weekday_in_window() {
        let subjects = vec![
            subject(1, "A", SubjectPriority::High, 4, &[("x", false)]),
            subject(2, "B", SubjectPriority::Low, 2, &[("y", false)]),
        ];
        let weeks = WeeksAhead::from_requested(4);
        let plan = build_schedule(&subjects, &[], fixed_now(), today(), weeks);

        assert_eq!(plan.len(), 20);
        let end = today() + chrono::Days::new(u64::from(weeks.days()));
        assert!(plan.iter().all(|e| is_study_day(e.day.weekday())));
        assert!(plan.iter().all(|e| e.day >= today() && e.day < end));
        assert!(plan.windows(2).all(|w| w[0].day < w[1].day));
        assert!(plan.iter().all(|e| e.topics.len() <= 2 && !e.topics.is_empty()));
        assert!(
            plan.iter()
                .all(|e| [60, 80, 100].contains(&e.duration_minutes))
        );
    }

    #[test]
    fn no_subjects_or_no_weeks_means_no_plan() {
        let s = subject(1, "A", SubjectPriority::High, 4, &[("x", false)]);
        assert!(build_schedule(&[], &[], fixed_now(), today(), WeeksAhead::DEFAULT).is_empty());
        assert!(
            build_schedule(&[s.clone()], &[], fixed_now(), today(), WeeksAhead::from_requested(0))
                .is_empty()
        );
        assert!(
            build_schedule(&[s], &[], fixed_now(), today(), WeeksAhead::from_requested(-2))
                .is_empty()
        );
    }

    #[test]
    fn same_inputs_same_plan() {
        let subjects = vec![
            subject(1, "A", SubjectPriority::High, 4, &[("x", false), ("y", true)]),
            subject(2, "B", SubjectPriority::Medium, 4, &[("z", false)]),
            subject(3, "C", SubjectPriority::Low, 4, &[("w", false)]),
        ];
        let weeks = WeeksAhead::from_requested(3);
        let first = build_schedule(&subjects, &[], fixed_now(), today(), weeks);
        let second = build_schedule(&subjects, &[], fixed_now(), today(), weeks);
        assert_eq!(first, second);
    }

    #[test]
    fn assemble_restores_calendar_order() {
        let s = subject(1, "A", SubjectPriority::High, 4, &[("x", false)]);
        let mut plan = build_schedule(&[s], &[], fixed_now(), today(), WeeksAhead::DEFAULT);
        plan.reverse();
        let ordered = assemble(plan);
        assert!(ordered.windows(2).all(|w| w[0].day < w[1].day));
    }

    #[test]
    fn entry_serializes_with_camel_case_keys() {
        let s = subject(9, "Geometry", SubjectPriority::Medium, 3, &[("Angles", false)]);
        let plan = build_schedule(&[s], &[], fixed_now(), today(), WeeksAhead::DEFAULT);
        let value = serde_json::to_value(&plan[0]).unwrap();
        assert_eq!(
            value,
            json!({
                "day": "2023-11-14",
                "dayOfWeek": "Tue",
                "subjectId": 9,
                "subjectName": "Geometry",
                "durationMinutes": 80,
                "topics": ["Angles"],
                "estimatedCompletionBoost": 80
            })
        );
    }
}
