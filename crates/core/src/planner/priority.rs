use chrono::{DateTime, Utc};

use crate::model::{DEFAULT_DIFFICULTY, Exam, Subject};

use super::topics::select_topics;

/// Days assumed until the next exam when a subject has none linked.
pub const DEFAULT_EXAM_HORIZON_DAYS: f64 = 30.0;

/// How many of the most imminent exams are considered per active subject.
pub const EXAMS_PER_SUBJECT: usize = 2;

const MINUTES_PER_HOUR: f64 = 60.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A subject together with the values the planner derived for it.
///
/// Borrows the stored subject instead of copying or extending it.
#[derive(Debug, Clone, PartialEq)]
pub struct PrioritizedSubject<'a> {
    subject: &'a Subject,
    priority_score: f64,
    days_to_exam: f64,
    topics: Vec<String>,
    priority_num: u32,
}

impl<'a> PrioritizedSubject<'a> {
    #[must_use]
    pub fn subject(&self) -> &'a Subject {
        self.subject
    }

    #[must_use]
    pub fn priority_score(&self) -> f64 {
        self.priority_score
    }

    /// Fractional days to the nearest linked exam, never below 1.
    #[must_use]
    pub fn days_to_exam(&self) -> f64 {
        self.days_to_exam
    }

    /// Candidate topics from the topic selector.
    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    #[must_use]
    pub fn priority_num(&self) -> u32 {
        self.priority_num
    }
}

/// Number of pending exams to look at for `subject_count` subjects.
#[must_use]
pub fn exam_lookahead(subject_count: usize) -> usize {
    subject_count.saturating_mul(EXAMS_PER_SUBJECT)
}

/// Pending exams in ascending date order, truncated to `limit`.
///
/// The sort is stable, so exams on the same instant keep their input order.
#[must_use]
pub fn imminent_exams(exams: &[Exam], limit: usize) -> Vec<&Exam> {
    let mut pending: Vec<&Exam> = exams.iter().filter(|e| e.is_pending()).collect();
    pending.sort_by_key(|e| e.exam_date());
    pending.truncate(limit);
    pending
}

/// `max(1, days until exam)`, or the default horizon when there is no exam.
#[must_use]
pub fn days_to_exam(exam: Option<&Exam>, now: DateTime<Utc>) -> f64 {
    match exam {
        Some(exam) => {
            #[allow(clippy::cast_precision_loss)]
            let millis = (exam.exam_date() - now).num_milliseconds() as f64;
            (millis / MILLIS_PER_DAY).max(1.0)
        }
        None => DEFAULT_EXAM_HORIZON_DAYS,
    }
}

/// `1 / max(1, hours studied)`: full weight below one hour, then inverse to hours.
#[must_use]
pub fn study_time_factor(total_study_minutes: u32) -> f64 {
    1.0 / (f64::from(total_study_minutes) / MINUTES_PER_HOUR).max(1.0)
}

/// Multiplicative urgency score.
///
/// Any single low-urgency factor (distant exam, finished syllabus, lots of
/// time already invested) pulls the whole score towards zero.
#[must_use]
pub fn priority_score(
    days_to_exam: f64,
    completion_percentage: u8,
    difficulty: u8,
    total_study_minutes: u32,
) -> f64 {
    let completion_fraction = f64::from(completion_percentage) / 100.0;
    (1.0 / days_to_exam)
        * (1.0 - completion_fraction)
        * f64::from(difficulty)
        * study_time_factor(total_study_minutes)
}

/// Score the active subjects and order them by descending priority.
///
/// Inactive subjects are skipped. Each subject is matched against the first
/// linked exam among the `2 × subject count` most imminent pending exams.
/// Ties keep input order.
#[must_use]
pub fn rank_subjects<'a>(
    subjects: &'a [Subject],
    exams: &[Exam],
    now: DateTime<Utc>,
) -> Vec<PrioritizedSubject<'a>> {
    let active: Vec<&Subject> = subjects.iter().filter(|s| s.is_active()).collect();
    if active.is_empty() {
        return Vec::new();
    }

    let candidates = imminent_exams(exams, exam_lookahead(active.len()));

    let mut ranked: Vec<PrioritizedSubject<'a>> = active
        .into_iter()
        .map(|subject| {
            let nearest = candidates
                .iter()
                .copied()
                .find(|e| e.subject_id() == Some(subject.id()));
            let days = days_to_exam(nearest, now);
            let difficulty = subject.difficulty().unwrap_or(DEFAULT_DIFFICULTY);

            PrioritizedSubject {
                subject,
                priority_score: priority_score(
                    days,
                    subject.completion_percentage(),
                    difficulty,
                    subject.total_study_minutes(),
                ),
                days_to_exam: days,
                topics: select_topics(subject),
                priority_num: subject.priority().weight(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    ranked
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ExamDraft, ExamId, PreparationStatus, SubjectDraft, SubjectId, SubjectPriority,
        TopicDraft, UserId,
    };
    use crate::time::fixed_now;
    use chrono::Duration;

    const EPS: f64 = 1e-9;

    fn subject(id: u64, done: usize, total: usize, difficulty: u8, minutes: u32) -> Subject {
        let mut draft = SubjectDraft::new(format!("Subject {id}"));
        draft.difficulty = difficulty;
        draft.priority = SubjectPriority::Medium;
        draft.syllabus = (0..total)
            .map(|i| {
                let t = TopicDraft::new(format!("T{i}"));
                if i < done { t.completed() } else { t }
            })
            .collect();
        let mut s = Subject::new(SubjectId::new(id), UserId::new(1), draft, fixed_now()).unwrap();
        s.add_study_minutes(minutes);
        s
    }

    fn exam(id: u64, subject: u64, in_days: f64) -> Exam {
        #[allow(clippy::cast_possible_truncation)]
        let offset = Duration::milliseconds((in_days * MILLIS_PER_DAY) as i64);
        Exam::new(
            ExamId::new(id),
            UserId::new(1),
            ExamDraft::new(Some(SubjectId::new(subject)), "Exam", fixed_now() + offset),
        )
        .unwrap()
    }

    #[test]
    fn worked_example_ranks_urgent_subject_first() {
        // A: 0% done, difficulty 5, no study time, exam in 2 days.
        let a = subject(1, 0, 4, 5, 0);
        // B: 80% done, difficulty 2, 300 minutes, no linked exam.
        let b = subject(2, 4, 5, 2, 300);
        let subjects = vec![b, a];
        let exams = vec![exam(1, 1, 2.0)];

        let ranked = rank_subjects(&subjects, &exams, fixed_now());
        assert_eq!(ranked.len(), 2);

        assert_eq!(ranked[0].subject().id(), SubjectId::new(1));
        assert!((ranked[0].days_to_exam() - 2.0).abs() < EPS);
        assert!((ranked[0].priority_score() - 2.5).abs() < EPS);

        assert_eq!(ranked[1].subject().id(), SubjectId::new(2));
        assert!((ranked[1].days_to_exam() - 30.0).abs() < EPS);
        let expected_b = (1.0 / 30.0) * 0.2 * 2.0 * 0.2;
        assert!((ranked[1].priority_score() - expected_b).abs() < EPS);
        assert!((ranked[1].priority_score() - 0.002_667).abs() < 1e-6);
    }

    #[test]
    fn nearer_exam_strictly_increases_score() {
        let far = priority_score(10.0, 20, 3, 0);
        let near = priority_score(5.0, 20, 3, 0);
        let nearest = priority_score(1.0, 20, 3, 0);
        assert!(near > far);
        assert!(nearest > near);
    }

    #[test]
    fn higher_completion_strictly_decreases_score() {
        let scores: Vec<f64> = [0_u8, 25, 50, 75, 99]
            .iter()
            .map(|pct| priority_score(7.0, *pct, 3, 0))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
        assert!(priority_score(7.0, 100, 3, 0).abs() < EPS);
    }

    #[test]
    fn study_time_reduces_score_after_first_hour() {
        assert!((study_time_factor(0) - 1.0).abs() < EPS);
        assert!((study_time_factor(59) - 1.0).abs() < EPS);
        assert!((study_time_factor(60) - 1.0).abs() < EPS);
        assert!((study_time_factor(120) - 0.5).abs() < EPS);
        assert!((study_time_factor(300) - 0.2).abs() < EPS);

        let a = priority_score(3.0, 0, 3, 90);
        let b = priority_score(3.0, 0, 3, 180);
        assert!(a > b);
    }

    #[test]
    fn same_day_and_past_exams_floor_at_one_day() {
        let now = fixed_now();
        let past = exam(1, 1, -3.0);
        let soon = exam(2, 1, 0.25);
        assert!((days_to_exam(Some(&past), now) - 1.0).abs() < EPS);
        assert!((days_to_exam(Some(&soon), now) - 1.0).abs() < EPS);
        assert!((days_to_exam(None, now) - DEFAULT_EXAM_HORIZON_DAYS).abs() < EPS);
    }

    #[test]
    fn fractional_days_are_kept() {
        let e = exam(1, 1, 2.5);
        assert!((days_to_exam(Some(&e), fixed_now()) - 2.5).abs() < 1e-6);
    }

    #[test]
    fn completed_exams_are_not_urgency_signals() {
        let s = subject(1, 0, 2, 3, 0);
        let mut done = exam(1, 1, 1.0);
        done.set_preparation(PreparationStatus::Completed, None).unwrap();

        let subjects = vec![s];
        let ranked = rank_subjects(&subjects, &[done], fixed_now());
        assert!((ranked[0].days_to_exam() - DEFAULT_EXAM_HORIZON_DAYS).abs() < EPS);
    }

    #[test]
    fn nearest_linked_exam_wins() {
        let subjects = vec![subject(1, 0, 2, 3, 0)];
        let exams = vec![exam(1, 1, 9.0), exam(2, 1, 4.0)];
        let ranked = rank_subjects(&subjects, &exams, fixed_now());
        assert!((ranked[0].days_to_exam() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn exam_lookahead_is_capped_at_twice_subject_count() {
        // One subject -> only the two most imminent exams are considered.
        let subjects = vec![subject(1, 0, 2, 3, 0)];
        let exams = vec![exam(1, 99, 1.0), exam(2, 98, 2.0), exam(3, 1, 3.0)];
        let ranked = rank_subjects(&subjects, &exams, fixed_now());
        assert!((ranked[0].days_to_exam() - DEFAULT_EXAM_HORIZON_DAYS).abs() < EPS);

        assert_eq!(imminent_exams(&exams, exam_lookahead(1)).len(), 2);
        assert_eq!(imminent_exams(&exams, exam_lookahead(2)).len(), 3);
    }

    #[test]
    fn exam_for_unknown_subject_is_ignored() {
        let subjects = vec![subject(1, 0, 2, 3, 0)];
        let exams = vec![exam(1, 404, 1.0)];
        let ranked = rank_subjects(&subjects, &exams, fixed_now());
        assert!((ranked[0].days_to_exam() - DEFAULT_EXAM_HORIZON_DAYS).abs() < EPS);
    }

    #[test]
    fn missing_difficulty_defaults_to_three() {
        let s = Subject::from_persisted(
            SubjectId::new(1),
            UserId::new(1),
            "Latin",
            None,
            None,
            SubjectPriority::Low,
            None,
            Vec::new(),
            0,
            true,
            fixed_now(),
        )
        .unwrap();
        let subjects = vec![s];
        let ranked = rank_subjects(&subjects, &[], fixed_now());
        let expected = (1.0 / 30.0) * 1.0 * 3.0 * 1.0;
        assert!((ranked[0].priority_score() - expected).abs() < EPS);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let subjects = vec![
            subject(3, 0, 2, 3, 0),
            subject(1, 0, 2, 3, 0),
            subject(2, 0, 2, 3, 0),
        ];
        let ranked = rank_subjects(&subjects, &[], fixed_now());
        let ids: Vec<u64> = ranked.iter().map(|p| p.subject().id().value()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn inactive_subjects_are_not_ranked() {
        let mut idle = subject(1, 0, 2, 5, 0);
        idle.set_active(false);
        let subjects = vec![idle, subject(2, 0, 2, 1, 0)];
        let ranked = rank_subjects(&subjects, &[], fixed_now());
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].subject().id(), SubjectId::new(2));
    }

    #[test]
    fn no_subjects_gives_empty_ranking() {
        assert!(rank_subjects(&[], &[exam(1, 1, 1.0)], fixed_now()).is_empty());
    }

    #[test]
    fn priority_num_follows_priority_tier() {
        let mut draft = SubjectDraft::new("Art");
        draft.priority = SubjectPriority::High;
        let subjects =
            vec![Subject::new(SubjectId::new(1), UserId::new(1), draft, fixed_now()).unwrap()];
        let ranked = rank_subjects(&subjects, &[], fixed_now());
        assert_eq!(ranked[0].priority_num(), 5);
    }
}
