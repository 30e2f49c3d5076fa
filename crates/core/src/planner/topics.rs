use crate::model::Subject;

/// Upper bound on topics the selector hands to the allocator.
pub const MAX_CANDIDATE_TOPICS: usize = 3;

/// Pick the syllabus topics to surface for a subject.
///
/// Prefers the first unfinished topics in syllabus order. A fully completed
/// syllabus falls back to its first topics for revision, and an empty one to
/// a single generic `Review {name}` item. Never returns an empty list.
#[must_use]
pub fn select_topics(subject: &Subject) -> Vec<String> {
    let syllabus = subject.syllabus();

    let unfinished: Vec<String> = syllabus
        .iter()
        .filter(|t| !t.is_completed())
        .take(MAX_CANDIDATE_TOPICS)
        .map(|t| t.name().to_owned())
        .collect();
    if !unfinished.is_empty() {
        return unfinished;
    }

    if syllabus.is_empty() {
        return vec![format!("Review {}", subject.name())];
    }

    syllabus
        .iter()
        .take(MAX_CANDIDATE_TOPICS)
        .map(|t| t.name().to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SubjectDraft, SubjectId, TopicDraft, UserId};
    use crate::time::fixed_now;

    fn subject(name: &str, topics: &[(&str, bool)]) -> Subject {
        let mut draft = SubjectDraft::new(name);
        draft.syllabus = topics
            .iter()
            .map(|(n, done)| {
                let t = TopicDraft::new(*n);
                if *done { t.completed() } else { t }
            })
            .collect();
        Subject::new(SubjectId::new(1), UserId::new(1), draft, fixed_now()).unwrap()
    }

    #[test]
    fn picks_first_unfinished_in_order() {
        let s = subject(
            "Physics",
            &[
                ("Kinematics", true),
                ("Forces", false),
                ("Energy", true),
                ("Momentum", false),
                ("Waves", false),
                ("Optics", false),
            ],
        );
        assert_eq!(select_topics(&s), vec!["Forces", "Momentum", "Waves"]);
    }

    #[test]
    fn fewer_unfinished_than_cap() {
        let s = subject("Physics", &[("Kinematics", true), ("Forces", false)]);
        assert_eq!(select_topics(&s), vec!["Forces"]);
    }

    #[test]
    fn completed_syllabus_falls_back_to_revision() {
        let s = subject(
            "Chemistry",
            &[("T1", true), ("T2", true), ("T3", true), ("T4", true)],
        );
        assert_eq!(select_topics(&s), vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn two_completed_topics_are_both_revised() {
        let s = subject("Chemistry", &[("T1", true), ("T2", true)]);
        assert_eq!(select_topics(&s), vec!["T1", "T2"]);
    }

    #[test]
    fn empty_syllabus_gets_generic_review() {
        let s = subject("History", &[]);
        assert_eq!(select_topics(&s), vec!["Review History"]);
    }
}
