use chrono::{Datelike, Days, NaiveDate, Weekday};

use super::priority::PrioritizedSubject;
use super::schedule::ScheduleEntry;

/// Minutes every study block starts from before the priority bonus.
pub const BASE_SESSION_MINUTES: u32 = 50;

/// Extra minutes per point of priority weight (low 1, medium 3, high 5).
pub const MINUTES_PER_PRIORITY_POINT: u32 = 10;

/// Topics carried into a single day's entry.
pub const TOPICS_PER_ENTRY: usize = 2;

const DAYS_PER_WEEK: u32 = 7;

//
// ─── PLANNING WINDOW ───────────────────────────────────────────────────────────
//

/// Validated planning window length in weeks.
///
/// Zero means "nothing to plan". Requests above [`WeeksAhead::MAX_WEEKS`]
/// are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeeksAhead(u32);

impl WeeksAhead {
    pub const DEFAULT: Self = Self(1);
    pub const NONE: Self = Self(0);
    pub const MAX_WEEKS: u32 = 52;

    /// Normalize a requested week count. Non-positive values plan nothing.
    #[must_use]
    pub fn from_requested(requested: i64) -> Self {
        if requested <= 0 {
            return Self::NONE;
        }
        let capped = requested.min(i64::from(Self::MAX_WEEKS));
        Self(u32::try_from(capped).unwrap_or(Self::MAX_WEEKS))
    }

    /// Interpret a raw query value.
    ///
    /// Missing or blank input gets the default of one week. Otherwise the
    /// leading integer counts (`"1.5"` is one week, `"2weeks"` two); text
    /// without one plans nothing rather than failing.
    #[must_use]
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::DEFAULT,
            Some(value) => leading_integer(value).map_or(Self::NONE, Self::from_requested),
        }
    }

    /// True when `requested` would be clamped by [`WeeksAhead::from_requested`].
    #[must_use]
    pub fn exceeds_max(requested: i64) -> bool {
        requested > i64::from(Self::MAX_WEEKS)
    }

    #[must_use]
    pub fn weeks(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn days(self) -> u32 {
        self.0 * DAYS_PER_WEEK
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl Default for WeeksAhead {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Optional sign followed by the digits that start `raw`, ignoring
/// whatever follows them. Digit runs too long for `i64` saturate.
#[must_use]
pub fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return None;
    }
    let value = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -value } else { value })
}

//
// ─── ALLOCATION ────────────────────────────────────────────────────────────────
//

/// Saturday and Sunday are rest days.
#[must_use]
pub fn is_study_day(weekday: Weekday) -> bool {
    !matches!(weekday, Weekday::Sat | Weekday::Sun)
}

#[must_use]
pub fn session_minutes(priority_num: u32) -> u32 {
    BASE_SESSION_MINUTES.saturating_add(priority_num.saturating_mul(MINUTES_PER_PRIORITY_POINT))
}

/// `round(duration / max(1, total_topics))`, halves rounded up.
///
/// Not clamped to 100; long sessions on tiny syllabi can exceed it.
#[must_use]
pub fn completion_boost(duration_minutes: u32, total_topics: usize) -> u32 {
    let topics = u64::try_from(total_topics.max(1)).unwrap_or(u64::MAX);
    let duration = u64::from(duration_minutes);
    let rounded = (2 * duration).saturating_add(topics) / topics.saturating_mul(2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Assign one ranked subject to each study day in the window starting at `today`.
///
/// Weekend days are skipped without consuming a rotation slot, so the subject
/// sequence across emitted entries is a strict round-robin over `ranked`.
#[must_use]
pub fn allocate(
    ranked: &[PrioritizedSubject<'_>],
    today: NaiveDate,
    weeks: WeeksAhead,
) -> Vec<ScheduleEntry> {
    if ranked.is_empty() || weeks.is_empty() {
        return Vec::new();
    }

    let mut entries = Vec::new();
    let mut rotation = 0_usize;

    for offset in 0..u64::from(weeks.days()) {
        let Some(day) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        if !is_study_day(day.weekday()) {
            continue;
        }

        entries.push(ScheduleEntry::for_day(day, &ranked[rotation % ranked.len()]));
        rotation += 1;
    }

    entries
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Subject, SubjectDraft, SubjectId, SubjectPriority, TopicDraft, UserId};
    use crate::planner::rank_subjects;
    use crate::time::fixed_now;

    fn subject(id: u64, difficulty: u8, priority: SubjectPriority, topics: usize) -> Subject {
        let mut draft = SubjectDraft::new(format!("S{id}"));
        draft.difficulty = difficulty;
        draft.priority = priority;
        draft.syllabus = (1..=topics).map(|i| TopicDraft::new(format!("T{i}"))).collect();
        Subject::new(SubjectId::new(id), UserId::new(1), draft, fixed_now()).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, 13).unwrap()
    }

    #[test]
    fn weeks_ahead_normalization() {
        assert_eq!(WeeksAhead::from_requested(0), WeeksAhead::NONE);
        assert_eq!(WeeksAhead::from_requested(-4), WeeksAhead::NONE);
        assert_eq!(WeeksAhead::from_requested(3).weeks(), 3);
        assert_eq!(WeeksAhead::from_requested(500).weeks(), WeeksAhead::MAX_WEEKS);
        assert!(WeeksAhead::exceeds_max(53));
        assert!(!WeeksAhead::exceeds_max(52));
        assert_eq!(WeeksAhead::from_requested(2).days(), 14);
    }

    #[test]
    fn weeks_ahead_lenient_parsing() {
        assert_eq!(WeeksAhead::parse_lenient(None), WeeksAhead::DEFAULT);
        assert_eq!(WeeksAhead::parse_lenient(Some("  ")), WeeksAhead::DEFAULT);
        assert_eq!(WeeksAhead::parse_lenient(Some(" 4 ")).weeks(), 4);
        assert_eq!(WeeksAhead::parse_lenient(Some("abc")), WeeksAhead::NONE);
        assert_eq!(WeeksAhead::parse_lenient(Some("1.5")).weeks(), 1);
        assert_eq!(WeeksAhead::parse_lenient(Some("2weeks")).weeks(), 2);
        assert_eq!(WeeksAhead::parse_lenient(Some("+3")).weeks(), 3);
        assert_eq!(WeeksAhead::parse_lenient(Some(".5")), WeeksAhead::NONE);
        assert_eq!(WeeksAhead::parse_lenient(Some("-1")), WeeksAhead::NONE);
        assert_eq!(WeeksAhead::parse_lenient(Some("99999999999999999999")).weeks(), 52);
        assert_eq!(WeeksAhead::default(), WeeksAhead::DEFAULT);
    }

    #[test]
    fn leading_integer_stops_at_first_non_digit() {
        assert_eq!(leading_integer("12abc"), Some(12));
        assert_eq!(leading_integer(" -7.9"), Some(-7));
        assert_eq!(leading_integer("-"), None);
        assert_eq!(leading_integer("x1"), None);
    }

    #[test]
    fn weekends_are_rest_days() {
        assert!(is_study_day(Weekday::Mon));
        assert!(is_study_day(Weekday::Fri));
        assert!(!is_study_day(Weekday::Sat));
        assert!(!is_study_day(Weekday::Sun));
    }

    #[test]
    fn durations_follow_priority_weight() {
        assert_eq!(session_minutes(SubjectPriority::Low.weight()), 60);
        assert_eq!(session_minutes(SubjectPriority::Medium.weight()), 80);
        assert_eq!(session_minutes(SubjectPriority::High.weight()), 100);
    }

    #[test]
    fn boost_rounds_and_is_not_clamped() {
        assert_eq!(completion_boost(80, 0), 80);
        assert_eq!(completion_boost(80, 1), 80);
        assert_eq!(completion_boost(100, 3), 33);
        assert_eq!(completion_boost(100, 6), 17);
        assert_eq!(completion_boost(60, 8), 8);
        assert_eq!(completion_boost(100, 1), 100);
        assert_eq!(completion_boost(60, 200), 0);
    }

    #[test]
    fn one_week_from_any_weekday_yields_five_entries() {
        let subjects = vec![subject(1, 3, SubjectPriority::Medium, 2)];
        let ranked = rank_subjects(&subjects, &[], fixed_now());
        for offset in 0..7 {
            let start = monday() + Days::new(offset);
            let entries = allocate(&ranked, start, WeeksAhead::DEFAULT);
            assert_eq!(entries.len(), 5, "starting {start}");
            assert!(entries.iter().all(|e| is_study_day(e.day.weekday())));
            assert!(entries.windows(2).all(|w| w[0].day < w[1].day));
            assert!(entries.iter().all(|e| e.day >= start));
            assert!(entries.iter().all(|e| e.day < start + Days::new(7)));
        }
    }

    #[test]
    fn rotation_is_round_robin_across_weekends() {
        let subjects = vec![
            subject(1, 1, SubjectPriority::Low, 1),
            subject(2, 5, SubjectPriority::High, 1),
            subject(3, 3, SubjectPriority::Medium, 1),
        ];
        let ranked = rank_subjects(&subjects, &[], fixed_now());
        let entries = allocate(&ranked, monday(), WeeksAhead::from_requested(2));

        assert_eq!(entries.len(), 10);
        let ids: Vec<u64> = entries.iter().map(|e| e.subject_id.value()).collect();
        assert_eq!(ids, vec![2, 3, 1, 2, 3, 1, 2, 3, 1, 2]);
    }

    #[test]
    fn entries_carry_at_most_two_topics() {
        let subjects = vec![subject(1, 3, SubjectPriority::Medium, 5)];
        let ranked = rank_subjects(&subjects, &[], fixed_now());
        assert_eq!(ranked[0].topics().len(), 3);

        let entries = allocate(&ranked, monday(), WeeksAhead::DEFAULT);
        assert!(entries.iter().all(|e| e.topics == vec!["T1", "T2"]));
    }

    #[test]
    fn nothing_to_allocate() {
        let subjects = vec![subject(1, 3, SubjectPriority::Medium, 1)];
        let ranked = rank_subjects(&subjects, &[], fixed_now());
        assert!(allocate(&ranked, monday(), WeeksAhead::NONE).is_empty());
        assert!(allocate(&[], monday(), WeeksAhead::DEFAULT).is_empty());
    }
}
