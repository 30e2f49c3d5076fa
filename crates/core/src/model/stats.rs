use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::exam::{Exam, PreparationStatus};
use crate::model::ids::SubjectId;
use crate::model::study_session::StudySession;
use crate::model::subject::{Subject, SubjectPriority};

/// Rating assumed for sessions logged without a productivity score.
pub const DEFAULT_PRODUCTIVITY: u8 = 5;

/// Label used for sessions not tied to a known subject.
pub const GENERAL_SUBJECT_LABEL: &str = "General";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid analytics period: {0} (expected week, month or all)")]
pub struct ParsePeriodError(String);

//
// ─── SUBJECT STATS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

/// Aggregate over a user's subjects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub total_subjects: u32,
    pub average_completion: u32,
    pub total_study_minutes: u64,
    pub subjects_by_priority: PriorityCounts,
    /// Keyed by difficulty 1..=5; unknown difficulty is counted under the default.
    pub subjects_by_difficulty: BTreeMap<u8, u32>,
}

impl SubjectStats {
    #[must_use]
    pub fn from_subjects(subjects: &[Subject]) -> Self {
        let mut stats = Self {
            subjects_by_difficulty: (1..=5).map(|d| (d, 0)).collect(),
            ..Self::default()
        };
        let mut completion_sum = 0_u32;

        for subject in subjects {
            stats.total_subjects += 1;
            completion_sum += u32::from(subject.completion_percentage());
            stats.total_study_minutes += u64::from(subject.total_study_minutes());
            match subject.priority() {
                SubjectPriority::High => stats.subjects_by_priority.high += 1,
                SubjectPriority::Medium => stats.subjects_by_priority.medium += 1,
                SubjectPriority::Low => stats.subjects_by_priority.low += 1,
            }
            let difficulty = subject
                .difficulty()
                .unwrap_or(crate::model::subject::DEFAULT_DIFFICULTY);
            *stats.subjects_by_difficulty.entry(difficulty).or_insert(0) += 1;
        }

        if stats.total_subjects > 0 {
            // Half-up rounding of the mean.
            stats.average_completion =
                (2 * completion_sum + stats.total_subjects) / (2 * stats.total_subjects);
        }
        stats
    }
}

//
// ─── EXAM STATS ────────────────────────────────────────────────────────────────
//

/// Exam counts per preparation status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatusCounts {
    pub not_started: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub revision: u32,
}

/// Aggregate over all of a user's exams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamStats {
    pub total_exams: u32,
    pub upcoming_exams: u32,
    pub completed_exams: u32,
    pub exams_by_status: StatusCounts,
    /// Keyed by exam type name; only types that occur are present.
    pub exams_by_type: BTreeMap<String, u32>,
    pub average_preparation: u32,
}

impl ExamStats {
    /// Upcoming means dated at or after `now`. Completed means passed or
    /// already dated in the past, whatever the preparation status says.
    #[must_use]
    pub fn from_exams(exams: &[Exam], now: DateTime<Utc>) -> Self {
        let mut stats = Self::default();
        let mut progress_sum = 0_u32;

        for exam in exams {
            stats.total_exams += 1;
            if exam.exam_date() >= now {
                stats.upcoming_exams += 1;
            }
            if exam.is_passed() || exam.exam_date() < now {
                stats.completed_exams += 1;
            }
            let by_status = &mut stats.exams_by_status;
            match exam.preparation_status() {
                PreparationStatus::NotStarted => by_status.not_started += 1,
                PreparationStatus::InProgress => by_status.in_progress += 1,
                PreparationStatus::Completed => by_status.completed += 1,
                PreparationStatus::Revision => by_status.revision += 1,
            }
            *stats
                .exams_by_type
                .entry(exam.exam_type().as_str().to_owned())
                .or_insert(0) += 1;
            progress_sum += u32::from(exam.study_progress());
        }

        if stats.total_exams > 0 {
            stats.average_preparation =
                (2 * progress_sum + stats.total_exams) / (2 * stats.total_exams);
        }
        stats
    }
}

//
// ─── STUDY ANALYTICS ───────────────────────────────────────────────────────────
//

/// Look-back window for study analytics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnalyticsPeriod {
    #[default]
    Week,
    Month,
    All,
}

impl AnalyticsPeriod {
    /// Start of the window relative to `now`, or `None` for all time.
    #[must_use]
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            AnalyticsPeriod::Week => Some(now - Duration::days(7)),
            AnalyticsPeriod::Month => Some(now - Duration::days(30)),
            AnalyticsPeriod::All => None,
        }
    }
}

impl FromStr for AnalyticsPeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "all" => Ok(Self::All),
            other => Err(ParsePeriodError(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyAnalytics {
    pub total_sessions: u32,
    pub total_study_time_minutes: u64,
    pub avg_productivity: f64,
    pub sessions_by_subject: BTreeMap<String, u32>,
}

impl StudyAnalytics {
    /// Summarize sessions; `subject_names` resolves linked subjects to labels.
    #[must_use]
    pub fn from_sessions(
        sessions: &[StudySession],
        subject_names: &HashMap<SubjectId, String>,
    ) -> Self {
        let mut analytics = Self::default();
        let mut productivity_sum = 0_u32;

        for session in sessions {
            analytics.total_sessions += 1;
            analytics.total_study_time_minutes += u64::from(session.duration_minutes());
            productivity_sum += u32::from(session.productivity().unwrap_or(DEFAULT_PRODUCTIVITY));

            let label = session
                .subject_id()
                .and_then(|id| subject_names.get(&id))
                .map_or(GENERAL_SUBJECT_LABEL, String::as_str);
            *analytics
                .sessions_by_subject
                .entry(label.to_owned())
                .or_insert(0) += 1;
        }

        if analytics.total_sessions > 0 {
            analytics.avg_productivity =
                f64::from(productivity_sum) / f64::from(analytics.total_sessions);
        }
        analytics
    }
}
