use std::sync::Arc;

use storage::repository::{ExamRepository, SubjectRepository};
use study_core::model::UserId;
use study_core::planner::{
    ScheduleEntry, WeeksAhead, allocate, assemble, exam_lookahead, leading_integer, rank_subjects,
};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::error::ScheduleError;

/// Builds study plans from a user's stored subjects and exams.
#[derive(Clone)]
pub struct ScheduleService {
    clock: Clock,
    subjects: Arc<dyn SubjectRepository>,
    exams: Arc<dyn ExamRepository>,
}

impl ScheduleService {
    #[must_use]
    pub fn new(
        clock: Clock,
        subjects: Arc<dyn SubjectRepository>,
        exams: Arc<dyn ExamRepository>,
    ) -> Self {
        Self {
            clock,
            subjects,
            exams,
        }
    }

    /// Generate a plan covering `weeks_ahead` weeks starting today.
    ///
    /// Non-positive windows give an empty plan; windows above
    /// `WeeksAhead::MAX_WEEKS` are clamped.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::Storage` if subjects or exams cannot be read.
    #[tracing::instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub async fn generate_schedule(
        &self,
        user_id: UserId,
        weeks_ahead: i64,
    ) -> Result<Vec<ScheduleEntry>, ScheduleError> {
        if WeeksAhead::exceeds_max(weeks_ahead) {
            warn!(
                requested = weeks_ahead,
                max = WeeksAhead::MAX_WEEKS,
                "planning window clamped"
            );
        }
        self.plan(user_id, WeeksAhead::from_requested(weeks_ahead))
            .await
    }

    /// Generate a plan from a raw, possibly missing, week count.
    ///
    /// Missing or blank input plans one week; otherwise the leading integer
    /// counts, and text without one plans nothing.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::Storage` if subjects or exams cannot be read.
    #[tracing::instrument(skip(self, user_id), fields(user_id = %user_id))]
    pub async fn generate_schedule_from_query(
        &self,
        user_id: UserId,
        weeks_ahead: Option<&str>,
    ) -> Result<Vec<ScheduleEntry>, ScheduleError> {
        if let Some(requested) = weeks_ahead.and_then(leading_integer) {
            if WeeksAhead::exceeds_max(requested) {
                warn!(requested, max = WeeksAhead::MAX_WEEKS, "planning window clamped");
            }
        }
        self.plan(user_id, WeeksAhead::parse_lenient(weeks_ahead))
            .await
    }

    async fn plan(
        &self,
        user_id: UserId,
        weeks: WeeksAhead,
    ) -> Result<Vec<ScheduleEntry>, ScheduleError> {
        if weeks.is_empty() {
            debug!("empty planning window");
            return Ok(Vec::new());
        }

        let subjects = self.subjects.find_active_subjects(user_id).await?;
        if subjects.is_empty() {
            debug!("no active subjects");
            return Ok(Vec::new());
        }

        let exams = self
            .exams
            .find_pending_exams(user_id, exam_lookahead(subjects.len()))
            .await?;

        let ranked = rank_subjects(&subjects, &exams, self.clock.now());
        for p in &ranked {
            debug!(
                subject_id = %p.subject().id(),
                score = p.priority_score(),
                days_to_exam = p.days_to_exam(),
                "ranked subject"
            );
        }

        let entries = assemble(allocate(&ranked, self.clock.today(), weeks));
        info!(
            weeks = weeks.weeks(),
            subjects = ranked.len(),
            entries = entries.len(),
            "schedule generated"
        );
        Ok(entries)
    }
}
