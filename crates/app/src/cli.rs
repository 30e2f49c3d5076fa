use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use services::DEFAULT_UPCOMING_DAYS;
use study_core::model::{AnalyticsPeriod, ExamId, StudySessionId, SubjectId, UserId};

/// Top-level parser for the `app` binary.
#[derive(Debug, Parser)]
#[command(name = "app", version, about = "Study planner: schedules, exams and study time")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// `SQLite` database URL or path
    #[arg(long = "db", global = true, env = "STUDY_DB_URL", default_value = "sqlite://study.sqlite3")]
    pub db_url: String,

    /// User whose data is read and written
    #[arg(long, global = true, env = "STUDY_USER_ID", default_value_t = UserId::new(1))]
    pub user_id: UserId,

    /// Pin the clock to an RFC 3339 timestamp
    #[arg(long, global = true)]
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print a study schedule as JSON
    Schedule {
        /// Weeks to plan; missing or blank plans one week
        #[arg(long)]
        weeks: Option<String>,
    },
    /// List subjects, highest priority first
    Subjects {
        /// List paused subjects instead of active ones
        #[arg(long)]
        paused: bool,
    },
    /// Aggregate stats over active subjects
    SubjectStats,
    /// Exams dated within the next `--days` days
    Exams {
        #[arg(long, default_value_t = DEFAULT_UPCOMING_DAYS)]
        days: u32,
    },
    /// Aggregate exam stats
    ExamStats,
    /// Remove a subject and its syllabus; linked exams and sessions stay
    DeleteSubject { subject_id: SubjectId },
    DeleteExam { exam_id: ExamId },
    DeleteSession { session_id: StudySessionId },
    /// Record a block of study time ending now
    LogSession {
        #[arg(long)]
        subject_id: Option<SubjectId>,
        #[arg(long)]
        minutes: u32,
        /// Self-rated productivity, 1-10
        #[arg(long)]
        productivity: Option<u8>,
        /// Topic covered; repeat for several
        #[arg(long = "topic")]
        topics: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Most recent study sessions, newest first
    Sessions {
        #[arg(long)]
        subject_id: Option<SubjectId>,
    },
    /// Summarize logged study time
    Analytics {
        /// week, month or all
        #[arg(long, default_value = "week")]
        period: AnalyticsPeriod,
    },
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn globals_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "app",
            "schedule",
            "--weeks",
            "3",
            "--user-id",
            "7",
            "--now",
            "2023-11-14T22:13:20Z",
        ])
        .unwrap();

        assert_eq!(cli.user_id, UserId::new(7));
        assert_eq!(cli.now.unwrap().timestamp(), 1_700_000_000);
        assert!(matches!(cli.command, Command::Schedule { weeks: Some(ref w) } if w == "3"));
    }

    #[test]
    fn schedule_weeks_stays_raw_text() {
        let cli = Cli::try_parse_from(["app", "schedule", "--weeks", "soon"]).unwrap();
        assert!(matches!(cli.command, Command::Schedule { weeks: Some(ref w) } if w == "soon"));

        let cli = Cli::try_parse_from(["app", "schedule"]).unwrap();
        assert!(matches!(cli.command, Command::Schedule { weeks: None }));
    }

    #[test]
    fn log_session_collects_topics() {
        let cli = Cli::try_parse_from([
            "app",
            "log-session",
            "--subject-id",
            "2",
            "--minutes",
            "45",
            "--topic",
            "Limits",
            "--topic",
            "Series",
        ])
        .unwrap();
        match cli.command {
            Command::LogSession {
                subject_id,
                minutes,
                topics,
                ..
            } => {
                assert_eq!(subject_id, Some(SubjectId::new(2)));
                assert_eq!(minutes, 45);
                assert_eq!(topics, vec!["Limits", "Series"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unknown_period_is_rejected() {
        assert!(Cli::try_parse_from(["app", "analytics", "--period", "decade"]).is_err());
    }

    #[test]
    fn delete_commands_take_positional_ids() {
        let cli = Cli::try_parse_from(["app", "delete-subject", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::DeleteSubject { subject_id } if subject_id == SubjectId::new(4)
        ));
        let cli = Cli::try_parse_from(["app", "delete-session", "9"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::DeleteSession { session_id } if session_id == StudySessionId::new(9)
        ));
        assert!(Cli::try_parse_from(["app", "delete-exam", "x"]).is_err());
    }
}
