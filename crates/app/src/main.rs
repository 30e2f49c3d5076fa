use std::path::{Path, PathBuf};

use chrono::Duration;
use clap::Parser;
use serde::Serialize;
use services::{AppServices, Clock};
use storage::repository::{SessionFilter, SubjectFilter};
use study_core::model::StudySessionDraft;
use tracing_subscriber::EnvFilter;

mod cli;
mod view;

use cli::{Cli, Command};
use view::{ExamView, SessionView, SubjectView};

#[derive(Debug)]
struct InvalidDbUrl(String);

impl std::fmt::Display for InvalidDbUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid --db value: {}", self.0)
    }
}

impl std::error::Error for InvalidDbUrl {}

/// Resolve bare paths and `sqlite:` URLs to absolute `sqlite://` URLs.
fn normalize_sqlite_url(raw: &str, cwd: &Path) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" {
        return trimmed.to_string();
    }

    let path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directories if missing.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| InvalidDbUrl(db_url.to_string()))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(InvalidDbUrl(db_url.to_string()).into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let db_url = normalize_sqlite_url(&cli.db_url, &cwd);
    prepare_sqlite_file(&db_url)?;

    let clock = cli.now.map_or_else(Clock::default_clock, Clock::fixed);
    let services = AppServices::new_sqlite(&db_url, clock).await?;
    let user_id = cli.user_id;
    tracing::debug!(db = %db_url, user_id = %user_id, fixed_clock = clock.is_fixed(), "app started");

    match cli.command {
        Command::Schedule { weeks } => {
            let plan = services
                .schedule()
                .generate_schedule_from_query(user_id, weeks.as_deref())
                .await?;
            print_json(&plan)?;
        }
        Command::Subjects { paused } => {
            let filter = SubjectFilter {
                priority: None,
                is_active: Some(!paused),
            };
            let subjects = services.subjects().list_subjects(user_id, filter).await?;
            let views: Vec<SubjectView> = subjects.iter().map(SubjectView::from).collect();
            print_json(&views)?;
        }
        Command::SubjectStats => {
            print_json(&services.subjects().subject_stats(user_id).await?)?;
        }
        Command::Exams { days } => {
            let exams = services.exams().upcoming_exams(user_id, days).await?;
            let now = clock.now();
            let views: Vec<ExamView> = exams.iter().map(|e| ExamView::new(e, now)).collect();
            print_json(&views)?;
        }
        Command::ExamStats => {
            print_json(&services.exams().exam_stats(user_id).await?)?;
        }
        Command::DeleteSubject { subject_id } => {
            services.subjects().delete_subject(user_id, subject_id).await?;
        }
        Command::DeleteExam { exam_id } => {
            services.exams().delete_exam(user_id, exam_id).await?;
        }
        Command::DeleteSession { session_id } => {
            services
                .study_sessions()
                .delete_session(user_id, session_id)
                .await?;
        }
        Command::LogSession {
            subject_id,
            minutes,
            productivity,
            topics,
            notes,
        } => {
            let ended_at = clock.now();
            let started_at = ended_at - Duration::minutes(i64::from(minutes));
            let mut draft = StudySessionDraft::new(subject_id, started_at, ended_at);
            draft.productivity = productivity;
            draft.topics_covered = topics;
            draft.notes = notes;
            let session = services.study_sessions().log_session(user_id, draft).await?;
            print_json(&SessionView::from(&session))?;
        }
        Command::Sessions { subject_id } => {
            let filter = SessionFilter {
                subject_id,
                ..SessionFilter::default()
            };
            let sessions = services.study_sessions().list_sessions(user_id, filter).await?;
            let views: Vec<SessionView> = sessions.iter().map(SessionView::from).collect();
            print_json(&views)?;
        }
        Command::Analytics { period } => {
            print_json(&services.study_sessions().analytics(user_id, period).await?)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "command failed");
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_relative_and_prefixed_paths() {
        let cwd = Path::new("/work");
        assert_eq!(normalize_sqlite_url("study.sqlite3", cwd), "sqlite:///work/study.sqlite3");
        assert_eq!(normalize_sqlite_url("sqlite:data/s.db", cwd), "sqlite:///work/data/s.db");
        assert_eq!(normalize_sqlite_url("/tmp/s.db", cwd), "sqlite:///tmp/s.db");
    }

    #[test]
    fn relative_urls_become_absolute() {
        let cwd = Path::new("/work");
        assert_eq!(normalize_sqlite_url("sqlite::memory:", cwd), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url(" sqlite://study.sqlite3 ", cwd),
            "sqlite:///work/study.sqlite3"
        );
        assert_eq!(normalize_sqlite_url("sqlite:///var/s.db", cwd), "sqlite:///var/s.db");
    }

    #[test]
    fn prepare_rejects_non_sqlite_urls() {
        assert!(prepare_sqlite_file("postgres://localhost/db").is_err());
        assert!(prepare_sqlite_file("sqlite://").is_err());
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
    }
}
