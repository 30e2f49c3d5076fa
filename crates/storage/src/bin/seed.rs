use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use study_core::model::{
    Exam, ExamDraft, ExamId, ExamType, StudySession, StudySessionDraft, StudySessionId, Subject,
    SubjectDraft, SubjectId, SubjectPriority, TopicDraft, UserId,
};
use storage::repository::{NewExamRecord, NewSubjectRecord, Storage};

/// Populate a database with sample subjects, exams and study sessions.
#[derive(Debug, Parser)]
#[command(name = "seed")]
struct Args {
    /// SQLite URL.
    #[arg(long = "db", env = "STUDY_DB_URL", default_value = "sqlite:dev.sqlite3")]
    db_url: String,

    /// Owner of the seeded data.
    #[arg(long, env = "STUDY_USER_ID", default_value_t = 1)]
    user_id: u64,

    /// Number of past study sessions to append.
    #[arg(long, env = "STUDY_SEED_SESSIONS", default_value_t = 3)]
    sessions: u32,

    /// Fixed current time (RFC3339) for deterministic seeding.
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

const SAMPLE_SUBJECTS: [(&str, SubjectPriority, u8, &[(&str, bool)]); 3] = [
    (
        "Linear Algebra",
        SubjectPriority::High,
        4,
        &[
            ("Vector spaces", true),
            ("Linear maps", false),
            ("Eigenvalues", false),
            ("Inner products", false),
        ],
    ),
    (
        "Organic Chemistry",
        SubjectPriority::Medium,
        5,
        &[
            ("Alkanes", true),
            ("Stereochemistry", true),
            ("Reaction mechanisms", false),
        ],
    ),
    ("World History", SubjectPriority::Low, 2, &[]),
];

fn sample_subjects(user_id: UserId, now: DateTime<Utc>) -> Result<Vec<Subject>, study_core::Error> {
    let mut subjects = Vec::with_capacity(SAMPLE_SUBJECTS.len());
    for (name, priority, difficulty, topics) in SAMPLE_SUBJECTS {
        let mut draft = SubjectDraft::new(name);
        draft.priority = priority;
        draft.difficulty = difficulty;
        draft.syllabus = topics
            .iter()
            .map(|(topic, done)| {
                let t = TopicDraft::new(*topic);
                if *done { t.completed() } else { t }
            })
            .collect();
        subjects.push(Subject::new(SubjectId::new(0), user_id, draft, now)?);
    }
    Ok(subjects)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);
    let user_id = UserId::new(args.user_id);

    let mut subject_ids = Vec::new();
    for subject in sample_subjects(user_id, now)? {
        let id = storage
            .subjects
            .insert_new_subject(NewSubjectRecord::from_subject(&subject))
            .await?;
        subject_ids.push(id);
    }

    let mut exams = 0_u32;
    for (offset, subject_id) in (1_i64..).zip(subject_ids.iter().take(2)) {
        let mut draft = ExamDraft::new(
            Some(*subject_id),
            format!("Midterm {offset}"),
            now + Duration::days(offset * 4),
        );
        draft.exam_type = ExamType::Midterm;
        let exam = Exam::new(ExamId::new(0), user_id, draft).map_err(study_core::Error::from)?;
        storage
            .exams
            .insert_new_exam(NewExamRecord::from_exam(&exam))
            .await?;
        exams += 1;
    }

    for i in 0..args.sessions {
        let Some(subject_id) = subject_ids.get(i as usize % subject_ids.len().max(1)) else {
            break;
        };
        let started_at = now - Duration::days(i64::from(i) + 1);
        let mut draft =
            StudySessionDraft::new(Some(*subject_id), started_at, started_at + Duration::minutes(45));
        draft.productivity = Some(7);
        let session = StudySession::new(StudySessionId::new(0), user_id, draft)
            .map_err(study_core::Error::from)?;
        storage.study_sessions.append_session(&session).await?;
    }

    println!(
        "Seeded {} subjects, {} exams and {} study sessions for user {} into {}",
        subject_ids.len(),
        exams,
        args.sessions,
        user_id.value(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
