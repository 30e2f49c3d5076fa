use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Newest schema version this build knows how to create.
pub const SCHEMA_VERSION: i64 = 1;

/// Highest applied migration, or 0 on a fresh database.
pub async fn applied_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

/// Runs the versioned schema migrations.
///
/// Version 1 creates subjects with their topics, exams, study sessions and
/// the indexes the planner queries rely on.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    let before = applied_version(pool).await?;
    if before > SCHEMA_VERSION {
        return Err(SqliteInitError::UnknownSchema {
            found: before,
            supported: SCHEMA_VERSION,
        });
    }

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS subjects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT,
                    difficulty INTEGER CHECK (difficulty BETWEEN 1 AND 5),
                    priority TEXT NOT NULL,
                    color TEXT NOT NULL,
                    total_study_minutes INTEGER NOT NULL DEFAULT 0 CHECK (total_study_minutes >= 0),
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS topics (
                    subject_id INTEGER NOT NULL,
                    id INTEGER NOT NULL,
                    position INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    completed INTEGER NOT NULL DEFAULT 0,
                    confidence INTEGER NOT NULL CHECK (confidence BETWEEN 1 AND 10),
                    notes TEXT NOT NULL DEFAULT '',
                    last_studied TEXT,
                    PRIMARY KEY (subject_id, id),
                    FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS exams (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    subject_id INTEGER,
                    title TEXT NOT NULL,
                    exam_date TEXT NOT NULL,
                    duration_minutes INTEGER NOT NULL CHECK (duration_minutes >= 0),
                    total_marks INTEGER NOT NULL CHECK (total_marks >= 0),
                    weightage INTEGER NOT NULL CHECK (weightage BETWEEN 0 AND 100),
                    exam_type TEXT NOT NULL,
                    preparation_status TEXT NOT NULL,
                    study_progress INTEGER NOT NULL CHECK (study_progress BETWEEN 0 AND 100),
                    is_passed INTEGER NOT NULL DEFAULT 0
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS study_sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    subject_id INTEGER,
                    exam_id INTEGER,
                    started_at TEXT NOT NULL,
                    ended_at TEXT NOT NULL,
                    topics_covered TEXT NOT NULL,
                    notes TEXT,
                    productivity INTEGER CHECK (productivity BETWEEN 1 AND 10)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_subjects_user_active
                    ON subjects (user_id, is_active, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_exams_user_date
                    ON exams (user_id, exam_date, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_study_sessions_user_started
                    ON study_sessions (user_id, started_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
