use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{ExamRepository, Storage, StudySessionRepository, SubjectRepository};

mod exam_repo;
mod mapping;
mod migrate;

pub use migrate::SCHEMA_VERSION;
mod study_session_repo;
mod subject_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("database schema version {found} is newer than supported version {supported}")]
    UnknownSchema { found: i64, supported: i64 },
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// enforcing foreign key constraints fails during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        tracing::debug!(url = database_url, "sqlite pool connected");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the schema up to [`SCHEMA_VERSION`].
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::UnknownSchema` when the file was written by a
    /// newer build, or `SqliteInitError::Sqlx` if a migration query fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await?;
        let version = self.schema_version().await?;
        tracing::info!(schema_version = version, "study database ready");
        Ok(())
    }

    /// Highest migration recorded in the database.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the bookkeeping table cannot be read.
    pub async fn schema_version(&self) -> Result<i64, SqliteInitError> {
        Ok(migrate::applied_version(&self.pool).await?)
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let subjects: Arc<dyn SubjectRepository> = Arc::new(repo.clone());
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let study_sessions: Arc<dyn StudySessionRepository> = Arc::new(repo);
        Ok(Self {
            subjects,
            exams,
            study_sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }
}
