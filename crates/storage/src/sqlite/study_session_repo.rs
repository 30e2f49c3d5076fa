use study_core::model::{StudySession, StudySessionId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_session_row, session_id_from_i64, topics_to_json};
use crate::repository::{SessionFilter, StorageError, StudySessionRepository};

const SESSION_COLUMNS: &str = "id, user_id, subject_id, exam_id, started_at, ended_at, \
     topics_covered, notes, productivity";

#[async_trait::async_trait]
impl StudySessionRepository for SqliteRepository {
    async fn append_session(
        &self,
        session: &StudySession,
    ) -> Result<StudySessionId, StorageError> {
        let subject_id = session
            .subject_id()
            .map(|id| id_to_i64("subject_id", id.value()))
            .transpose()?;
        let exam_id = session
            .exam_id()
            .map(|id| id_to_i64("exam_id", id.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
                INSERT INTO study_sessions (
                    user_id, subject_id, exam_id, started_at, ended_at,
                    topics_covered, notes, productivity
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id_to_i64("user_id", session.user_id().value())?)
        .bind(subject_id)
        .bind(exam_id)
        .bind(session.started_at())
        .bind(session.ended_at())
        .bind(topics_to_json(session.topics_covered())?)
        .bind(session.notes())
        .bind(session.productivity().map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        session_id_from_i64(res.last_insert_rowid())
    }

    async fn get_session(&self, id: StudySessionId) -> Result<Option<StudySession>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM study_sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("session_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        row.as_ref().map(map_session_row).transpose()
    }

    async fn update_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE study_sessions
                SET ended_at = ?2, topics_covered = ?3, notes = ?4, productivity = ?5
                WHERE id = ?1
            ",
        )
        .bind(id_to_i64("session_id", session.id().value())?)
        .bind(session.ended_at())
        .bind(topics_to_json(session.topics_covered())?)
        .bind(session.notes())
        .bind(session.productivity().map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_session(&self, id: StudySessionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM study_sessions WHERE id = ?1")
            .bind(id_to_i64("session_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        filter: SessionFilter,
        limit: u32,
    ) -> Result<Vec<StudySession>, StorageError> {
        let mut sql = format!("SELECT {SESSION_COLUMNS} FROM study_sessions WHERE user_id = ?1");

        let mut bind_index = 2;
        for (present, clause) in [
            (filter.subject_id.is_some(), " AND subject_id = ?"),
            (filter.exam_id.is_some(), " AND exam_id = ?"),
            (filter.from.is_some(), " AND started_at >= ?"),
            (filter.until.is_some(), " AND started_at <= ?"),
        ] {
            if present {
                sql.push_str(clause);
                sql.push_str(&bind_index.to_string());
                bind_index += 1;
            }
        }
        sql.push_str(" ORDER BY started_at DESC, id DESC");
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql).bind(id_to_i64("user_id", user_id.value())?);
        if let Some(subject_id) = filter.subject_id {
            query = query.bind(id_to_i64("subject_id", subject_id.value())?);
        }
        if let Some(exam_id) = filter.exam_id {
            query = query.bind(id_to_i64("exam_id", exam_id.value())?);
        }
        if let Some(from) = filter.from {
            query = query.bind(from);
        }
        if let Some(until) = filter.until {
            query = query.bind(until);
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }
}
