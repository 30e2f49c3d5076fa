use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use study_core::model::{Subject, SubjectId, Topic, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_subject_row, map_topic_row, ser, subject_id_from_i64};
use crate::repository::{NewSubjectRecord, StorageError, SubjectFilter, SubjectRepository};

const SUBJECT_COLUMNS: &str = "id, user_id, name, description, difficulty, priority, color, \
     total_study_minutes, is_active, created_at";

async fn insert_topics(
    db: &mut SqliteConnection,
    subject_id: i64,
    topics: &[Topic],
) -> Result<(), StorageError> {
    for (position, topic) in (0_i64..).zip(topics) {
        sqlx::query(
            r"
                INSERT INTO topics (subject_id, id, position, name, completed, confidence, notes, last_studied)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(subject_id)
        .bind(id_to_i64("topic_id", topic.id().value())?)
        .bind(position)
        .bind(topic.name())
        .bind(i64::from(topic.is_completed()))
        .bind(i64::from(topic.confidence()))
        .bind(topic.notes())
        .bind(topic.last_studied())
        .execute(&mut *db)
        .await
        .map_err(conn)?;
    }
    Ok(())
}

impl SqliteRepository {
    /// Load syllabi for the given subject ids, keyed by subject.
    async fn load_syllabi(
        &self,
        subject_ids: &[i64],
    ) -> Result<HashMap<SubjectId, Vec<Topic>>, StorageError> {
        let mut out: HashMap<SubjectId, Vec<Topic>> = HashMap::new();
        if subject_ids.is_empty() {
            return Ok(out);
        }

        let placeholders: Vec<String> = (1..=subject_ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT subject_id, id, name, completed, confidence, notes, last_studied \
             FROM topics WHERE subject_id IN ({}) ORDER BY subject_id ASC, position ASC",
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for id in subject_ids {
            query = query.bind(*id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        for row in rows {
            let (subject_id, topic) = map_topic_row(&row)?;
            out.entry(subject_id).or_default().push(topic);
        }
        Ok(out)
    }

    async fn subjects_from_rows(&self, rows: Vec<SqliteRow>) -> Result<Vec<Subject>, StorageError> {
        let ids = rows
            .iter()
            .map(|r| r.try_get::<i64, _>("id").map_err(ser))
            .collect::<Result<Vec<_>, _>>()?;
        let mut syllabi = self.load_syllabi(&ids).await?;

        let mut subjects = Vec::with_capacity(rows.len());
        for (row, raw_id) in rows.iter().zip(ids) {
            let syllabus = syllabi
                .remove(&subject_id_from_i64(raw_id)?)
                .unwrap_or_default();
            subjects.push(map_subject_row(row, syllabus)?);
        }
        Ok(subjects)
    }
}

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn insert_new_subject(
        &self,
        subject: NewSubjectRecord,
    ) -> Result<SubjectId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO subjects (user_id, name, description, difficulty, priority, color, total_study_minutes, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(id_to_i64("user_id", subject.user_id.value())?)
        .bind(&subject.name)
        .bind(&subject.description)
        .bind(subject.difficulty.map(i64::from))
        .bind(subject.priority.as_str())
        .bind(&subject.color)
        .bind(i64::from(subject.total_study_minutes))
        .bind(i64::from(subject.is_active))
        .bind(subject.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let raw_id = res.last_insert_rowid();
        insert_topics(&mut *tx, raw_id, &subject.syllabus).await?;
        tx.commit().await.map_err(conn)?;

        subject_id_from_i64(raw_id)
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let id = id_to_i64("subject_id", subject.id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO subjects (id, user_id, name, description, difficulty, priority, color, total_study_minutes, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                difficulty = excluded.difficulty,
                priority = excluded.priority,
                color = excluded.color,
                total_study_minutes = excluded.total_study_minutes,
                is_active = excluded.is_active
            ",
        )
        .bind(id)
        .bind(id_to_i64("user_id", subject.user_id().value())?)
        .bind(subject.name())
        .bind(subject.description())
        .bind(subject.difficulty().map(i64::from))
        .bind(subject.priority().as_str())
        .bind(subject.color())
        .bind(i64::from(subject.total_study_minutes()))
        .bind(i64::from(subject.is_active()))
        .bind(subject.created_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM topics WHERE subject_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        insert_topics(&mut *tx, id, subject.syllabus()).await?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("subject_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => Ok(self.subjects_from_rows(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        // topics go with the subject through ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM subjects WHERE id = ?1")
            .bind(id_to_i64("subject_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn find_active_subjects(&self, user_id: UserId) -> Result<Vec<Subject>, StorageError> {
        let sql = format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE user_id = ?1 AND is_active = 1 ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("user_id", user_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        self.subjects_from_rows(rows).await
    }

    async fn list_subjects(
        &self,
        user_id: UserId,
        filter: SubjectFilter,
    ) -> Result<Vec<Subject>, StorageError> {
        let mut sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE user_id = ?1");
        let mut bind_index = 2;
        if filter.priority.is_some() {
            sql.push_str(&format!(" AND priority = ?{bind_index}"));
            bind_index += 1;
        }
        if filter.is_active.is_some() {
            sql.push_str(&format!(" AND is_active = ?{bind_index}"));
        }
        sql.push_str(
            " ORDER BY CASE priority WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END DESC, \
             created_at DESC, id DESC",
        );

        let mut query = sqlx::query(&sql).bind(id_to_i64("user_id", user_id.value())?);
        if let Some(priority) = filter.priority {
            query = query.bind(priority.as_str());
        }
        if let Some(active) = filter.is_active {
            query = query.bind(i64::from(active));
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        self.subjects_from_rows(rows).await
    }
}
