//! # SQLite Store
//!
//! Single-file persistence at `.cofounder/cofounder.db`. Each snapshot
//! version is one row holding the full JSON payload, with the columns the
//! list filters need pulled out next to it.

use super::snapshot::{Feedback, IdeaSnapshot};
use super::store::{IdeaStore, ListQuery};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }
        Self::from_connection(Connection::open(path.as_ref())?)
    }

    /// Throwaway database, for tests and demos
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
            tracing::info!(version = SCHEMA_VERSION, "Idea store schema migrated");
        }

        Ok(())
    }

    fn migrate_v1(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS idea_versions (
                id TEXT NOT NULL,
                version INTEGER NOT NULL,
                topic TEXT NOT NULL,
                status TEXT NOT NULL,
                overall_score REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (id, version)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS feedback (
                id TEXT PRIMARY KEY,
                idea_id TEXT NOT NULL,
                feedback_type TEXT NOT NULL,
                content TEXT NOT NULL,
                rating INTEGER,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_feedback_idea ON feedback(idea_id)",
            [],
        )?;

        Ok(())
    }

    fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<String> {
        row.get(0)
    }

    fn decode_snapshots(rows: Vec<String>) -> Result<Vec<IdeaSnapshot>, StoreError> {
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(StoreError::from))
            .collect()
    }

    fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<Feedback> {
        let created_at: String = row.get(5)?;
        let rating: Option<i64> = row.get(4)?;
        Ok(Feedback {
            id: row.get(0)?,
            idea_id: row.get(1)?,
            feedback_type: row.get(2)?,
            content: row.get(3)?,
            rating: rating.and_then(|r| u8::try_from(r).ok()),
            created_at: parse_timestamp(&created_at),
        })
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl IdeaStore for SqliteStore {
    async fn save(&self, snapshot: &IdeaSnapshot) -> Result<IdeaSnapshot, StoreError> {
        let data = serde_json::to_string(snapshot)?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO idea_versions
                (id, version, topic, status, overall_score, created_at, updated_at, data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                snapshot.id,
                snapshot.version,
                snapshot.topic,
                snapshot.status.as_str(),
                snapshot.overall_score,
                timestamp(&snapshot.created_at),
                timestamp(&snapshot.updated_at),
                data,
            ],
        )?;
        Ok(snapshot.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<IdeaSnapshot>, StoreError> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM idea_versions WHERE id = ?1 ORDER BY version DESC LIMIT 1",
                [id],
                Self::snapshot_from_row,
            )
            .optional()?;
        data.map(|data| serde_json::from_str(&data).map_err(StoreError::from))
            .transpose()
    }

    async fn get_version(
        &self,
        id: &str,
        version: u32,
    ) -> Result<Option<IdeaSnapshot>, StoreError> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM idea_versions WHERE id = ?1 AND version = ?2",
                params![id, version],
                Self::snapshot_from_row,
            )
            .optional()?;
        data.map(|data| serde_json::from_str(&data).map_err(StoreError::from))
            .transpose()
    }

    async fn history(&self, id: &str) -> Result<Vec<IdeaSnapshot>, StoreError> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt =
                conn.prepare("SELECT data FROM idea_versions WHERE id = ?1 ORDER BY version ASC")?;
            let rows = stmt
                .query_map([id], Self::snapshot_from_row)?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            rows
        };
        Self::decode_snapshots(rows)
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<IdeaSnapshot>, StoreError> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT data FROM idea_versions v
                WHERE version = (SELECT MAX(version) FROM idea_versions WHERE id = v.id)
                  AND (?1 IS NULL OR instr(lower(topic), lower(?1)) > 0)
                  AND (?2 IS NULL OR overall_score >= ?2)
                ORDER BY created_at DESC, id ASC
                LIMIT ?3 OFFSET ?4
                "#,
            )?;
            let rows = stmt
                .query_map(
                    params![
                        query.topic_filter,
                        query.min_score,
                        query.page_size as i64,
                        query.offset() as i64,
                    ],
                    Self::snapshot_from_row,
                )?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            rows
        };
        Self::decode_snapshots(rows)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM idea_versions WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    async fn save_feedback(&self, feedback: &Feedback) -> Result<Feedback, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO feedback
                (id, idea_id, feedback_type, content, rating, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                feedback.id,
                feedback.idea_id,
                feedback.feedback_type,
                feedback.content,
                feedback.rating,
                timestamp(&feedback.created_at),
            ],
        )?;
        Ok(feedback.clone())
    }

    async fn get_feedback(&self, id: &str) -> Result<Option<Feedback>, StoreError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                "SELECT id, idea_id, feedback_type, content, rating, created_at \
                 FROM feedback WHERE id = ?1",
                [id],
                Self::feedback_from_row,
            )
            .optional()?)
    }

    async fn feedback_for_idea(
        &self,
        idea_id: &str,
        page: usize,
        page_size: usize,
        feedback_type: Option<&str>,
    ) -> Result<Vec<Feedback>, StoreError> {
        let offset = page.max(1).saturating_sub(1) * page_size;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, idea_id, feedback_type, content, rating, created_at
            FROM feedback
            WHERE idea_id = ?1 AND (?2 IS NULL OR feedback_type = ?2)
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?3 OFFSET ?4
            "#,
        )?;
        let feedback = stmt
            .query_map(
                params![idea_id, feedback_type, page_size as i64, offset as i64],
                Self::feedback_from_row,
            )?
            .collect::<rusqlite::Result<Vec<Feedback>>>()?;
        Ok(feedback)
    }

    async fn delete_feedback(&self, id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM feedback WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::{Constraints, Critique, IdeaDraft, MarketAnalysis};
    use crate::state::IdeaStatus;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn snapshot(topic: &str) -> IdeaSnapshot {
        let mut snapshot = IdeaSnapshot::draft(
            topic,
            Constraints::new(),
            IdeaDraft::placeholder(0, topic),
            MarketAnalysis {
                key_trends: vec!["AI".into()],
                ..MarketAnalysis::default()
            },
        );
        snapshot.critic_output = Some(Critique {
            score: 7.0,
            ..Critique::default()
        });
        snapshot.status = IdeaStatus::Completed;
        snapshot.overall_score = 0.61;
        snapshot
    }

    #[tokio::test]
    async fn test_round_trip_preserves_every_field() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open_at(dir.path().join("nested/cofounder.db")).unwrap();
        let original = snapshot("pets");

        store.save(&original).await.unwrap();
        let loaded = store.get(&original.id).await.unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_reopen_keeps_data_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cofounder.db");
        let original = snapshot("pets");
        {
            let store = SqliteStore::open_at(&path).unwrap();
            store.save(&original).await.unwrap();
        }
        let store = SqliteStore::open_at(&path).unwrap();
        assert_eq!(store.history(&original.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_latest_version_and_list() {
        let store = SqliteStore::open_in_memory().unwrap();
        let v1 = snapshot("Pet care");
        let mut v2 = v1.clone();
        v2.version = 2;
        v2.overall_score = 0.9;
        store.save(&v1).await.unwrap();
        store.save(&v2).await.unwrap();
        store.save(&snapshot("fintech")).await.unwrap();

        assert_eq!(store.get(&v1.id).await.unwrap().unwrap().version, 2);
        assert_eq!(store.get_version(&v1.id, 1).await.unwrap().unwrap().version, 1);
        assert_eq!(store.get_version(&v1.id, 3).await.unwrap(), None);

        let all = store.list(&ListQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let pets = store
            .list(&ListQuery::default().with_topic("pet"))
            .await
            .unwrap();
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].version, 2);

        let high = store
            .list(&ListQuery::default().with_min_score(0.8))
            .await
            .unwrap();
        assert_eq!(high.len(), 1);

        assert!(store.delete(&v1.id).await.unwrap());
        assert!(store.history(&v1.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_crud() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = Feedback::new("idea-1", "market", "bigger").with_rating(4);
        let b = Feedback::new("idea-1", "feature", "add chat");
        store.save_feedback(&a).await.unwrap();
        store.save_feedback(&b).await.unwrap();

        assert_eq!(store.get_feedback(&a.id).await.unwrap(), Some(a.clone()));
        let all = store.feedback_for_idea("idea-1", 1, 10, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let market = store
            .feedback_for_idea("idea-1", 1, 10, Some("market"))
            .await
            .unwrap();
        assert_eq!(market, vec![a.clone()]);

        assert!(store.delete_feedback(&a.id).await.unwrap());
        assert!(!store.delete_feedback(&a.id).await.unwrap());
    }
}
