//! SQLite-backed sample store

use super::SampleStore;
use crate::error::{TrackerError, TrackerResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS samples (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    score   INTEGER NOT NULL,
    member  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_samples_score ON samples(score);
"#;

pub struct SqliteSampleStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSampleStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(db_path: impl AsRef<Path>) -> TrackerResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackerError::Store(format!("create {}: {}", parent.display(), e)))?;
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;

        log::info!("📊 Sample store ready: {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> TrackerResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> TrackerResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TrackerError::Store("sqlite connection mutex poisoned".to_string()))
    }

    fn query_members(conn: &Connection, min_score: Option<i64>) -> TrackerResult<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT member FROM samples
             WHERE ?1 IS NULL OR score >= ?1
             ORDER BY score ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![min_score], |row| row.get::<_, String>(0))?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }
}

#[async_trait]
impl SampleStore for SqliteSampleStore {
    async fn append(&self, score: i64, member: String) -> TrackerResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO samples (score, member) VALUES (?1, ?2)",
            params![score, member],
        )?;
        Ok(())
    }

    async fn append_batch(&self, entries: Vec<(i64, String)>) -> TrackerResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO samples (score, member) VALUES (?1, ?2)")?;
            for (score, member) in &entries {
                stmt.execute(params![score, member])?;
            }
        }
        tx.commit()?;
        Ok(entries.len())
    }

    async fn range_all(&self) -> TrackerResult<Vec<String>> {
        let conn = self.lock()?;
        Self::query_members(&conn, None)
    }

    async fn range_since(&self, min_score: i64) -> TrackerResult<Vec<String>> {
        let conn = self.lock()?;
        Self::query_members(&conn, Some(min_score))
    }

    async fn prune_older_than(&self, cutoff: i64) -> TrackerResult<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM samples WHERE score < ?1", params![cutoff])?;
        Ok(removed)
    }

    async fn len(&self) -> TrackerResult<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM samples", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
