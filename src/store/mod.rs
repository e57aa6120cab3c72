//! Sample store: append-only observations scored by timestamp
//!
//! Members are opaque strings (serialized observations). Reads make no
//! ordering promise the caller may rely on; concurrent writers can interleave,
//! so the query service always re-sorts.

pub mod memory;
pub mod sqlite;

pub use memory::MemorySampleStore;
pub use sqlite::SqliteSampleStore;

use crate::error::TrackerResult;
use async_trait::async_trait;

#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Append one member under `score` (ms timestamp). Duplicate scores are legal.
    async fn append(&self, score: i64, member: String) -> TrackerResult<()>;

    /// Append many members; returns how many were written.
    async fn append_batch(&self, entries: Vec<(i64, String)>) -> TrackerResult<usize>;

    /// Every stored member.
    async fn range_all(&self) -> TrackerResult<Vec<String>>;

    /// Members with `score >= min_score`.
    async fn range_since(&self, min_score: i64) -> TrackerResult<Vec<String>>;

    /// Delete members with `score < cutoff`. Idempotent; returns rows removed.
    async fn prune_older_than(&self, cutoff: i64) -> TrackerResult<usize>;

    async fn len(&self) -> TrackerResult<usize>;
}

/// Open the store named by `db_path`; `:memory:` selects `MemorySampleStore`.
pub fn open_store(db_path: &str) -> TrackerResult<std::sync::Arc<dyn SampleStore>> {
    if db_path == crate::config::MEMORY_DB_PATH {
        log::info!("🧠 Using in-memory sample store (data is lost on exit)");
        return Ok(std::sync::Arc::new(MemorySampleStore::new()));
    }
    Ok(std::sync::Arc::new(SqliteSampleStore::open(db_path)?))
}
