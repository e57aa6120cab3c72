//! In-memory sample store, used by tests and `:memory:` deployments

use super::SampleStore;
use crate::error::TrackerResult;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Keeps insertion order; reads are *not* sorted.
#[derive(Debug, Default)]
pub struct MemorySampleStore {
    entries: RwLock<Vec<(i64, String)>>,
}

impl MemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SampleStore for MemorySampleStore {
    async fn append(&self, score: i64, member: String) -> TrackerResult<()> {
        self.entries.write().await.push((score, member));
        Ok(())
    }

    async fn append_batch(&self, entries: Vec<(i64, String)>) -> TrackerResult<usize> {
        let count = entries.len();
        self.entries.write().await.extend(entries);
        Ok(count)
    }

    async fn range_all(&self) -> TrackerResult<Vec<String>> {
        Ok(self.entries.read().await.iter().map(|(_, m)| m.clone()).collect())
    }

    async fn range_since(&self, min_score: i64) -> TrackerResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|(score, _)| *score >= min_score)
            .map(|(_, m)| m.clone())
            .collect())
    }

    async fn prune_older_than(&self, cutoff: i64) -> TrackerResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(score, _)| *score >= cutoff);
        Ok(before - entries.len())
    }

    async fn len(&self) -> TrackerResult<usize> {
        Ok(self.entries.read().await.len())
    }
}
