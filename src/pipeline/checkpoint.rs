// src/pipeline/checkpoint.rs

//! Crawl progress persistence.
//!
//! The checkpoint records which partitions are done and, for the partition
//! in flight, the page cursor to resume from plus the ids already processed
//! on the current run. It is written atomically after every listing page so
//! a crash costs at most one page of rework.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{PageCursor, Partition};

/// Bumped whenever the checkpoint layout changes incompatibly.
const SCHEMA_VERSION: &str = "1";

/// Progress inside the partition currently being crawled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionProgress {
    pub partition: Partition,
    /// Next listing page to fetch.
    pub cursor: PageCursor,
    /// Ids resolved so far in this partition (stored or skipped).
    pub processed: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub schema_version: String,
    /// Keys of partitions crawled to completion.
    pub completed: BTreeSet<String>,
    pub current: Option<PartitionProgress>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Checkpoint {
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            completed: BTreeSet::new(),
            current: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_completed(&self, partition: &Partition) -> bool {
        self.completed.contains(&partition.key())
    }

    /// Cursor to resume a partition from, when it is the one in flight.
    pub fn resume_cursor(&self, partition: &Partition) -> Option<PageCursor> {
        self.current
            .as_ref()
            .filter(|p| p.partition == *partition)
            .map(|p| p.cursor.clone())
    }

    /// Ids already processed for a partition on a previous run.
    pub fn processed_ids(&self, partition: &Partition) -> BTreeSet<String> {
        self.current
            .as_ref()
            .filter(|p| p.partition == *partition)
            .map(|p| p.processed.clone())
            .unwrap_or_default()
    }

    /// Mark a partition as the one in flight. Processed ids survive when the
    /// same partition is resumed; switching partitions resets them.
    pub fn begin_partition(&mut self, partition: &Partition, cursor: PageCursor) {
        let processed = self.processed_ids(partition);
        self.current = Some(PartitionProgress {
            partition: partition.clone(),
            cursor,
            processed,
        });
        self.updated_at = Utc::now();
    }

    /// Record a finished listing page: the cursor to resume from next and
    /// the ids resolved on the page.
    pub fn record_page<I>(&mut self, next_cursor: Option<PageCursor>, processed_ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        if let Some(progress) = self.current.as_mut() {
            progress.processed.extend(processed_ids);
            if let Some(cursor) = next_cursor {
                progress.cursor = cursor;
            }
        }
        self.updated_at = Utc::now();
    }

    pub fn complete_partition(&mut self, partition: &Partition) {
        self.completed.insert(partition.key());
        if self
            .current
            .as_ref()
            .is_some_and(|p| p.partition == *partition)
        {
            self.current = None;
        }
        self.updated_at = Utc::now();
    }
}

/// Reads and writes the checkpoint file for one language tree.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join("checkpoint.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint. None when no file exists yet; an error when the
    /// file is unreadable or from an incompatible schema.
    pub async fn load(&self) -> Result<Option<Checkpoint>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };

        let checkpoint: Checkpoint = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::checkpoint(format!("corrupt checkpoint at {:?}: {e}", self.path))
        })?;

        if checkpoint.schema_version != SCHEMA_VERSION {
            return Err(AppError::checkpoint(format!(
                "checkpoint schema {} is not supported (expected {})",
                checkpoint.schema_version, SCHEMA_VERSION
            )));
        }
        Ok(Some(checkpoint))
    }

    /// Write atomically (write to temp, then rename).
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(checkpoint)?;
        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Delete any existing checkpoint, for clean restarts.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn partition() -> Partition {
        Partition::new("en", "2020", "REG")
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path());

        let mut checkpoint = Checkpoint::new();
        checkpoint.begin_partition(&partition(), PageCursor::first());
        checkpoint.record_page(
            Some(PageCursor::first().next("./search.html?page=2")),
            ["CELEX-32020R0001".to_string()],
        );
        store.save(&checkpoint).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        let cursor = loaded.resume_cursor(&partition()).unwrap();
        assert_eq!(cursor.index, 2);
        assert!(loaded.processed_ids(&partition()).contains("CELEX-32020R0001"));

        // No temp file left behind.
        assert!(!tmp.path().join("checkpoint.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn schema_mismatch_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path());

        let mut checkpoint = Checkpoint::new();
        checkpoint.schema_version = "0".to_string();
        store.save(&checkpoint).await.unwrap();

        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("checkpoint.json"), b"{ not json").unwrap();

        let store = CheckpointStore::new(tmp.path());
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn clear_removes_file_and_tolerates_absence() {
        let tmp = TempDir::new().unwrap();
        let store = CheckpointStore::new(tmp.path());

        store.clear().await.unwrap();
        store.save(&Checkpoint::new()).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[test]
    fn completing_the_current_partition_clears_it() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.begin_partition(&partition(), PageCursor::first());
        checkpoint.complete_partition(&partition());

        assert!(checkpoint.is_completed(&partition()));
        assert!(checkpoint.current.is_none());
    }

    #[test]
    fn resuming_same_partition_keeps_processed_ids() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.begin_partition(&partition(), PageCursor::first());
        checkpoint.record_page(None, ["a".to_string()]);

        checkpoint.begin_partition(&partition(), PageCursor::first());
        assert!(checkpoint.processed_ids(&partition()).contains("a"));

        let other = Partition::new("en", "2019", "REG");
        checkpoint.begin_partition(&other, PageCursor::first());
        assert!(checkpoint.processed_ids(&other).is_empty());
    }
}
