// src/pipeline/dedup.rs

//! In-memory dedup set shared by document fetch workers.
//!
//! The persisted record is the storage tree itself; this set is seeded from
//! it at partition start and only exists to keep concurrent workers from
//! fetching the same document twice within a run.

use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: Mutex<HashSet<String>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with ids already processed in earlier runs.
    pub fn seed<I: IntoIterator<Item = String>>(&self, ids: I) {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.extend(ids);
    }

    pub fn has(&self, id: &str) -> bool {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.contains(id)
    }

    /// Record an id as done. Returns false if it was already present.
    pub fn mark_done(&self, id: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        let seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
