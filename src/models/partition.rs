//! Partition and cursor types: the units of resumable crawl work.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An independent unit of crawl work: one (language, year, category) slice
/// of the origin's search space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Two-letter interface language code (e.g. "en")
    pub language: String,

    /// Publication year. Besides plain years the origin exposes the special
    /// buckets "1001" (acts predating 1800) and "?" (no year recorded).
    pub year: String,

    /// Document category code from the advanced search form (e.g. "REG")
    pub category: String,
}

impl Partition {
    pub fn new(
        language: impl Into<String>,
        year: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            year: year.into(),
            category: category.into(),
        }
    }

    /// Stable key used in the checkpoint's completed set and in log lines.
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.language, self.dir_year(), self.category)
    }

    /// Directory-safe year component ("?" is stored under `unknown`).
    pub fn dir_year(&self) -> &str {
        if self.year == "?" { "unknown" } else { &self.year }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Continuation point inside a partition's result listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// 1-based listing page index
    pub index: u32,

    /// Opaque continuation token extracted from the previous listing page
    /// (the href of its next-page control). None for the first page.
    pub token: Option<String>,
}

impl PageCursor {
    /// Cursor for the first page of a partition.
    pub fn first() -> Self {
        Self {
            index: 1,
            token: None,
        }
    }

    /// Cursor for the page following this one.
    pub fn next(&self, token: impl Into<String>) -> Self {
        Self {
            index: self.index + 1,
            token: Some(token.into()),
        }
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::first()
    }
}

/// Lifecycle of a partition within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Per-partition outcome counters.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionReport {
    pub partition: Partition,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
    pub status: PartitionStatus,
}

impl PartitionReport {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            stored: 0,
            skipped: 0,
            failed: 0,
            status: PartitionStatus::InProgress,
        }
    }
}

/// Aggregated outcome of a whole run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<PartitionReport>,
}

impl RunSummary {
    pub fn push(&mut self, report: PartitionReport) {
        self.reports.push(report);
    }

    pub fn stored(&self) -> usize {
        self.reports.iter().map(|r| r.stored).sum()
    }

    pub fn skipped(&self) -> usize {
        self.reports.iter().map(|r| r.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum()
    }

    /// Partitions that did not reach Completed; a rerun with `--resume`
    /// picks these up at their saved cursors.
    pub fn incomplete(&self) -> impl Iterator<Item = &PartitionReport> {
        self.reports
            .iter()
            .filter(|r| r.status != PartitionStatus::Completed)
    }

    /// Write the per-partition totals to the log.
    pub fn log(&self) {
        log::info!(
            "Run summary: {} stored, {} skipped, {} failed across {} partitions",
            self.stored(),
            self.skipped(),
            self.failed(),
            self.reports.len()
        );
        for report in &self.reports {
            log::info!(
                "  {}: {} stored, {} skipped, {} failed ({:?})",
                report.partition,
                report.stored,
                report.skipped,
                report.failed,
                report.status
            );
        }
        let incomplete: Vec<String> = self.incomplete().map(|r| r.partition.key()).collect();
        if !incomplete.is_empty() {
            log::warn!(
                "{} partition(s) incomplete, rerun with --resume: {}",
                incomplete.len(),
                incomplete.join(", ")
            );
        }
    }
}
