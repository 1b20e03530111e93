// src/models/mod.rs

//! Domain models for the crawler application.

mod config;
mod document;
mod partition;

// Re-export all public types
pub use config::{Config, CrawlerConfig, FilterConfig, OutputConfig};
pub use document::{DocumentOutcome, DocumentRef, ParsedDocument};
pub use partition::{PageCursor, Partition, PartitionReport, PartitionStatus, RunSummary};
