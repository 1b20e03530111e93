// src/pipeline/mod.rs

//! Crawl pipeline: checkpointing, dedup and run orchestration.

pub mod checkpoint;
pub mod crawl;
pub mod dedup;

pub use checkpoint::{Checkpoint, CheckpointStore, PartitionProgress};
pub use crawl::{CrawlOptions, run_crawl};
pub use dedup::Deduplicator;
