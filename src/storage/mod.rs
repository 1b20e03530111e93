// src/storage/mod.rs

//! Storage abstractions for crawled documents.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/{lang}/
//! ├── errors.txt                        # Append-only fetch failure log
//! ├── checkpoint.json                   # Crawl progress (written by the pipeline)
//! └── {year}/{category}/
//!     ├── documents/{id}.json           # Structured document data
//!     ├── html/{id}.html.gz             # Raw document pages, gzipped
//!     └── listing/{page}.html.gz        # Raw listing pages, gzipped
//! ```
//!
//! The `documents/` directory doubles as the persisted dedup record: ids
//! found there are not refetched on later runs.

pub mod local;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DocumentRef, ParsedDocument, Partition};

pub use local::LocalStorage;

/// Trait for document storage backends.
///
/// Every error returned here is treated as fatal by the pipeline; backends
/// must not swallow I/O failures.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Persist the structured data of one document as JSON.
    async fn save_document_data(
        &self,
        partition: &Partition,
        reference: &DocumentRef,
        document: &ParsedDocument,
    ) -> Result<()>;

    /// Persist the raw HTML of one document page, gzipped.
    async fn save_document_html(
        &self,
        partition: &Partition,
        id: &str,
        body: &[u8],
    ) -> Result<()>;

    /// Persist the raw HTML of one listing page, gzipped.
    async fn save_listing_html(
        &self,
        partition: &Partition,
        page_index: u32,
        body: &[u8],
    ) -> Result<()>;

    /// Ids of all documents already stored for a partition.
    async fn list_completed_ids(&self, partition: &Partition) -> Result<HashSet<String>>;

    /// Append one line to the language's fetch failure log.
    async fn append_error_log(&self, language: &str, line: &str) -> Result<()>;
}
