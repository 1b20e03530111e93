// src/services/documents.rs

//! Fetch, parse and persist individual documents.

use chrono::Utc;

use crate::error::Result;
use crate::models::{DocumentOutcome, DocumentRef, Partition};
use crate::pipeline::Deduplicator;
use crate::services::fetch::{FetchClient, FetchOutcome, RequestKind};
use crate::services::parser;
use crate::storage::DocumentStorage;
use crate::utils::url::SearchUrlBuilder;

/// Resolves one document reference at a time. Shared by all workers of a
/// partition; cheap to pass around by reference.
pub struct DocumentFetcher<'a> {
    fetch: &'a FetchClient,
    urls: &'a SearchUrlBuilder,
    storage: &'a dyn DocumentStorage,
    dedup: &'a Deduplicator,
    save_data: bool,
    save_html: bool,
    refetch: bool,
}

impl<'a> DocumentFetcher<'a> {
    pub fn new(
        fetch: &'a FetchClient,
        urls: &'a SearchUrlBuilder,
        storage: &'a dyn DocumentStorage,
        dedup: &'a Deduplicator,
        save_data: bool,
        save_html: bool,
        refetch: bool,
    ) -> Self {
        Self {
            fetch,
            urls,
            storage,
            dedup,
            save_data,
            save_html,
            refetch,
        }
    }

    /// Resolve one reference. Fetch and parse failures come back as
    /// `DocumentOutcome::Failed`; only storage I/O errors propagate.
    pub async fn fetch_document(
        &self,
        partition: &Partition,
        reference: &DocumentRef,
    ) -> Result<DocumentOutcome> {
        if !self.refetch && self.dedup.has(&reference.id) {
            log::debug!("Skipping {} (already stored)", reference.id);
            return Ok(DocumentOutcome::Skipped);
        }

        let url = self.urls.document_url(&reference.url);
        match self.fetch.fetch(&url, RequestKind::Document).await {
            FetchOutcome::Success { body, .. } => {
                let document = match parser::parse_document(&body) {
                    Ok(document) => document,
                    Err(e) => {
                        log::warn!("Could not parse document {}: {}", reference.id, e);
                        return Ok(DocumentOutcome::Failed(e.to_string()));
                    }
                };

                if self.save_html {
                    self.storage
                        .save_document_html(partition, &reference.id, &body)
                        .await?;
                }
                if self.save_data {
                    self.storage
                        .save_document_data(partition, reference, &document)
                        .await?;
                }
                self.dedup.mark_done(&reference.id);
                Ok(DocumentOutcome::Stored)
            }
            FetchOutcome::Transient { reason } => {
                self.storage
                    .append_error_log(
                        self.urls.language(),
                        &format!("{url} unreachable at {}", Utc::now()),
                    )
                    .await?;
                Ok(DocumentOutcome::Failed(reason))
            }
            FetchOutcome::Permanent { reason } => {
                log::warn!("Document {} rejected: {}", reference.id, reason);
                Ok(DocumentOutcome::Failed(reason))
            }
        }
    }
}
