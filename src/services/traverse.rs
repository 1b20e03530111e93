// src/services/traverse.rs

//! Sequential walk over the listing pages of one partition.

use crate::models::{DocumentRef, PageCursor, Partition};
use crate::services::fetch::{FetchClient, FetchOutcome, RequestKind};
use crate::services::parser;
use crate::utils::url::SearchUrlBuilder;

/// Hard cap on pages per partition, guarding against a pagination loop if
/// the origin keeps serving a next-page arrow.
const MAX_PAGES: u32 = 10_000;

/// Why a partition stopped before its natural end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// Listing fetch kept failing after retries; worth rerunning later.
    Transient(String),
    /// Listing fetch was rejected outright.
    Permanent(String),
    /// The listing page no longer matches the expected markup.
    SiteStructureChanged(String),
}

impl std::fmt::Display for PartitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(reason) => write!(f, "transient listing failure: {reason}"),
            Self::Permanent(reason) => write!(f, "permanent listing failure: {reason}"),
            Self::SiteStructureChanged(reason) => {
                write!(f, "listing markup not recognized: {reason}")
            }
        }
    }
}

/// One successfully fetched and parsed listing page.
#[derive(Debug)]
pub struct ListingPage {
    pub cursor: PageCursor,
    pub items: Vec<DocumentRef>,
    pub raw_html: Vec<u8>,
    /// Cursor of the following page, None on the last page.
    pub next: Option<PageCursor>,
}

/// Result of asking the traverser for the next page.
#[derive(Debug)]
pub enum PageStep {
    Page(ListingPage),
    /// The partition's result set is exhausted.
    End,
    /// The partition stopped early; the cursor it stopped at is preserved
    /// in the checkpoint by the caller.
    Failed(PartitionError),
}

/// Walks a partition's listing pages one at a time. Fused: after `End` or
/// `Failed` every further call returns `End`.
pub struct PageTraverser<'a> {
    fetch: &'a FetchClient,
    urls: &'a SearchUrlBuilder,
    partition: Partition,
    cursor: Option<PageCursor>,
    pages_seen: u32,
}

impl<'a> PageTraverser<'a> {
    pub fn new(
        fetch: &'a FetchClient,
        urls: &'a SearchUrlBuilder,
        partition: Partition,
        start: PageCursor,
    ) -> Self {
        Self {
            fetch,
            urls,
            partition,
            cursor: Some(start),
            pages_seen: 0,
        }
    }

    /// The cursor of the page that would be fetched next.
    pub fn cursor(&self) -> Option<&PageCursor> {
        self.cursor.as_ref()
    }

    pub async fn next_page(&mut self) -> PageStep {
        let Some(cursor) = self.cursor.clone() else {
            return PageStep::End;
        };

        if self.pages_seen >= MAX_PAGES {
            log::error!(
                "Partition {} exceeded {} pages, stopping",
                self.partition,
                MAX_PAGES
            );
            self.cursor = None;
            return PageStep::Failed(PartitionError::SiteStructureChanged(
                "pagination did not terminate".to_string(),
            ));
        }

        let url = self.urls.listing_url(&self.partition, &cursor);
        log::debug!("Fetching listing page {} of {}", cursor.index, self.partition);

        match self.fetch.fetch(&url, RequestKind::Listing).await {
            FetchOutcome::Success { body, .. } => match parser::parse_listing(&body) {
                Ok(listing) => {
                    self.pages_seen += 1;
                    let next = listing.next.map(|token| cursor.next(token));
                    self.cursor = next.clone();
                    PageStep::Page(ListingPage {
                        cursor,
                        items: listing.items,
                        raw_html: body,
                        next,
                    })
                }
                Err(e) => {
                    self.cursor = None;
                    PageStep::Failed(PartitionError::SiteStructureChanged(e.to_string()))
                }
            },
            FetchOutcome::Transient { reason } => {
                self.cursor = None;
                PageStep::Failed(PartitionError::Transient(reason))
            }
            FetchOutcome::Permanent { reason } => {
                self.cursor = None;
                PageStep::Failed(PartitionError::Permanent(reason))
            }
        }
    }
}
