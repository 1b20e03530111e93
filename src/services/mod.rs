// src/services/mod.rs

//! Crawl services: HTTP fetching, HTML extraction, page traversal and
//! document resolution.

pub mod documents;
pub mod fetch;
pub mod parser;
pub mod traverse;

pub use documents::DocumentFetcher;
pub use fetch::{FetchClient, FetchOutcome, RequestKind};
pub use parser::{Listing, ParseError, parse_document, parse_listing};
pub use traverse::{ListingPage, PageStep, PageTraverser, PartitionError};
