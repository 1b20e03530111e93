//! Document reference and content data structures.

use serde::{Deserialize, Serialize};

/// A reference to a single document, extracted from a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentRef {
    /// Stable unique identifier, derived from the CELEX uri of the result
    /// link (`/` and `:` replaced by `-`).
    pub id: String,

    /// Result title as shown on the listing page
    pub title: String,

    /// Endpoint of the document detail page, as found on the listing page
    /// (still carrying the origin's `AUTO` language segment)
    pub url: String,

    /// Labels found alongside the result on the listing page
    pub labels: Vec<String>,
}

/// Structured data scraped from a document detail page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedDocument {
    /// EuroVoc classifier codes attached to the document
    pub eurovoc_classifiers: Vec<String>,

    /// Normalized full text (whitespace collapsed, header stripped)
    pub full_text: String,
}

/// Resolution of a single document fetch.
///
/// Failures here are item-scoped: the partition keeps going. Storage I/O
/// failures are deliberately NOT representable here; they propagate as
/// `AppError` and abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Fetched, parsed and persisted
    Stored,
    /// Already present in the dedup set; not refetched
    Skipped,
    /// Fetch or parse failed after retries; logged and skipped over
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_document_round_trips_as_json() {
        let doc = ParsedDocument {
            eurovoc_classifiers: vec!["1309".to_string(), "2771".to_string()],
            full_text: "Article 1 This Regulation enters into force.".to_string(),
        };
        let json = serde_json::to_string(&doc).unwrap();
        let back: ParsedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
