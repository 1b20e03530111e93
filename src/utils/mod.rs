//! Utility functions and helpers.

pub mod url;

use sha2::{Digest, Sha256};

/// Extract the stable document id from a result link's `uri=` query
/// parameter. CELEX uris contain `/` and `:` which are replaced by `-` so
/// the id is safe as a file name.
pub fn document_id(href: &str) -> Option<String> {
    let pattern = regex::Regex::new(r"[?&]uri=([^&]+)").ok()?;
    let caps = pattern.captures(href)?;
    let raw = caps.get(1)?.as_str();
    if raw.is_empty() {
        return None;
    }
    Some(raw.replace(['/', ':'], "-"))
}

/// Fallback id for results whose link carries no `uri=` parameter.
pub fn hashed_id(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..16])
}
