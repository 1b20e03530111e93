//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::url::content_language;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and retry behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Which slice of the origin's search space to crawl
    #[serde(default)]
    pub filters: FilterConfig,

    /// Where and what to persist
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.listing_timeout_secs == 0 || self.crawler.document_timeout_secs == 0 {
            return Err(AppError::validation("crawler timeouts must be > 0"));
        }
        if self.crawler.max_retries == 0 {
            return Err(AppError::validation("crawler.max_retries must be > 0"));
        }
        if self.crawler.workers == 0 {
            return Err(AppError::validation("crawler.workers must be > 0"));
        }
        if content_language(&self.filters.language).is_none() {
            return Err(AppError::validation(format!(
                "unsupported language: {}",
                self.filters.language
            )));
        }
        for year in &self.filters.years {
            let special = year == "1001" || year == "?";
            if !special && year.parse::<u32>().is_err() {
                return Err(AppError::validation(format!("invalid year filter: {year}")));
            }
        }
        if self.output.target_dir.trim().is_empty() {
            return Err(AppError::validation("output.target_dir is empty"));
        }
        Ok(())
    }
}

/// HTTP client and retry behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Origin to crawl. Overridable so tests can point at a local server.
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Timeout for listing page requests in seconds
    #[serde(default = "defaults::listing_timeout")]
    pub listing_timeout_secs: u64,

    /// Timeout for document page requests in seconds. Document pages on the
    /// origin are much slower than listings.
    #[serde(default = "defaults::document_timeout")]
    pub document_timeout_secs: u64,

    /// Maximum attempts per request before a transient failure is terminal
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base backoff unit in milliseconds; the delay before attempt n is
    /// `sleep_time_ms * n` plus jitter
    #[serde(default = "defaults::sleep_time")]
    pub sleep_time_ms: u64,

    /// Size of the document fetch worker pool. 1 means strictly sequential.
    #[serde(default = "defaults::workers")]
    pub workers: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            listing_timeout_secs: defaults::listing_timeout(),
            document_timeout_secs: defaults::document_timeout(),
            max_retries: defaults::max_retries(),
            sleep_time_ms: defaults::sleep_time(),
            workers: defaults::workers(),
        }
    }
}

/// Which slice of the search space to crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Interface language code
    #[serde(default = "defaults::language")]
    pub language: String,

    /// Years to crawl; empty means every year from the current one back to
    /// 1800 plus the origin's "1001" and "?" buckets
    #[serde(default)]
    pub years: Vec<String>,

    /// Category codes to crawl; empty means the default set
    #[serde(default = "defaults::categories")]
    pub categories: Vec<String>,

    /// Label types to keep on extracted references; empty keeps all
    #[serde(default)]
    pub label_types: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            language: defaults::language(),
            years: Vec::new(),
            categories: defaults::categories(),
            label_types: Vec::new(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for downloaded data and crawl state
    #[serde(default = "defaults::target_dir")]
    pub target_dir: String,

    /// Persist structured document data as JSON
    #[serde(default = "defaults::save_data")]
    pub save_data: bool,

    /// Persist raw page HTML, gzipped
    #[serde(default)]
    pub save_html: bool,

    /// Checkpoint at least every this many resolved documents within a page
    #[serde(default = "defaults::flush_every")]
    pub dedup_flush_every: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            target_dir: defaults::target_dir(),
            save_data: defaults::save_data(),
            save_html: false,
            dedup_flush_every: defaults::flush_every(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn base_url() -> String {
        "https://eur-lex.europa.eu".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; rv:108.0) Gecko/20100101 Firefox/108.0".into()
    }
    pub fn listing_timeout() -> u64 {
        30
    }
    pub fn document_timeout() -> u64 {
        120
    }
    pub fn max_retries() -> u32 {
        10
    }
    pub fn sleep_time() -> u64 {
        1000
    }
    pub fn workers() -> usize {
        2
    }

    // Filter defaults
    pub fn language() -> String {
        "en".into()
    }

    /// Act type codes from the origin's advanced search form.
    pub fn categories() -> Vec<String> {
        ["REG", "DIR", "DEC", "RECO", "OPIN"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    // Output defaults
    pub fn target_dir() -> String {
        "data".into()
    }
    pub fn save_data() -> bool {
        true
    }
    pub fn flush_every() -> usize {
        25
    }
}
