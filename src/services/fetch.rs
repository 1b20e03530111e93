// src/services/fetch.rs

//! HTTP fetch client with retry, linear backoff and jitter.
//!
//! The only component that touches the network. Every caller receives a
//! `FetchOutcome` value; no request failure is raised as an error.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Which endpoint class a request targets. Document pages on the origin are
/// far slower than listings, so each kind carries its own timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Listing,
    Document,
}

/// Terminal outcome of a fetch, after the retry policy has run its course.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response with its body
    Success { body: Vec<u8>, status: u16 },

    /// Retryable failure (429, 5xx, timeout, connection reset) that
    /// survived every attempt. The caller decides whether to stop the
    /// partition (listing) or skip the item (document).
    Transient { reason: String },

    /// Non-retryable failure: 404 and other client errors
    Permanent { reason: String },
}

/// Classification of a single attempt, before the retry policy applies.
enum Attempt {
    Done(FetchOutcome),
    Retry(String),
}

/// HTTP client wrapper applying the configured retry policy.
pub struct FetchClient {
    client: Client,
    listing_timeout: Duration,
    document_timeout: Duration,
    max_retries: u32,
    sleep_time: Duration,
}

impl FetchClient {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            listing_timeout: Duration::from_secs(config.listing_timeout_secs),
            document_timeout: Duration::from_secs(config.document_timeout_secs),
            max_retries: config.max_retries.max(1),
            sleep_time: Duration::from_millis(config.sleep_time_ms),
        })
    }

    /// Fetch a URL, retrying transient failures up to `max_retries` times.
    pub async fn fetch(&self, url: &str, kind: RequestKind) -> FetchOutcome {
        let mut last_reason = String::new();

        for attempt in 1..=self.max_retries {
            match self.attempt(url, kind).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(reason) => {
                    log::warn!(
                        "Transient failure for {} (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.max_retries,
                        reason
                    );
                    last_reason = reason;
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }

        log::error!("Retries exhausted for {}", url);
        FetchOutcome::Transient {
            reason: last_reason,
        }
    }

    async fn attempt(&self, url: &str, kind: RequestKind) -> Attempt {
        let timeout = match kind {
            RequestKind::Listing => self.listing_timeout,
            RequestKind::Document => self.document_timeout,
        };

        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    match response.bytes().await {
                        Ok(body) => Attempt::Done(FetchOutcome::Success {
                            body: body.to_vec(),
                            status: status.as_u16(),
                        }),
                        Err(e) => Attempt::Retry(format!("body read failed: {e}")),
                    }
                } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    Attempt::Retry(format!("HTTP {}", status.as_u16()))
                } else {
                    Attempt::Done(FetchOutcome::Permanent {
                        reason: format!("HTTP {}", status.as_u16()),
                    })
                }
            }
            Err(e) if e.is_timeout() => Attempt::Retry("request timeout".to_string()),
            Err(e) if e.is_connect() => Attempt::Retry(format!("connection failed: {e}")),
            Err(e) => Attempt::Retry(format!("network error: {e}")),
        }
    }

    /// Delay before the retry following attempt `n`: linear in the attempt
    /// number, plus up to 20% jitter so parallel workers don't hit the
    /// origin in lockstep.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.sleep_time.as_millis() as u64 * u64::from(attempt);
        let jitter = fastrand::u64(0..(base / 5).max(1));
        Duration::from_millis(base + jitter)
    }
}
