use crate::feed::normalizer::parse_feed;
use crate::feed::types::{
    FailureDescriptor, FeedPayload, FeedSource, FetchOutcome, FetchResult, Validator,
};
use chrono::Utc;
use futures::StreamExt;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One initial attempt plus one retry on transient failure.
const MAX_ATTEMPTS: u32 = 2;
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors from a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with a status we can't use
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// The attempt exceeded the per-request timeout
    #[error("Request timed out")]
    Timeout,
    /// Body could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Received fewer bytes than Content-Length announced
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

impl FetchError {
    /// Whether another attempt might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout | FetchError::IncompleteResponse { .. } => {
                true
            }
            FetchError::HttpStatus(code) => {
                *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(code)
            }
            FetchError::Parse(_) | FetchError::ResponseTooLarge => false,
        }
    }
}

enum Attempt {
    Fresh(FeedPayload),
    NotModified,
}

/// Retrieves and parses one feed at a time.
///
/// Stateless apart from the shared HTTP client: last-known-good payloads are
/// owned by the caller and passed in as `previous`, which both drives the
/// conditional request and becomes the fallback on failure.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    retry_backoff: Duration,
}

impl FeedFetcher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: Self::DEFAULT_TIMEOUT,
            retry_backoff: Self::DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Per-attempt timeout covering the request and the body download.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Fetch `source`, never failing as a whole.
    ///
    /// - `200` → fresh payload with the response's validators
    /// - `304` → `previous` unchanged
    /// - anything else, after at most one retry of a transient error →
    ///   [`FetchOutcome::Failed`] carrying `previous` as the fallback
    pub async fn fetch(
        &self,
        source: &Arc<FeedSource>,
        previous: Option<&FeedPayload>,
    ) -> FetchResult {
        let mut attempt = 1;

        let outcome = loop {
            match self.attempt(&source.url, previous).await {
                Ok(Attempt::Fresh(payload)) => break FetchOutcome::Ok(payload),
                Ok(Attempt::NotModified) => match previous {
                    Some(previous) => {
                        tracing::debug!(feed = %source.url, "Feed not modified");
                        break FetchOutcome::Ok(previous.clone());
                    }
                    // Unsolicited 304 with nothing to fall back on.
                    None => {
                        break self.failed(source, &FetchError::HttpStatus(304), None);
                    }
                },
                Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::debug!(
                        feed = %source.url,
                        error = %e,
                        attempt,
                        backoff_ms = self.retry_backoff.as_millis() as u64,
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                    attempt += 1;
                }
                Err(e) => break self.failed(source, &e, previous),
            }
        };

        FetchResult {
            source: Arc::clone(source),
            outcome,
        }
    }

    fn failed(
        &self,
        source: &FeedSource,
        error: &FetchError,
        previous: Option<&FeedPayload>,
    ) -> FetchOutcome {
        tracing::warn!(
            feed = %source.url,
            name = %source.name,
            error = %error,
            has_fallback = previous.is_some(),
            "Feed fetch failed"
        );
        FetchOutcome::Failed {
            failure: FailureDescriptor {
                reason: error.to_string(),
                transient: error.is_transient(),
                occurred_at: Utc::now(),
            },
            fallback: previous.cloned(),
        }
    }

    async fn attempt(
        &self,
        url: &str,
        previous: Option<&FeedPayload>,
    ) -> Result<Attempt, FetchError> {
        tokio::time::timeout(self.timeout, self.attempt_inner(url, previous))
            .await
            .map_err(|_| FetchError::Timeout)?
    }

    async fn attempt_inner(
        &self,
        url: &str,
        previous: Option<&FeedPayload>,
    ) -> Result<Attempt, FetchError> {
        let mut request = self.client.get(url);
        if let Some(validator) = previous.map(|p| &p.validator) {
            if let Some(etag) = &validator.etag {
                request = request.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = &validator.last_modified {
                request = request.header(IF_MODIFIED_SINCE, last_modified);
            }
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return Ok(Attempt::NotModified);
        }
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let validator = Validator {
            etag: header(ETAG),
            last_modified: header(LAST_MODIFIED),
        };

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
        let feed = parse_feed(bytes.as_slice()).map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(Attempt::Fresh(FeedPayload {
            entries: Arc::new(feed.entries),
            validator,
            fetched_at: Utc::now(),
        }))
    }
}

pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
