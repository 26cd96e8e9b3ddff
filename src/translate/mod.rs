//! Title translation and article summaries.
//!
//! [`TranslationCache`] memoizes a [`Translator`] per `(target language, text)`
//! and limits how many calls are in flight. It never fails: when the service
//! is slow or down the caller gets the original text back, and nothing is
//! cached so a later render retries.

mod gemini;
mod summary;

pub use gemini::{GeminiTranslator, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use summary::{clean_summary, SummarizeError, Summarizer, ARTICLE_TIMEOUT};

use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OnceCell, Semaphore};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Translation request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Translation timed out")]
    Timeout,
    #[error("Translation service returned status {0}")]
    HttpStatus(u16),
    #[error("Unexpected translation response: {0}")]
    InvalidResponse(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("No Gemini API key configured")]
    MissingApiKey,
}

impl TranslateError {
    /// Whether the same request might succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslateError::Network(_) | TranslateError::Timeout => true,
            TranslateError::HttpStatus(status) => *status == 429 || *status >= 500,
            TranslateError::InvalidResponse(_)
            | TranslateError::InsecureBaseUrl
            | TranslateError::MissingApiKey => false,
        }
    }
}

/// A translation backend.
pub trait Translator: Send + Sync {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_language: &'a str,
    ) -> BoxFuture<'a, Result<String, TranslateError>>;
}

type CacheKey = [u8; 32];

fn cache_key(text: &str, target_language: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(target_language.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hasher.finalize().into()
}

type InFlight = Mutex<HashMap<CacheKey, Arc<OnceCell<Option<Arc<str>>>>>>;

/// Removes a shared call's slot when its caller finishes or is cancelled.
///
/// A finished slot always goes. A cancelled slot goes only when no other
/// caller is still waiting on it.
struct InFlightGuard<'a> {
    in_flight: &'a InFlight,
    key: CacheKey,
    cell: Arc<OnceCell<Option<Arc<str>>>>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        let Some(current) = in_flight.get(&self.key) else {
            return;
        };
        if !Arc::ptr_eq(current, &self.cell) {
            return;
        }
        // The map and this guard hold the only references.
        if self.cell.initialized() || Arc::strong_count(&self.cell) <= 2 {
            in_flight.remove(&self.key);
        }
    }
}

/// Memoizing, concurrency-capped wrapper around a [`Translator`].
///
/// Entries are append-only for the life of the process. Concurrent requests
/// for the same key share one underlying call.
pub struct TranslationCache {
    translator: Arc<dyn Translator>,
    entries: RwLock<HashMap<CacheKey, Arc<str>>>,
    in_flight: InFlight,
    permits: Semaphore,
    timeout: Duration,
}

impl TranslationCache {
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 2;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self::with_limits(translator, Self::DEFAULT_MAX_IN_FLIGHT, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_limits(
        translator: Arc<dyn Translator>,
        max_in_flight: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            translator,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            permits: Semaphore::new(max_in_flight.max(1)),
            timeout,
        }
    }

    /// Cached translation, if any. Never blocks on the network.
    pub fn lookup(&self, text: &str, target_language: &str) -> Option<Arc<str>> {
        self.entries
            .read()
            .get(&cache_key(text, target_language))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Translate `text`, consulting the cache first.
    ///
    /// Returns the original text on any failure or timeout.
    pub async fn translate(&self, text: &str, target_language: &str) -> Arc<str> {
        let key = cache_key(text, target_language);
        if let Some(hit) = self.entries.read().get(&key) {
            return Arc::clone(hit);
        }
        if text.trim().is_empty() {
            return Arc::from(text);
        }

        let cell = {
            let mut in_flight = self.in_flight.lock();
            Arc::clone(in_flight.entry(key).or_default())
        };
        let guard = InFlightGuard {
            in_flight: &self.in_flight,
            key,
            cell,
        };

        let translated = guard
            .cell
            .get_or_init(|| self.call(key, text, target_language))
            .await
            .clone();
        drop(guard);

        translated.unwrap_or_else(|| Arc::from(text))
    }

    async fn call(&self, key: CacheKey, text: &str, target_language: &str) -> Option<Arc<str>> {
        // Another caller may have finished between our miss and getting here.
        if let Some(hit) = self.entries.read().get(&key) {
            return Some(Arc::clone(hit));
        }

        let Ok(_permit) = self.permits.acquire().await else {
            return None;
        };

        let result = tokio::time::timeout(
            self.timeout,
            self.translator.translate(text, target_language),
        )
        .await
        .unwrap_or(Err(TranslateError::Timeout));

        match result {
            Ok(translated) => {
                let translated = crate::util::strip_control_chars(translated.trim())
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                if translated.is_empty() {
                    tracing::debug!("Empty translation, keeping original title");
                    return None;
                }
                let translated: Arc<str> = Arc::from(translated);
                self.entries.write().insert(key, Arc::clone(&translated));
                Some(translated)
            }
            Err(e) => {
                tracing::debug!(error = %e, retryable = e.is_retryable(), "Translation failed");
                None
            }
        }
    }
}
