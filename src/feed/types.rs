//! Core value types shared by the fetch, aggregate and navigation layers.
//!
//! Everything here is immutable once constructed. Text fields use `Arc<str>`
//! so snapshots can be cloned into render passes and background tasks without
//! copying the underlying strings.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A user-defined group of feeds, shown as one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Key from the feeds file (e.g. `"tech"`).
    pub id: Arc<str>,
    /// Tab label.
    pub title: String,
    /// 1-based declaration order; fixes tab order and digit shortcuts.
    pub ordinal: usize,
    /// Show the entry author instead of the source name in the list.
    pub show_author: bool,
    /// Feeds in declaration order.
    pub feeds: Vec<Arc<FeedSource>>,
}

/// One feed URL belonging to exactly one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    /// Display name from the feeds file.
    pub name: Arc<str>,
    pub url: String,
    pub category_id: Arc<str>,
    /// 0-based position inside the owning category. Lower wins dedup conflicts.
    pub order: usize,
}

impl FeedSource {
    /// Stable identity of a source across refresh cycles.
    pub fn key(&self) -> SourceKey {
        SourceKey {
            category_id: Arc::clone(&self.category_id),
            name: Arc::clone(&self.name),
        }
    }
}

/// Identity of a feed source: `(category, display name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey {
    pub category_id: Arc<str>,
    pub name: Arc<str>,
}

/// A canonical feed item.
///
/// Built by [`crate::feed::normalize`] and never mutated afterwards. Translated
/// titles live in the translation cache, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub dedup_key: Arc<str>,
    pub title: Arc<str>,
    pub link: Option<Arc<str>>,
    pub published_at: DateTime<Utc>,
    pub source_name: Arc<str>,
    /// Declaration order of the source inside its category.
    pub source_order: usize,
    pub category_id: Arc<str>,
    pub author: Option<Arc<str>>,
}

/// Cache validators returned by the server for conditional re-fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl Validator {
    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }
}

/// Raw parsed entries of one successful fetch, kept as last-known-good data.
#[derive(Debug, Clone)]
pub struct FeedPayload {
    pub entries: Arc<Vec<feed_rs::model::Entry>>,
    pub validator: Validator,
    /// Used as the publish date of entries that carry none.
    pub fetched_at: DateTime<Utc>,
}

/// Why a feed could not be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDescriptor {
    pub reason: String,
    /// Whether the last error was of a retryable kind (network, timeout, 5xx).
    pub transient: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Per-feed outcome of one fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Fresh body, or the previous payload after `304 Not Modified`.
    Ok(FeedPayload),
    /// Fetch failed after retries. `fallback` is the last successful payload.
    Failed {
        failure: FailureDescriptor,
        fallback: Option<FeedPayload>,
    },
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub source: Arc<FeedSource>,
    pub outcome: FetchOutcome,
}

/// Health of one source inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedHealth {
    Ok,
    /// Latest fetch failed; last-known-good entries are still shown.
    Stale { reason: String, since: DateTime<Utc> },
    /// Latest fetch failed and nothing was ever fetched.
    Error { reason: String, since: DateTime<Utc> },
}

impl FeedHealth {
    pub fn is_ok(&self) -> bool {
        matches!(self, FeedHealth::Ok)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, FeedHealth::Stale { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FeedHealth::Error { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedHealth::Ok => "ok",
            FeedHealth::Stale { .. } => "stale",
            FeedHealth::Error { .. } => "error",
        }
    }
}

/// Health record for one source, with diagnostics from the last aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHealth {
    pub source: Arc<FeedSource>,
    pub health: FeedHealth,
    /// Entries this source contributed before deduplication.
    pub entry_count: usize,
    /// Entries dropped by the normalizer.
    pub malformed: usize,
}

/// Immutable, fully merged view of one category.
#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    pub category_id: Arc<str>,
    pub entries: Vec<Entry>,
    pub last_refresh_at: DateTime<Utc>,
    /// One record per configured source, in declaration order.
    pub feed_health: Vec<SourceHealth>,
    /// Refresh cycle that produced this snapshot.
    pub cycle: u64,
}

impl CategorySnapshot {
    /// Health of the source with the given declaration order.
    pub fn health_of(&self, source_order: usize) -> Option<&FeedHealth> {
        self.feed_health
            .iter()
            .find(|h| h.source.order == source_order)
            .map(|h| &h.health)
    }

    /// Whether an entry comes from a source whose latest fetch failed.
    pub fn is_stale(&self, entry: &Entry) -> bool {
        self.health_of(entry.source_order)
            .is_some_and(FeedHealth::is_stale)
    }

    /// Number of sources whose latest fetch failed.
    pub fn failing_sources(&self) -> usize {
        self.feed_health.iter().filter(|h| !h.health.is_ok()).count()
    }

    /// True when every source failed and there is nothing to show.
    pub fn all_failed(&self) -> bool {
        !self.feed_health.is_empty()
            && self.entries.is_empty()
            && self.feed_health.iter().all(|h| !h.health.is_ok())
    }
}
