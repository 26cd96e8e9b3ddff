//! Merge per-feed results into one ordered, deduplicated category snapshot.
//!
//! [`aggregate`] is a pure function of its inputs. Results may arrive in
//! completion order; they are re-sorted by feed declaration order first, so
//! the same inputs always yield the same snapshot and a refresh never makes
//! the list jitter.

use crate::feed::normalizer::normalize;
use crate::feed::types::{
    Category, CategorySnapshot, Entry, FeedHealth, FetchOutcome, FetchResult, SourceHealth,
};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::sync::Arc;

/// Build the snapshot for `category` from the results of one refresh cycle.
///
/// Sources of the category with no result in `results` are reported as
/// [`FeedHealth::Error`]; results belonging to other categories are ignored.
pub fn aggregate(
    category: &Category,
    results: &[FetchResult],
    refreshed_at: DateTime<Utc>,
    cycle: u64,
) -> CategorySnapshot {
    let by_source: HashMap<usize, &FetchResult> = results
        .iter()
        .filter(|r| r.source.category_id == category.id)
        .map(|r| (r.source.order, r))
        .collect();

    let mut entries: Vec<Entry> = Vec::new();
    let mut index_of: HashMap<Arc<str>, usize> = HashMap::new();
    let mut feed_health = Vec::with_capacity(category.feeds.len());

    for source in &category.feeds {
        let Some(result) = by_source.get(&source.order) else {
            feed_health.push(SourceHealth {
                source: Arc::clone(source),
                health: FeedHealth::Error {
                    reason: "No result".to_string(),
                    since: refreshed_at,
                },
                entry_count: 0,
                malformed: 0,
            });
            continue;
        };

        let (payload, health) = match &result.outcome {
            FetchOutcome::Ok(payload) => (Some(payload), FeedHealth::Ok),
            FetchOutcome::Failed { failure, fallback } => {
                let health = if fallback.is_some() {
                    FeedHealth::Stale {
                        reason: failure.reason.clone(),
                        since: failure.occurred_at,
                    }
                } else {
                    FeedHealth::Error {
                        reason: failure.reason.clone(),
                        since: failure.occurred_at,
                    }
                };
                (fallback.as_ref(), health)
            }
        };

        let mut entry_count = 0;
        let mut malformed = 0;

        if let Some(payload) = payload {
            for raw in payload.entries.iter() {
                let entry = match normalize(raw, source, payload.fetched_at) {
                    Ok(entry) => entry,
                    Err(_) => {
                        malformed += 1;
                        continue;
                    }
                };
                entry_count += 1;

                match index_of.entry(Arc::clone(&entry.dedup_key)) {
                    MapEntry::Vacant(slot) => {
                        slot.insert(entries.len());
                        entries.push(entry);
                    }
                    MapEntry::Occupied(slot) => {
                        let existing = &mut entries[*slot.get()];
                        // Earlier-declared source always wins; inside one
                        // source the newer occurrence replaces the older.
                        if existing.source_order == entry.source_order
                            && entry.published_at > existing.published_at
                        {
                            *existing = entry;
                        }
                    }
                }
            }
        }

        if malformed > 0 {
            tracing::debug!(
                feed = %source.url,
                malformed,
                "Dropped malformed entries"
            );
        }

        feed_health.push(SourceHealth {
            source: Arc::clone(source),
            health,
            entry_count,
            malformed,
        });
    }

    entries.sort_by(compare_entries);

    CategorySnapshot {
        category_id: Arc::clone(&category.id),
        entries,
        last_refresh_at: refreshed_at,
        feed_health,
        cycle,
    }
}

/// Newest first, then feed declaration order, then title. The dedup key makes
/// the order total.
pub fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    b.published_at
        .cmp(&a.published_at)
        .then_with(|| a.source_order.cmp(&b.source_order))
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.dedup_key.cmp(&b.dedup_key))
}
