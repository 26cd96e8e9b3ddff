use crate::feed::types::{Entry, FeedSource};
use crate::util::strip_control_chars;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

/// Title used when a feed item only carries a link.
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The item has neither a title nor a link, so it can't be shown or opened.
    #[error("Entry has neither title nor link")]
    MalformedEntry,
}

/// Parse an RSS, Atom or JSON feed body.
///
/// `feed-rs` normally invents an id (a hash of link and title) for items that
/// have none. Here a missing id stays empty, so [`dedup_key`] can fall back to
/// the link and two feeds sharing an article by URL collapse into one entry.
pub fn parse_feed(body: &[u8]) -> Result<feed_rs::model::Feed, feed_rs::parser::ParseFeedError> {
    feed_rs::parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build()
        .parse(body)
}

/// Convert one parsed feed item into a canonical [`Entry`].
///
/// Items without a parseable date are stamped with `fetched_at` so they sort
/// deterministically instead of floating around between refreshes.
pub fn normalize(
    raw: &feed_rs::model::Entry,
    source: &FeedSource,
    fetched_at: DateTime<Utc>,
) -> Result<Entry, NormalizeError> {
    let title = raw
        .title
        .as_ref()
        .map(|t| clean_text(&t.content))
        .filter(|t| !t.is_empty());
    let link = raw
        .links
        .iter()
        .map(|l| l.href.trim())
        .find(|href| !href.is_empty())
        .map(str::to_string);

    if title.is_none() && link.is_none() {
        return Err(NormalizeError::MalformedEntry);
    }

    let title = title.unwrap_or_else(|| UNTITLED.to_string());
    let dedup_key = dedup_key(Some(raw.id.as_str()), link.as_deref(), &title, &source.name);
    let published_at = raw.published.or(raw.updated).unwrap_or(fetched_at);
    let author = raw
        .authors
        .iter()
        .map(|p| clean_text(&p.name))
        .find(|name| !name.is_empty())
        .map(Arc::from);

    Ok(Entry {
        dedup_key: Arc::from(dedup_key),
        title: Arc::from(title),
        link: link.map(Arc::from),
        published_at,
        source_name: Arc::clone(&source.name),
        source_order: source.order,
        category_id: Arc::clone(&source.category_id),
        author,
    })
}

/// Feed-provided id, else the link, else a hash of title and source.
pub fn dedup_key(existing: Option<&str>, link: Option<&str>, title: &str, source: &str) -> String {
    if let Some(id) = existing.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }
    if let Some(link) = link.map(str::trim).filter(|l| !l.is_empty()) {
        return link.to_string();
    }

    let input = format!("{}|{}", title, source);
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

/// Strip control sequences and collapse whitespace runs (titles often contain
/// hard line breaks from the feed's XML formatting).
fn clean_text(s: &str) -> String {
    strip_control_chars(s)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
