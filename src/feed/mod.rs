//! Feed pipeline: configuration, fetching, normalization and aggregation.
//!
//! - [`catalog`] - Load the categorized feeds file
//! - [`fetcher`] - HTTP retrieval with timeout, one retry and conditional requests
//! - [`normalizer`] - Turn parsed `feed-rs` items into canonical [`Entry`] values
//! - [`aggregator`] - Merge one category's results into an ordered snapshot
//!
//! ```ignore
//! use rreader::feed::{aggregate, Catalog, FeedFetcher};
//!
//! let catalog = Catalog::load_or_init(&path)?;
//! let fetcher = FeedFetcher::new(client);
//! let category = &catalog.categories()[0];
//! let mut results = Vec::new();
//! for source in &category.feeds {
//!     results.push(fetcher.fetch(source, None).await);
//! }
//! let snapshot = aggregate(category, &results, Utc::now(), 1);
//! ```

mod aggregator;
mod catalog;
mod fetcher;
mod normalizer;
mod types;

pub use aggregator::{aggregate, compare_entries};
pub use catalog::{Catalog, CatalogError, DEFAULT_FEEDS};
pub use fetcher::{FeedFetcher, FetchError};
pub(crate) use fetcher::read_limited_bytes;
pub use normalizer::{dedup_key, normalize, parse_feed, NormalizeError, UNTITLED};
pub use types::{
    Category, CategorySnapshot, Entry, FailureDescriptor, FeedHealth, FeedPayload, FeedSource,
    FetchOutcome, FetchResult, SourceHealth, SourceKey, Validator,
};
