//! Loader for the feeds file (`~/.rreader/feeds.json`).
//!
//! The file maps a category key to its tab title, its feeds and display flags:
//!
//! ```json
//! { "tech": { "title": "Tech", "feeds": { "Hacker News": "https://news.ycombinator.com/rss" } } }
//! ```
//!
//! Declaration order matters (tab order, digit shortcuts and dedup priority), so
//! objects are read through [`Ordered`] rather than a hash map.

use crate::feed::types::{Category, FeedSource};
use crate::util::{validate_feed_url, UrlValidationError};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Written to disk on first run when no feeds file exists.
pub const DEFAULT_FEEDS: &str = include_str!("../../assets/feeds.json");

const MAX_FILE_SIZE: u64 = 1_048_576;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to access feeds file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in feeds file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Feeds file too large: {0}")]
    TooLarge(String),

    #[error("Feeds file defines no categories")]
    Empty,

    #[error("Duplicate {kind} \"{name}\" in feeds file")]
    Duplicate { kind: &'static str, name: String },

    #[error("Invalid URL for feed \"{feed}\" in category \"{category}\": {source}")]
    InvalidFeedUrl {
        category: String,
        feed: String,
        #[source]
        source: UrlValidationError,
    },
}

/// A JSON object read as a list of key/value pairs in document order.
struct Ordered<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(pair) = map.next_entry::<String, T>()? {
                    pairs.push(pair);
                }
                Ok(Ordered(pairs))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

#[derive(Deserialize)]
struct RawCategory {
    #[serde(default)]
    title: Option<String>,
    feeds: Ordered<String>,
    #[serde(default)]
    show_author: bool,
}

/// The configured categories, in declaration order.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Arc<Category>>,
}

impl Catalog {
    /// Parse and validate feeds-file JSON.
    pub fn parse(json: &str) -> Result<Self, CatalogError> {
        let raw: Ordered<RawCategory> = serde_json::from_str(json)?;
        if raw.0.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen_categories = HashSet::new();
        let mut categories = Vec::with_capacity(raw.0.len());

        for (index, (key, raw_category)) in raw.0.into_iter().enumerate() {
            if !seen_categories.insert(key.clone()) {
                return Err(CatalogError::Duplicate {
                    kind: "category",
                    name: key,
                });
            }

            let id: Arc<str> = Arc::from(key.as_str());
            let mut seen_feeds = HashSet::new();
            let mut feeds = Vec::with_capacity(raw_category.feeds.0.len());

            for (order, (name, url)) in raw_category.feeds.0.into_iter().enumerate() {
                if !seen_feeds.insert(name.clone()) {
                    return Err(CatalogError::Duplicate {
                        kind: "feed",
                        name: format!("{}/{}", key, name),
                    });
                }
                let url = validate_feed_url(&url).map_err(|source| CatalogError::InvalidFeedUrl {
                    category: key.clone(),
                    feed: name.clone(),
                    source,
                })?;
                feeds.push(Arc::new(FeedSource {
                    name: Arc::from(name),
                    url: url.to_string(),
                    category_id: Arc::clone(&id),
                    order,
                }));
            }

            let title = raw_category
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| key.clone());

            categories.push(Arc::new(Category {
                id,
                title,
                ordinal: index + 1,
                show_author: raw_category.show_author,
                feeds,
            }));
        }

        Ok(Self { categories })
    }

    /// Load the feeds file at `path`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };

        let meta = std::fs::metadata(path).map_err(io_err)?;
        if meta.len() > MAX_FILE_SIZE {
            return Err(CatalogError::TooLarge(format!(
                "{} is {} bytes (max {} bytes)",
                path.display(),
                meta.len(),
                MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path).map_err(io_err)?;
        let catalog = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            categories = catalog.categories.len(),
            feeds = catalog.feed_count(),
            "Loaded feeds file"
        );
        Ok(catalog)
    }

    /// Load the feeds file, writing [`DEFAULT_FEEDS`] there first if it does
    /// not exist yet.
    pub fn load_or_init(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            let io_err = |source| CatalogError::Io {
                path: path.to_path_buf(),
                source,
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
            std::fs::write(path, DEFAULT_FEEDS).map_err(io_err)?;
            tracing::info!(path = %path.display(), "Wrote default feeds file");
        }
        Self::load(path)
    }

    pub fn categories(&self) -> &[Arc<Category>] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Arc<Category>> {
        self.categories.iter().find(|c| &*c.id == id)
    }

    /// Total number of feeds across all categories.
    pub fn feed_count(&self) -> usize {
        self.categories.iter().map(|c| c.feeds.len()).sum()
    }
}
