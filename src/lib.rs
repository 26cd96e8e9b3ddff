//! Terminal RSS aggregator.
//!
//! Feeds are grouped into categories; each category's feeds are fetched
//! concurrently, merged into one deduplicated, date-ordered list and shown as
//! a tab. Headlines are optionally translated and cached for the session.

pub mod app;
pub mod config;
pub mod feed;
pub mod keybindings;
pub mod nav;
pub mod refresh;
pub mod theme;
pub mod translate;
pub mod ui;
pub mod util;
