//! Terminal User Interface module.
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Key presses to navigation events and their effects
//! - `events` - Background task event processing
//! - `render` - Frame layout and popups
//! - `helpers` - Task spawning and small formatting helpers
//! - `tabs` - Category tab bar
//! - `entries` - Merged entry list
//! - `status` - Status bar
//! - `help` - Keybinding overlay

mod entries;
mod events;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod status;
mod tabs;

pub use loop_runner::{run, Action};
