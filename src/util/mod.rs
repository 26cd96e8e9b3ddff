//! Small helpers shared by the feed pipeline and the UI.
//!
//! - **URL validation**: shape checks for configured feeds, stricter checks
//!   for links taken from feed content before they are opened
//! - **Text processing**: control-sequence stripping and width-aware
//!   truncation for terminal output
//! - **Panic capture** for background tasks
//! - **HTTP client** shared by the fetcher and the translator

mod http;
mod panic;
mod text;
mod url_validator;

pub use http::build_http_client;
pub use panic::catch_task_panic;
pub use text::{display_width, fit_to_width, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_feed_url, validate_url_for_open, UrlValidationError};
