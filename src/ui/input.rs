//! Keyboard input handling.
//!
//! Keys are decoded through the keybinding registry into navigation events;
//! the state machine decides, and this module carries out the effect.

use crate::app::App;
use crate::nav::Effect;
use crate::util::validate_url_for_open;
use crossterm::event::{KeyCode, KeyModifiers};

use super::loop_runner::Action;

/// Handle one key press.
pub(super) fn handle_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Action {
    let Some(event) = app
        .keybindings
        .nav_event(code, modifiers, app.key_context())
    else {
        return Action::Continue;
    };

    tracing::trace!(?event, "Key event");
    match app.apply(event) {
        Effect::None => {}
        Effect::Quit => return Action::Quit,
        Effect::RequestRefresh => app.request_refresh(),
        Effect::NoLink => app.set_status("Entry has no link"),
        Effect::OpenLink(url) => open_link(app, &url),
        Effect::Summarize(url) => app.request_summary(url),
    }
    Action::Continue
}

fn open_link(app: &mut App, url: &str) {
    // Feed-provided links must not reach the system opener unchecked.
    let parsed = match validate_url_for_open(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Refusing to open link");
            app.set_status(format!("Cannot open link: {}", e));
            return;
        }
    };
    match open::that_detached(parsed.as_str()) {
        Ok(()) => app.set_status("Opening in browser..."),
        Err(e) => {
            tracing::warn!(url = %parsed, error = %e, "Failed to open browser");
            app.set_status(format!("Failed to open browser: {}", e));
        }
    }
}
