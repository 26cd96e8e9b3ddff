use crate::app::App;
use crate::nav::{ViewMode, ViewModel};
use crate::util::display_width;
use chrono::Local;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::borrow::Cow;

const HINTS: &str = "[j/k]move [Tab]category [o]pen [s]ummary [:]row [r]efresh [?]help [q]uit";

/// Render the status bar: the jump prompt, refresh progress, a status message
/// or key hints on the left, feed health of the active category on the right.
pub fn render(f: &mut Frame, app: &App, vm: &ViewModel<'_>, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let palette = &app.palette;
    let (left, left_style): (Cow<'_, str>, _) = if let ViewMode::Jump { input } = vm.mode {
        (
            Cow::Owned(format!(":{}", input)),
            palette.status_bar.patch(palette.help_key),
        )
    } else if let Some((done, total)) = app.refresh_progress {
        (
            Cow::Owned(format!("Refreshing... ({}/{})", done, total)),
            palette.status_bar.patch(palette.status_loading),
        )
    } else if let Some((msg, _)) = &app.status_message {
        (Cow::Borrowed(&**msg), palette.status_bar)
    } else {
        (Cow::Borrowed(HINTS), palette.status_bar)
    };

    let health = &vm.health;
    let right = match health.last_refresh_at {
        Some(at) => format!(
            "{} ok {} stale {} error | {} ",
            health.ok,
            health.stale,
            health.error,
            at.with_timezone(&Local).format("%H:%M")
        ),
        None => String::new(),
    };

    let width = area.width as usize;
    let pad = width.saturating_sub(display_width(&left) + display_width(&right));
    let right_style = if health.error > 0 {
        palette.status_bar.patch(palette.status_error)
    } else {
        palette.status_bar
    };

    let line = Line::from(vec![
        Span::styled(left, left_style),
        Span::styled(" ".repeat(pad), palette.status_bar),
        Span::styled(right, right_style),
    ]);
    f.render_widget(Paragraph::new(line).style(palette.status_bar), area);
}
