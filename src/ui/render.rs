//! Render functions for the TUI.
//!
//! Lays out the tab bar, entry list and status bar, then draws the help,
//! summary or error overlay on top when the navigation state asks for one.

use crate::app::App;
use crate::nav::{SummaryBody, ViewMode};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::helpers::centered_rect;
use super::{entries, help, status, tabs};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 40;
pub(super) const MIN_HEIGHT: u16 = 8;

/// Main render function.
///
/// Takes `&mut App` because the list height fixes the navigation viewport.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    // List block has a border on each side.
    app.set_viewport_height(chunks[1].height.saturating_sub(2) as usize);

    let vm = app.view_model();
    tabs::render(f, app, &vm, chunks[0]);
    entries::render(f, app, &vm, chunks[1]);
    status::render(f, app, &vm, chunks[2]);

    match vm.mode {
        ViewMode::List | ViewMode::Jump { .. } => {}
        ViewMode::Help => help::render(f, app),
        ViewMode::Error { message } => render_error_popup(f, app, message),
        ViewMode::Summary {
            title,
            body,
            scroll,
            ..
        } => render_summary_popup(f, app, title, body, *scroll),
    }
}

/// Summary overlay covering 80% of the screen.
fn render_summary_popup(f: &mut Frame, app: &App, title: &str, body: &SummaryBody, scroll: usize) {
    let area = f.area();
    let overlay = centered_rect(area.width / 5 * 4, area.height / 5 * 4, area);
    if overlay.width < 20 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);
    let (text, style) = match body {
        SummaryBody::Loading => ("Summarizing...".to_string(), app.palette.status_loading),
        SummaryBody::Ready(summary) => (summary.clone(), app.palette.entry_title),
        SummaryBody::Failed(reason) => (
            format!("Could not summarize this article.\n\n{}", reason),
            app.palette.status_error,
        ),
    };

    let title = strip_control_chars(title);
    let title = truncate_to_width(&title, overlay.width.saturating_sub(4) as usize);
    let paragraph = Paragraph::new(text)
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.palette.panel_border)
                .title(format!(" {} ", title))
                .title_bottom(" [Esc] Close  [o] Open URL "),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0));
    f.render_widget(paragraph, overlay);
}

fn render_error_popup(f: &mut Frame, app: &App, message: &str) {
    let area = f.area();
    let width = 56u16.min(area.width.saturating_sub(4));
    let overlay = centered_rect(width, 7, area);
    if overlay.width < 10 || overlay.height < 5 {
        return;
    }

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(format!("{}\n\n(any key to dismiss)", message))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.palette.popup_error)
                .title(" Error "),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, overlay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Category, CategorySnapshot, Entry, FeedHealth, FeedSource, SourceHealth};
    use crate::keybindings::KeybindingRegistry;
    use crate::nav::NavEvent;
    use crate::refresh::SnapshotStore;
    use crate::theme::ThemeVariant;
    use chrono::{TimeZone, Utc};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app(entries: usize, health: FeedHealth) -> App {
        let source = Arc::new(FeedSource {
            name: Arc::from("Hacker News"),
            url: "https://example.com/feed".to_string(),
            category_id: Arc::from("tech"),
            order: 0,
        });
        let categories = vec![
            Arc::new(Category {
                id: Arc::from("tech"),
                title: "Tech".to_string(),
                ordinal: 1,
                show_author: false,
                feeds: vec![Arc::clone(&source)],
            }),
            Arc::new(Category {
                id: Arc::from("world"),
                title: "World".to_string(),
                ordinal: 2,
                show_author: false,
                feeds: Vec::new(),
            }),
        ];
        let entries: Vec<Entry> = (0..entries)
            .map(|i| Entry {
                dedup_key: Arc::from(format!("k{}", i)),
                title: Arc::from(format!("Headline number {}", i)),
                link: None,
                published_at: Utc.timestamp_opt(1_700_000_000 - i as i64 * 60, 0).unwrap(),
                source_name: Arc::from("Hacker News"),
                source_order: 0,
                category_id: Arc::from("tech"),
                author: None,
            })
            .collect();
        let store = SnapshotStore::new();
        store.publish(CategorySnapshot {
            category_id: Arc::from("tech"),
            feed_health: vec![SourceHealth {
                source,
                health,
                entry_count: entries.len(),
                malformed: 0,
            }],
            entries,
            last_refresh_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            cycle: 1,
        });
        let mut app = App::new(
            categories,
            store,
            KeybindingRegistry::new(),
            ThemeVariant::Dark.palette(),
        );
        app.sync_snapshots();
        app
    }

    /// Give the first entry of "tech" a link.
    fn set_link(app: &mut App, url: &Arc<str>) {
        let mut snapshots = (*app.snapshots).clone();
        if let Some(snapshot) = snapshots.get_mut("tech") {
            Arc::make_mut(snapshot).entries[0].link = Some(Arc::clone(url));
        }
        app.snapshots = Arc::new(snapshots);
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_renders_tabs_and_entries() {
        let mut app = app(3, FeedHealth::Ok);
        let screen = draw(&mut app, 80, 12);
        assert!(screen.contains("1 Tech"));
        assert!(screen.contains("2 World"));
        assert!(screen.contains("Headline number 0"));
        assert!(screen.contains("Hacker News"));
    }

    #[test]
    fn test_viewport_follows_list_height() {
        let mut app = app(30, FeedHealth::Ok);
        draw(&mut app, 80, 12);
        // 12 rows - tabs - status - 2 borders
        assert_eq!(app.nav.viewport_height(), 8);
    }

    #[test]
    fn test_too_small_terminal() {
        let mut app = app(1, FeedHealth::Ok);
        let screen = draw(&mut app, 30, 6);
        assert!(screen.contains("Too small") || screen.contains("too small"));
    }

    #[test]
    fn test_error_popup_and_help_overlay() {
        let mut app = app(0, FeedHealth::Ok);
        app.apply(NavEvent::Alert("Could not load any feed".to_string()));
        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("Error"));
        assert!(screen.contains("Could not load any feed"));

        app.apply(NavEvent::Dismiss);
        app.apply(NavEvent::Help);
        let screen = draw(&mut app, 80, 24);
        assert!(screen.contains("Help"));
        assert!(screen.contains("Refresh now"));
    }

    #[test]
    fn test_summary_popup_states() {
        let mut app = app(1, FeedHealth::Ok);
        let url: Arc<str> = Arc::from("https://example.com/k0");
        set_link(&mut app, &url);

        app.apply(NavEvent::Summarize);
        let screen = draw(&mut app, 80, 24);
        assert!(screen.contains("Headline number 0"));
        assert!(screen.contains("Summarizing..."));
        assert!(screen.contains("[o] Open URL"));

        app.apply(NavEvent::SummaryReady {
            url: Arc::clone(&url),
            result: Ok("- first point\n- second point".to_string()),
        });
        let screen = draw(&mut app, 80, 24);
        assert!(screen.contains("- first point"));
        assert!(screen.contains("- second point"));
    }

    #[test]
    fn test_jump_mode_numbers_rows_and_prompts() {
        let mut app = app(12, FeedHealth::Ok);
        app.apply(NavEvent::StartJump);
        app.apply(NavEvent::Digit(7));
        let screen = draw(&mut app, 100, 12);
        assert!(screen.contains(" 1 "));
        assert!(screen.contains(":7"));
    }

    #[test]
    fn test_unloaded_category_shows_loading() {
        let mut app = app(0, FeedHealth::Ok);
        app.apply(NavEvent::SelectCategory(2));
        let screen = draw(&mut app, 80, 12);
        assert!(screen.contains("Loading"));
    }
}
