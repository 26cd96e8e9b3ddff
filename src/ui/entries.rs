use crate::app::App;
use crate::nav::{EntryView, ViewMode, ViewModel};
use crate::util::{fit_to_width, strip_control_chars, truncate_to_width};
use chrono::{DateTime, Local};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use super::helpers::format_entry_time;

/// Date column width: fits "Mar 08, 14:05".
const DATE_WIDTH: usize = 13;
/// Source/author column width.
const SOURCE_WIDTH: usize = 16;

/// Render the merged entry list of the active category.
pub fn render(f: &mut Frame, app: &App, vm: &ViewModel<'_>, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let palette = &app.palette;
    let title = match vm.category {
        Some(category) if vm.total_entries > 0 => format!(
            " {} ({}/{}) ",
            category.title,
            vm.scroll + vm.cursor_row.unwrap_or(0) + 1,
            vm.total_entries
        ),
        Some(category) => format!(" {} ", category.title),
        None => " rreader ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.panel_border)
        .title(title);

    if vm.entries.is_empty() {
        let text = if vm.loaded { "No entries" } else { "Loading..." };
        f.render_widget(
            Paragraph::new(text).style(palette.list_empty).block(block),
            area,
        );
        return;
    }

    let show_author = vm.category.is_some_and(|c| c.show_author);
    let inner_width = area.width.saturating_sub(2) as usize;
    let now = Local::now();
    // Row numbers are shown while typing a jump target.
    let number_width = matches!(vm.mode, ViewMode::Jump { .. })
        .then(|| vm.total_entries.to_string().len());

    let items: Vec<ListItem> = vm
        .entries
        .iter()
        .enumerate()
        .map(|(row, view)| {
            let number = number_width.map(|w| (vm.scroll + row + 1, w));
            let line = entry_line(app, view, show_author, number, inner_width, now);
            let item = ListItem::new(line);
            if vm.cursor_row == Some(row) {
                item.style(palette.entry_selected)
            } else {
                item
            }
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

fn entry_line(
    app: &App,
    view: &EntryView<'_>,
    show_author: bool,
    number: Option<(usize, usize)>,
    width: usize,
    now: DateTime<Local>,
) -> Line<'static> {
    let palette = &app.palette;
    let entry = view.entry;

    let date = format!(
        "{:>w$}",
        format_entry_time(entry.published_at, now),
        w = DATE_WIDTH
    );
    let source = match (&entry.author, show_author) {
        (Some(author), true) => author,
        _ => &entry.source_name,
    };
    let source = fit_to_width(source, SOURCE_WIDTH);
    let marker = if view.stale { "~" } else { " " };

    let number = number
        .map(|(n, w)| format!("{:>w$} ", n, w = w))
        .unwrap_or_default();

    // number + date + 2 spaces + source + marker + space
    let used = number.len() + DATE_WIDTH + 2 + SOURCE_WIDTH + 2;
    let title = strip_control_chars(view.title());
    let title = truncate_to_width(&title, width.saturating_sub(used)).into_owned();

    Line::from(vec![
        Span::styled(number, palette.help_key),
        Span::styled(date, palette.entry_date),
        Span::raw("  "),
        Span::styled(source, palette.entry_source),
        Span::styled(marker, palette.entry_stale),
        Span::raw(" "),
        Span::styled(title, palette.entry_title),
    ])
}
