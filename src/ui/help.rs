//! Help overlay: keybinding table.
//!
//! Shows the actual bindings, including overrides from config.

use crate::app::App;
use ratatui::{
    layout::Constraint,
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Row, Table},
    Frame,
};

use super::helpers::centered_rect;

pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();
    let lines = app.keybindings.help_lines();

    // Rows + header + borders.
    let height = (lines.len() as u16).saturating_add(4);
    let overlay = centered_rect(area.width.saturating_sub(8).min(64), height, area);
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }

    f.render_widget(Clear, overlay);

    let rows: Vec<Row> = lines
        .into_iter()
        .map(|(keys, description)| {
            Row::new(vec![
                Span::styled(keys, app.palette.help_key),
                Span::raw(description),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(22), Constraint::Min(16)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.palette.panel_border)
                .title(" Help (? or Esc to close) "),
        )
        .header(
            Row::new(vec!["Key", "Action"])
                .style(
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::UNDERLINED),
                )
                .bottom_margin(1),
        );

    f.render_widget(table, overlay);
}
