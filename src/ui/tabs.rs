use crate::app::App;
use crate::nav::ViewModel;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Render the category tab bar: `1 Tech  2 World ...`, failing sources
/// flagged with `!`.
pub fn render(f: &mut Frame, app: &App, vm: &ViewModel<'_>, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let palette = &app.palette;
    let mut spans = Vec::with_capacity(vm.tabs.len() * 3);
    for tab in &vm.tabs {
        let style = if tab.active {
            palette.tab_active
        } else {
            palette.tab_inactive
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!("{} {}", tab.ordinal, tab.title), style));
        if tab.failing > 0 {
            spans.push(Span::styled("!", palette.tab_failing));
        }
        spans.push(Span::raw(" "));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
