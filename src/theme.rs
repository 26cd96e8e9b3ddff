//! Theme system for the TUI.
//!
//! Semantic color roles resolved to ratatui `Style` values. `ThemeVariant`
//! selects between the Dark and Light palettes.

use ratatui::style::{Color, Modifier, Style};

// ============================================================================
// Theme Variant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name from a string (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Variant named in config, falling back to Dark with a warning.
    pub fn from_config(name: &str) -> Self {
        Self::from_str_name(name).unwrap_or_else(|| {
            tracing::warn!(theme = %name, "Unknown theme, using dark");
            Self::Dark
        })
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// Every semantic UI role mapped to a `Style`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Tabs --
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub tab_failing: Style,

    // -- Entry list --
    pub entry_title: Style,
    pub entry_selected: Style,
    pub entry_date: Style,
    pub entry_source: Style,
    pub entry_stale: Style,
    pub list_empty: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub status_loading: Style,
    pub status_error: Style,
    pub panel_border: Style,
    pub help_key: Style,
    pub popup_error: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            tab_active: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            tab_inactive: Style::default().fg(Color::Gray),
            tab_failing: Style::default().fg(Color::Red),

            entry_title: Style::default(),
            entry_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            entry_date: Style::default().fg(Color::DarkGray),
            entry_source: Style::default().fg(Color::Cyan),
            entry_stale: Style::default().fg(Color::Yellow),
            list_empty: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            status_loading: Style::default().fg(Color::Yellow),
            status_error: Style::default().fg(Color::Red),
            panel_border: Style::default().fg(Color::DarkGray),
            help_key: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            popup_error: Style::default().fg(Color::Red),
        }
    }

    fn light() -> Self {
        Self {
            tab_active: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            tab_inactive: Style::default().fg(Color::DarkGray),
            tab_failing: Style::default().fg(Color::Red),

            entry_title: Style::default().fg(Color::Black),
            entry_selected: Style::default().bg(Color::Blue).fg(Color::White),
            entry_date: Style::default().fg(Color::DarkGray),
            entry_source: Style::default().fg(Color::Blue),
            entry_stale: Style::default().fg(Color::Magenta),
            list_empty: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            status_loading: Style::default().fg(Color::Magenta),
            status_error: Style::default().fg(Color::Red),
            panel_border: Style::default().fg(Color::Gray),
            help_key: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            popup_error: Style::default().fg(Color::Red),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
