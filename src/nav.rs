//! Navigation state machine.
//!
//! [`transition`] is a pure function: it takes the current state, one input
//! event and the snapshots the UI is looking at, and returns the next state
//! plus an [`Effect`] for the caller to perform. Nothing here touches the
//! terminal or the network.

use crate::feed::{Category, CategorySnapshot, Entry, FeedHealth};
use crate::refresh::SnapshotMap;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Input events, already decoded from raw keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    Up,
    Down,
    PageUp,
    PageDown,
    Top,
    Bottom,
    /// Activate the category with this 1-based ordinal.
    SelectCategory(usize),
    NextTab,
    PrevTab,
    Open,
    Refresh,
    Help,
    Dismiss,
    Quit,
    /// Summarize the entry under the cursor.
    Summarize,
    /// A summary request finished.
    SummaryReady {
        url: Arc<str>,
        result: Result<String, String>,
    },
    /// Start typing a row number.
    StartJump,
    Digit(u8),
    Backspace,
    Confirm,
    /// Number of entry rows the list can show.
    Resize(usize),
    SnapshotsChanged,
    /// Show a blocking error message (e.g. every feed failed).
    Alert(String),
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    OpenLink(Arc<str>),
    /// `Open` on an entry without a link (or an empty list).
    NoLink,
    RequestRefresh,
    /// Fetch and summarize this article.
    Summarize(Arc<str>),
    Quit,
}

/// Longest row number accepted in jump mode.
pub const MAX_JUMP_DIGITS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryBody {
    Loading,
    Ready(String),
    Failed(String),
}

impl SummaryBody {
    fn line_count(&self) -> usize {
        match self {
            SummaryBody::Ready(text) => text.lines().count(),
            SummaryBody::Loading | SummaryBody::Failed(_) => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewMode {
    List,
    Help,
    Error {
        message: String,
    },
    /// Typing a 1-based row number.
    Jump {
        input: String,
    },
    Summary {
        title: Arc<str>,
        url: Arc<str>,
        body: SummaryBody,
        scroll: usize,
    },
}

/// Cursor memory of one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub cursor: usize,
    /// Index of the first visible row.
    pub scroll: usize,
    /// Dedup key of the entry under the cursor, used to follow it across
    /// snapshot swaps.
    pub anchor: Option<Arc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    active: Arc<str>,
    positions: HashMap<Arc<str>, Position>,
    view_mode: ViewMode,
    viewport_height: usize,
}

impl NavigationState {
    /// Start on `active` with an empty list memory.
    pub fn new(active: Arc<str>, viewport_height: usize) -> Self {
        Self {
            active,
            positions: HashMap::new(),
            view_mode: ViewMode::List,
            viewport_height: viewport_height.max(1),
        }
    }

    pub fn active_category(&self) -> &Arc<str> {
        &self.active
    }

    pub fn view_mode(&self) -> &ViewMode {
        &self.view_mode
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    /// Remembered position of `category_id` (default when never visited).
    pub fn position(&self, category_id: &str) -> Position {
        self.positions.get(category_id).cloned().unwrap_or_default()
    }

    pub fn cursor(&self) -> usize {
        self.positions.get(&self.active).map_or(0, |p| p.cursor)
    }

    pub fn scroll(&self) -> usize {
        self.positions.get(&self.active).map_or(0, |p| p.scroll)
    }

    fn active_position_mut(&mut self) -> &mut Position {
        self.positions.entry(Arc::clone(&self.active)).or_default()
    }
}

fn entries_of<'a>(snapshots: &'a SnapshotMap, category_id: &str) -> &'a [Entry] {
    snapshots
        .get(category_id)
        .map(|s| s.entries.as_slice())
        .unwrap_or(&[])
}

/// Clamp the cursor into the list, refresh the anchor and make the scroll
/// window contain the cursor.
fn settle(position: &mut Position, entries: &[Entry], height: usize) {
    let len = entries.len();
    position.cursor = if len == 0 {
        0
    } else {
        position.cursor.min(len - 1)
    };
    position.anchor = entries
        .get(position.cursor)
        .map(|e| Arc::clone(&e.dedup_key));

    if position.cursor < position.scroll {
        position.scroll = position.cursor;
    } else if position.cursor >= position.scroll + height {
        position.scroll = position.cursor + 1 - height;
    }
    position.scroll = position.scroll.min(len.saturating_sub(height));
}

/// Move the remembered cursor back onto its anchored entry if it survived
/// the snapshot swap.
fn reanchor(position: &mut Position, entries: &[Entry]) {
    if let Some(anchor) = &position.anchor {
        if let Some(index) = entries.iter().position(|e| &e.dedup_key == anchor) {
            position.cursor = index;
        }
    }
}

/// Apply one event.
pub fn transition(
    state: &NavigationState,
    event: NavEvent,
    snapshots: &SnapshotMap,
    categories: &[Arc<Category>],
) -> (NavigationState, Effect) {
    let mut next = state.clone();
    let mut effect = Effect::None;

    match (&state.view_mode, event) {
        (_, NavEvent::Quit) => return (next, Effect::Quit),

        (_, NavEvent::Resize(height)) => {
            next.viewport_height = height.max(1);
            let height = next.viewport_height;
            for (id, position) in next.positions.iter_mut() {
                settle(position, entries_of(snapshots, id), height);
            }
        }

        (_, NavEvent::SnapshotsChanged) => {
            let height = next.viewport_height;
            for (id, position) in next.positions.iter_mut() {
                let entries = entries_of(snapshots, id);
                reanchor(position, entries);
                settle(position, entries, height);
            }
        }

        (_, NavEvent::Alert(message)) => next.view_mode = ViewMode::Error { message },

        (_, NavEvent::SummaryReady { url, result }) => {
            if let ViewMode::Summary {
                url: shown,
                body: body @ SummaryBody::Loading,
                ..
            } = &mut next.view_mode
            {
                if *shown == url {
                    *body = match result {
                        Ok(text) => SummaryBody::Ready(text),
                        Err(message) => SummaryBody::Failed(message),
                    };
                }
            }
        }

        (ViewMode::Error { .. }, NavEvent::Refresh) => {
            next.view_mode = ViewMode::List;
            effect = Effect::RequestRefresh;
        }
        // Any other key dismisses the error popup.
        (ViewMode::Error { .. }, _) => next.view_mode = ViewMode::List,

        (ViewMode::Help, NavEvent::Help | NavEvent::Dismiss) => next.view_mode = ViewMode::List,
        (ViewMode::Help, _) => {}

        (ViewMode::Jump { .. }, event) => jump_event(&mut next, event, snapshots),

        (ViewMode::Summary { .. }, event) => effect = summary_event(&mut next, event),

        (ViewMode::List, event) => {
            effect = list_event(&mut next, event, snapshots, categories);
        }
    }

    let height = next.viewport_height;
    let entries = entries_of(snapshots, &next.active);
    settle(next.active_position_mut(), entries, height);

    (next, effect)
}

fn list_event(
    state: &mut NavigationState,
    event: NavEvent,
    snapshots: &SnapshotMap,
    categories: &[Arc<Category>],
) -> Effect {
    let entries = entries_of(snapshots, &state.active);
    let last = entries.len().saturating_sub(1);
    let height = state.viewport_height;

    match event {
        NavEvent::Up => move_cursor(state, |c| c.saturating_sub(1)),
        NavEvent::Down => move_cursor(state, |c| (c + 1).min(last)),
        NavEvent::PageUp => move_cursor(state, |c| c.saturating_sub(height)),
        NavEvent::PageDown => move_cursor(state, |c| (c + height).min(last)),
        NavEvent::Top => move_cursor(state, |_| 0),
        NavEvent::Bottom => move_cursor(state, |_| last),

        NavEvent::NextTab | NavEvent::PrevTab => {
            if let Some(index) = categories.iter().position(|c| c.id == state.active) {
                let len = categories.len();
                let target = if event == NavEvent::NextTab {
                    (index + 1) % len
                } else {
                    (index + len - 1) % len
                };
                state.active = Arc::clone(&categories[target].id);
            } else if let Some(first) = categories.first() {
                state.active = Arc::clone(&first.id);
            }
        }

        NavEvent::SelectCategory(ordinal) => {
            if let Some(category) = categories.iter().find(|c| c.ordinal == ordinal) {
                state.active = Arc::clone(&category.id);
            }
        }

        NavEvent::Open => {
            return match entries.get(state.cursor()).and_then(|e| e.link.as_ref()) {
                Some(link) => Effect::OpenLink(Arc::clone(link)),
                None => Effect::NoLink,
            };
        }

        NavEvent::Summarize => {
            let Some(entry) = entries.get(state.cursor()) else {
                return Effect::NoLink;
            };
            let Some(link) = &entry.link else {
                return Effect::NoLink;
            };
            state.view_mode = ViewMode::Summary {
                title: Arc::clone(&entry.title),
                url: Arc::clone(link),
                body: SummaryBody::Loading,
                scroll: 0,
            };
            return Effect::Summarize(Arc::clone(link));
        }

        NavEvent::StartJump => {
            state.view_mode = ViewMode::Jump {
                input: String::new(),
            }
        }

        NavEvent::Refresh => return Effect::RequestRefresh,
        NavEvent::Help => state.view_mode = ViewMode::Help,
        // Esc on the plain list leaves the program.
        NavEvent::Dismiss => return Effect::Quit,

        NavEvent::Quit
        | NavEvent::Resize(_)
        | NavEvent::SnapshotsChanged
        | NavEvent::Alert(_)
        | NavEvent::SummaryReady { .. }
        | NavEvent::Digit(_)
        | NavEvent::Backspace
        | NavEvent::Confirm => {}
    }

    Effect::None
}

fn jump_event(state: &mut NavigationState, event: NavEvent, snapshots: &SnapshotMap) {
    let ViewMode::Jump { input } = &mut state.view_mode else {
        return;
    };

    match event {
        NavEvent::Digit(digit) if digit <= 9 => {
            if input.len() < MAX_JUMP_DIGITS {
                input.push(char::from(b'0' + digit));
            }
        }
        NavEvent::Backspace => {
            if input.pop().is_none() {
                state.view_mode = ViewMode::List;
            }
        }
        NavEvent::Confirm => {
            let target = input.parse::<usize>().ok();
            state.view_mode = ViewMode::List;
            let len = entries_of(snapshots, &state.active).len();
            if let Some(row) = target.filter(|row| (1..=len).contains(row)) {
                state.active_position_mut().cursor = row - 1;
            }
        }
        NavEvent::StartJump | NavEvent::Dismiss => state.view_mode = ViewMode::List,
        _ => {}
    }
}

fn summary_event(state: &mut NavigationState, event: NavEvent) -> Effect {
    let height = state.viewport_height;
    let ViewMode::Summary {
        url, body, scroll, ..
    } = &mut state.view_mode
    else {
        return Effect::None;
    };
    let last = body.line_count().saturating_sub(1);

    match event {
        NavEvent::Up => *scroll = scroll.saturating_sub(1),
        NavEvent::Down => *scroll = (*scroll + 1).min(last),
        NavEvent::PageUp => *scroll = scroll.saturating_sub(height),
        NavEvent::PageDown => *scroll = (*scroll + height).min(last),
        NavEvent::Top => *scroll = 0,
        NavEvent::Bottom => *scroll = last,
        NavEvent::Open => {
            let link = Arc::clone(url);
            state.view_mode = ViewMode::List;
            return Effect::OpenLink(link);
        }
        NavEvent::Summarize | NavEvent::Dismiss => state.view_mode = ViewMode::List,
        _ => {}
    }
    Effect::None
}

fn move_cursor(state: &mut NavigationState, f: impl FnOnce(usize) -> usize) {
    let position = state.active_position_mut();
    position.cursor = f(position.cursor);
}

// ============================================================================
// View model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabView {
    pub category_id: Arc<str>,
    pub title: String,
    pub ordinal: usize,
    pub active: bool,
    pub entry_count: usize,
    /// Sources whose last fetch failed.
    pub failing: usize,
}

/// One visible row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView<'a> {
    pub entry: &'a Entry,
    pub translated_title: Option<Arc<str>>,
    /// Entry comes from a source whose latest fetch failed.
    pub stale: bool,
}

impl EntryView<'_> {
    /// Translated title when available, else the original.
    pub fn title(&self) -> &str {
        self.translated_title.as_deref().unwrap_or(&self.entry.title)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthSummary {
    pub total: usize,
    pub ok: usize,
    pub stale: usize,
    pub error: usize,
    pub last_refresh_at: Option<DateTime<Utc>>,
}

impl HealthSummary {
    fn of(snapshot: Option<&CategorySnapshot>) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::default();
        };
        let mut summary = Self {
            total: snapshot.feed_health.len(),
            last_refresh_at: Some(snapshot.last_refresh_at),
            ..Self::default()
        };
        for record in &snapshot.feed_health {
            match record.health {
                FeedHealth::Ok => summary.ok += 1,
                FeedHealth::Stale { .. } => summary.stale += 1,
                FeedHealth::Error { .. } => summary.error += 1,
            }
        }
        summary
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewModel<'a> {
    pub tabs: Vec<TabView>,
    pub category: Option<&'a Category>,
    /// Only the rows inside the viewport.
    pub entries: Vec<EntryView<'a>>,
    /// Cursor row relative to `entries`, `None` for an empty list.
    pub cursor_row: Option<usize>,
    pub scroll: usize,
    pub total_entries: usize,
    /// False until the first snapshot of the active category lands.
    pub loaded: bool,
    pub health: HealthSummary,
    pub mode: &'a ViewMode,
}

/// Entries of the active category that fit in the viewport.
pub fn visible_entries<'a>(state: &NavigationState, snapshots: &'a SnapshotMap) -> &'a [Entry] {
    let entries = entries_of(snapshots, &state.active);
    let start = state.scroll().min(entries.len());
    let end = (start + state.viewport_height).min(entries.len());
    &entries[start..end]
}

/// Build the render request. `translated` looks up cached translations
/// without blocking.
pub fn view_model<'a>(
    state: &'a NavigationState,
    snapshots: &'a SnapshotMap,
    categories: &'a [Arc<Category>],
    translated: impl Fn(&str) -> Option<Arc<str>>,
) -> ViewModel<'a> {
    let tabs = categories
        .iter()
        .map(|c| {
            let snapshot = snapshots.get(&c.id);
            TabView {
                category_id: Arc::clone(&c.id),
                title: c.title.clone(),
                ordinal: c.ordinal,
                active: c.id == state.active,
                entry_count: snapshot.map_or(0, |s| s.entries.len()),
                failing: snapshot.map_or(0, |s| s.failing_sources()),
            }
        })
        .collect();

    let snapshot = snapshots.get(&state.active).map(Arc::as_ref);
    let visible = visible_entries(state, snapshots);
    let entries = visible
        .iter()
        .map(|entry| EntryView {
            entry,
            translated_title: translated(&entry.title),
            stale: snapshot.is_some_and(|s| s.is_stale(entry)),
        })
        .collect::<Vec<_>>();

    let total_entries = snapshot.map_or(0, |s| s.entries.len());
    let cursor_row = (total_entries > 0).then(|| state.cursor().saturating_sub(state.scroll()));

    ViewModel {
        tabs,
        category: categories
            .iter()
            .find(|c| c.id == state.active)
            .map(Arc::as_ref),
        entries,
        cursor_row,
        scroll: state.scroll(),
        total_entries,
        loaded: snapshot.is_some(),
        health: HealthSummary::of(snapshot),
        mode: &state.view_mode,
    }
}
