//! Keybinding registry: maps key events to actions with config overrides.
use crate::nav::NavEvent;
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    PageDown,
    PageUp,
    JumpTop,
    JumpBottom,
    NextTab,
    PrevTab,
    /// Jump to the category with this 1-based ordinal.
    SelectTab(u8),
    Open,
    Refresh,
    ShowHelp,
    Dismiss,
    Summarize,
    /// Start (or cancel) typing a row number.
    StartJump,
    InputDigit(u8),
    InputBackspace,
    Confirm,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit",
            Self::NavDown => "Next entry",
            Self::NavUp => "Previous entry",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
            Self::JumpTop => "First entry",
            Self::JumpBottom => "Last entry",
            Self::NextTab => "Next category",
            Self::PrevTab => "Previous category",
            Self::SelectTab(_) => "Jump to category",
            Self::Open => "Open link in browser",
            Self::Refresh => "Refresh now",
            Self::ShowHelp => "Toggle help",
            Self::Dismiss => "Close popup / quit",
            Self::Summarize => "Summarize article",
            Self::StartJump => "Jump to row number",
            Self::InputDigit(_) => "Type row number",
            Self::InputBackspace => "Delete digit",
            Self::Confirm => "Go to row",
        }
    }

    /// The navigation input this action produces.
    pub fn nav_event(self) -> NavEvent {
        match self {
            Self::Quit => NavEvent::Quit,
            Self::NavDown => NavEvent::Down,
            Self::NavUp => NavEvent::Up,
            Self::PageDown => NavEvent::PageDown,
            Self::PageUp => NavEvent::PageUp,
            Self::JumpTop => NavEvent::Top,
            Self::JumpBottom => NavEvent::Bottom,
            Self::NextTab => NavEvent::NextTab,
            Self::PrevTab => NavEvent::PrevTab,
            Self::SelectTab(n) => NavEvent::SelectCategory(n as usize),
            Self::Open => NavEvent::Open,
            Self::Refresh => NavEvent::Refresh,
            Self::ShowHelp => NavEvent::Help,
            Self::Dismiss => NavEvent::Dismiss,
            Self::Summarize => NavEvent::Summarize,
            Self::StartJump => NavEvent::StartJump,
            Self::InputDigit(n) => NavEvent::Digit(n),
            Self::InputBackspace => NavEvent::Backspace,
            Self::Confirm => NavEvent::Confirm,
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    /// Error popup. Keys without a binding here dismiss it.
    Popup,
    /// Typing a row number after `:`.
    Jump,
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Terminals report BackTab and uppercase letters with SHIFT set; the
    /// registry stores them without it.
    fn normalized(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let modifiers = match code {
            KeyCode::BackTab | KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
            _ => modifiers,
        };
        Self::new(code, modifiers)
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "?"
/// - Named keys: "Enter", "Esc", "Tab", "BackTab", "Up", "Down", "PageUp", "Home"
/// - Modifier combos: "Ctrl+d"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        let c = chars.next()?;
        return chars.next().is_none().then(|| KeySpec::ctrl(c));
    }

    let named = match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "backtab" | "shift+tab" => Some(KeyCode::BackTab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),
        "home" => Some(KeyCode::Home),
        "end" => Some(KeyCode::End),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|rest| rest.parse::<u8>().ok())
    {
        return (1..=12).contains(&n).then(|| KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    let c = chars.next()?;
    chars
        .next()
        .is_none()
        .then(|| KeySpec::plain(KeyCode::Char(c)))
}

/// Format a KeySpec as a human-readable string for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "Shift+Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts; lookups
/// fall back to [`Context::Global`].
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings in registration order, for the help screen.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn register_defaults(&mut self) {
        use Action::*;
        let global: [(KeySpec, Action); 23] = [
            (KeySpec::plain(KeyCode::Char('j')), NavDown),
            (KeySpec::plain(KeyCode::Down), NavDown),
            (KeySpec::plain(KeyCode::Char('k')), NavUp),
            (KeySpec::plain(KeyCode::Up), NavUp),
            (KeySpec::ctrl('d'), PageDown),
            (KeySpec::plain(KeyCode::PageDown), PageDown),
            (KeySpec::ctrl('u'), PageUp),
            (KeySpec::plain(KeyCode::PageUp), PageUp),
            (KeySpec::plain(KeyCode::Char('g')), JumpTop),
            (KeySpec::plain(KeyCode::Home), JumpTop),
            (KeySpec::plain(KeyCode::Char('G')), JumpBottom),
            (KeySpec::plain(KeyCode::End), JumpBottom),
            (KeySpec::plain(KeyCode::Tab), NextTab),
            (KeySpec::plain(KeyCode::BackTab), PrevTab),
            (KeySpec::plain(KeyCode::Enter), Open),
            (KeySpec::plain(KeyCode::Char('o')), Open),
            (KeySpec::plain(KeyCode::Char('r')), Refresh),
            (KeySpec::plain(KeyCode::Char('s')), Summarize),
            (KeySpec::plain(KeyCode::Char(':')), StartJump),
            (KeySpec::plain(KeyCode::Char('?')), ShowHelp),
            (KeySpec::plain(KeyCode::Esc), Dismiss),
            (KeySpec::plain(KeyCode::Char('q')), Quit),
            (KeySpec::ctrl('c'), Quit),
        ];
        for (key, action) in global {
            self.bind(Context::Global, key, action);
        }

        for n in 1..=9u8 {
            let c = char::from(b'0' + n);
            self.bind(Context::Global, KeySpec::plain(KeyCode::Char(c)), SelectTab(n));
        }

        self.bind(Context::Popup, KeySpec::plain(KeyCode::Esc), Dismiss);
        self.bind(Context::Popup, KeySpec::plain(KeyCode::Enter), Dismiss);

        for n in 0..=9u8 {
            let c = char::from(b'0' + n);
            self.bind(Context::Jump, KeySpec::plain(KeyCode::Char(c)), InputDigit(n));
        }
        self.bind(Context::Jump, KeySpec::plain(KeyCode::Backspace), InputBackspace);
        self.bind(Context::Jump, KeySpec::plain(KeyCode::Enter), Confirm);
        self.bind(Context::Jump, KeySpec::plain(KeyCode::Esc), Dismiss);
        self.bind(Context::Jump, KeySpec::plain(KeyCode::Char(':')), StartJump);
    }

    /// Apply user overrides from the config `[keybindings]` table.
    ///
    /// Keys in the map are action names (e.g., "quit", "nav_down").
    /// Values are key strings (e.g., "q", "Ctrl+d", "F5"). An override
    /// replaces every default key of that action.
    ///
    /// Returns a list of warnings for unrecognized action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        // Sorted so conflicting overrides resolve the same way on every run.
        let mut overrides: Vec<_> = overrides.iter().collect();
        overrides.sort();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            for ctx in contexts {
                self.bindings
                    .retain(|(c, k, _)| !(*c == ctx && *k == key));
                self.bind(ctx, key, action);
            }

            tracing::info!(
                action = %action_name,
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    /// Look up the action for a given key in a given context.
    ///
    /// Tries the specific context first, then falls back to Global.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::normalized(code, modifiers);

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }
        if context != Context::Global {
            if let Some(&action) = self.lookup.get(&(Context::Global, key)) {
                return Some(action);
            }
        }
        None
    }

    /// Decode a key press into a navigation event.
    ///
    /// In the popup context every other key dismisses; quitting and
    /// refreshing still work.
    pub fn nav_event(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<NavEvent> {
        match (self.action_for_key(code, modifiers, context), context) {
            (Some(Action::Quit), _) => Some(NavEvent::Quit),
            (Some(Action::Refresh), Context::Popup) => Some(NavEvent::Refresh),
            (_, Context::Popup) => Some(NavEvent::Dismiss),
            (action, Context::Global | Context::Jump) => action.map(Action::nav_event),
        }
    }

    /// Bindings for the help screen: one line per action, keys joined.
    ///
    /// Digit bindings collapse into a single "1-9" line.
    pub fn help_lines(&self) -> Vec<(String, &'static str)> {
        let mut lines: Vec<(Action, Vec<String>)> = Vec::new();
        for (ctx, key, action) in &self.bindings {
            if *ctx != Context::Global {
                continue;
            }
            let action = match action {
                Action::SelectTab(_) => Action::SelectTab(0),
                other => *other,
            };
            let label = match action {
                Action::SelectTab(_) => "1-9".to_string(),
                _ => format_key(key),
            };
            match lines.iter_mut().find(|(a, _)| *a == action) {
                Some((_, keys)) => {
                    if !keys.contains(&label) {
                        keys.push(label);
                    }
                }
                None => lines.push((action, vec![label])),
            }
        }
        lines
            .into_iter()
            .map(|(action, keys)| (keys.join(" / "), action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name string (from config) into an Action.
fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "nav_down" | "down" => Some(Action::NavDown),
        "nav_up" | "up" => Some(Action::NavUp),
        "page_down" | "pagedown" => Some(Action::PageDown),
        "page_up" | "pageup" => Some(Action::PageUp),
        "top" | "jump_top" => Some(Action::JumpTop),
        "bottom" | "jump_bottom" => Some(Action::JumpBottom),
        "next_tab" | "nexttab" => Some(Action::NextTab),
        "prev_tab" | "prevtab" => Some(Action::PrevTab),
        "open" | "open_in_browser" => Some(Action::Open),
        "refresh" => Some(Action::Refresh),
        "help" | "show_help" => Some(Action::ShowHelp),
        "dismiss" | "back" => Some(Action::Dismiss),
        "summarize" | "summary" => Some(Action::Summarize),
        "jump" | "jump_to_row" => Some(Action::StartJump),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(reg: &KeybindingRegistry, code: KeyCode, mods: KeyModifiers) -> Option<NavEvent> {
        reg.nav_event(code, mods, Context::Global)
    }

    #[test]
    fn test_default_nav_keys() {
        let reg = KeybindingRegistry::new();
        let none = KeyModifiers::NONE;
        assert_eq!(nav(&reg, KeyCode::Char('j'), none), Some(NavEvent::Down));
        assert_eq!(nav(&reg, KeyCode::Down, none), Some(NavEvent::Down));
        assert_eq!(nav(&reg, KeyCode::Char('k'), none), Some(NavEvent::Up));
        assert_eq!(nav(&reg, KeyCode::Up, none), Some(NavEvent::Up));
        assert_eq!(nav(&reg, KeyCode::Char('g'), none), Some(NavEvent::Top));
        assert_eq!(nav(&reg, KeyCode::Char('r'), none), Some(NavEvent::Refresh));
        assert_eq!(nav(&reg, KeyCode::Char('o'), none), Some(NavEvent::Open));
        assert_eq!(nav(&reg, KeyCode::Enter, none), Some(NavEvent::Open));
        assert_eq!(nav(&reg, KeyCode::Char('?'), none), Some(NavEvent::Help));
        assert_eq!(nav(&reg, KeyCode::Esc, none), Some(NavEvent::Dismiss));
    }

    #[test]
    fn test_shift_is_ignored_for_chars_and_backtab() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            nav(&reg, KeyCode::Char('G'), KeyModifiers::SHIFT),
            Some(NavEvent::Bottom)
        );
        assert_eq!(
            nav(&reg, KeyCode::BackTab, KeyModifiers::SHIFT),
            Some(NavEvent::PrevTab)
        );
    }

    #[test]
    fn test_ctrl_modifiers() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            nav(&reg, KeyCode::Char('d'), KeyModifiers::CONTROL),
            Some(NavEvent::PageDown)
        );
        assert_eq!(
            nav(&reg, KeyCode::Char('u'), KeyModifiers::CONTROL),
            Some(NavEvent::PageUp)
        );
        assert_eq!(
            nav(&reg, KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(NavEvent::Quit)
        );
        // Plain 'd' is not bound.
        assert_eq!(nav(&reg, KeyCode::Char('d'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_digits_select_categories() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            nav(&reg, KeyCode::Char('1'), KeyModifiers::NONE),
            Some(NavEvent::SelectCategory(1))
        );
        assert_eq!(
            nav(&reg, KeyCode::Char('9'), KeyModifiers::NONE),
            Some(NavEvent::SelectCategory(9))
        );
        assert_eq!(nav(&reg, KeyCode::Char('0'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_popup_dismissed_by_any_key_except_quit() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            reg.nav_event(KeyCode::Char('x'), KeyModifiers::NONE, Context::Popup),
            Some(NavEvent::Dismiss)
        );
        assert_eq!(
            reg.nav_event(KeyCode::Char('j'), KeyModifiers::NONE, Context::Popup),
            Some(NavEvent::Dismiss)
        );
        assert_eq!(
            reg.nav_event(KeyCode::Char('q'), KeyModifiers::NONE, Context::Popup),
            Some(NavEvent::Quit)
        );
    }

    #[test]
    fn test_popup_passes_refresh_through() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            reg.nav_event(KeyCode::Char('r'), KeyModifiers::NONE, Context::Popup),
            Some(NavEvent::Refresh)
        );

        let mut reg = KeybindingRegistry::new();
        let mut overrides = HashMap::new();
        overrides.insert("refresh".to_string(), "F5".to_string());
        reg.apply_overrides(&overrides);
        assert_eq!(
            reg.nav_event(KeyCode::F(5), KeyModifiers::NONE, Context::Popup),
            Some(NavEvent::Refresh)
        );
        assert_eq!(
            reg.nav_event(KeyCode::Char('r'), KeyModifiers::NONE, Context::Popup),
            Some(NavEvent::Dismiss)
        );
    }

    #[test]
    fn test_summarize_and_jump_keys() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            nav(&reg, KeyCode::Char('s'), KeyModifiers::NONE),
            Some(NavEvent::Summarize)
        );
        assert_eq!(
            nav(&reg, KeyCode::Char(':'), KeyModifiers::SHIFT),
            Some(NavEvent::StartJump)
        );
    }

    #[test]
    fn test_jump_context_keys() {
        let reg = KeybindingRegistry::new();
        let jump = |code| reg.nav_event(code, KeyModifiers::NONE, Context::Jump);
        assert_eq!(jump(KeyCode::Char('0')), Some(NavEvent::Digit(0)));
        assert_eq!(jump(KeyCode::Char('7')), Some(NavEvent::Digit(7)));
        assert_eq!(jump(KeyCode::Backspace), Some(NavEvent::Backspace));
        assert_eq!(jump(KeyCode::Enter), Some(NavEvent::Confirm));
        assert_eq!(jump(KeyCode::Esc), Some(NavEvent::Dismiss));
        assert_eq!(jump(KeyCode::Char(':')), Some(NavEvent::StartJump));
        // Unbound keys fall back to the global map.
        assert_eq!(jump(KeyCode::Char('q')), Some(NavEvent::Quit));
        assert_eq!(jump(KeyCode::Char('j')), Some(NavEvent::Down));
    }

    #[test]
    fn test_unknown_key_returns_none() {
        let reg = KeybindingRegistry::new();
        assert_eq!(nav(&reg, KeyCode::F(12), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_apply_overrides_valid() {
        let mut reg = KeybindingRegistry::new();
        let mut overrides = HashMap::new();
        overrides.insert("refresh".to_string(), "F5".to_string());

        let warnings = reg.apply_overrides(&overrides);
        assert!(warnings.is_empty());
        assert_eq!(nav(&reg, KeyCode::Char('r'), KeyModifiers::NONE), None);
        assert_eq!(
            nav(&reg, KeyCode::F(5), KeyModifiers::NONE),
            Some(NavEvent::Refresh)
        );
    }

    #[test]
    fn test_override_replaces_all_default_keys() {
        let mut reg = KeybindingRegistry::new();
        let mut overrides = HashMap::new();
        overrides.insert("quit".to_string(), "Ctrl+q".to_string());
        reg.apply_overrides(&overrides);

        assert_eq!(nav(&reg, KeyCode::Char('q'), KeyModifiers::NONE), None);
        assert_eq!(nav(&reg, KeyCode::Char('c'), KeyModifiers::CONTROL), None);
        assert_eq!(
            nav(&reg, KeyCode::Char('q'), KeyModifiers::CONTROL),
            Some(NavEvent::Quit)
        );
    }

    #[test]
    fn test_apply_overrides_warnings() {
        let mut reg = KeybindingRegistry::new();
        let mut overrides = HashMap::new();
        overrides.insert("star".to_string(), "s".to_string());
        overrides.insert("quit".to_string(), "Ctrl+Alt+Q".to_string());

        let warnings = reg.apply_overrides(&overrides);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("Cannot parse key")));
        assert!(warnings.iter().any(|w| w.contains("Unknown action")));
    }

    #[test]
    fn test_parse_key_string() {
        assert_eq!(parse_key_string("Enter"), Some(KeySpec::plain(KeyCode::Enter)));
        assert_eq!(parse_key_string("esc"), Some(KeySpec::plain(KeyCode::Esc)));
        assert_eq!(parse_key_string("BackTab"), Some(KeySpec::plain(KeyCode::BackTab)));
        assert_eq!(parse_key_string("PageDown"), Some(KeySpec::plain(KeyCode::PageDown)));
        assert_eq!(parse_key_string("space"), Some(KeySpec::plain(KeyCode::Char(' '))));
        assert_eq!(parse_key_string("F12"), Some(KeySpec::plain(KeyCode::F(12))));
        assert_eq!(parse_key_string("F13"), None);
        assert_eq!(parse_key_string("Ctrl+d"), Some(KeySpec::ctrl('d')));
        assert_eq!(parse_key_string("?"), Some(KeySpec::plain(KeyCode::Char('?'))));
        assert_eq!(parse_key_string("ab"), None);
        assert_eq!(parse_key_string(""), None);
    }

    #[test]
    fn test_format_key_display() {
        assert_eq!(format_key(&KeySpec::plain(KeyCode::Char('q'))), "q");
        assert_eq!(format_key(&KeySpec::ctrl('d')), "Ctrl+d");
        assert_eq!(format_key(&KeySpec::plain(KeyCode::BackTab)), "Shift+Tab");
        assert_eq!(format_key(&KeySpec::plain(KeyCode::F(5))), "F5");
    }

    #[test]
    fn test_help_lines_group_keys() {
        let reg = KeybindingRegistry::new();
        let lines = reg.help_lines();
        let down = lines
            .iter()
            .find(|(_, desc)| *desc == "Next entry")
            .unwrap();
        assert_eq!(down.0, "j / Down");
        let digits: Vec<_> = lines
            .iter()
            .filter(|(_, desc)| *desc == "Jump to category")
            .collect();
        assert_eq!(digits.len(), 1);
        assert_eq!(digits[0].0, "1-9");
        assert!(lines.iter().any(|(keys, desc)| keys == ":" && *desc == "Jump to row number"));
        assert!(lines.iter().all(|(_, desc)| *desc != "Type row number"));
    }
}
