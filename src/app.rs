use crate::feed::Category;
use crate::keybindings::{Context, KeybindingRegistry};
use crate::nav::{self, Effect, NavEvent, NavigationState, ViewMode, ViewModel};
use crate::refresh::{RefreshEvent, RefreshHandle, RefreshRequest, SnapshotMap, SnapshotStore};
use crate::theme::ColorPalette;
use crate::translate::{Summarizer, TranslationCache};
use crate::util::validate_url_for_open;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// How long a status message stays visible.
const STATUS_TTL_SECS: u64 = 3;

// ============================================================================
// Background Events
// ============================================================================

/// Completion events from tasks spawned by the UI.
#[derive(Debug)]
pub enum AppEvent {
    /// A title translation finished. `translated` is `None` when the
    /// service failed and the original text should stay.
    TitleTranslated {
        original: Arc<str>,
        translated: Option<Arc<str>>,
    },
    /// An article summary finished, successfully or not.
    SummaryReady {
        url: Arc<str>,
        result: Result<String, String>,
    },
    /// A background task panicked.
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// Translation State
// ============================================================================

/// Lazy title translation bookkeeping.
pub struct Translation {
    pub cache: Arc<TranslationCache>,
    pub target_language: Arc<str>,
    /// Titles with a request in flight.
    pub pending: HashSet<Arc<str>>,
    /// Titles that failed since the last snapshot change; retried after the
    /// next one lands.
    pub failed: HashSet<Arc<str>>,
}

impl Translation {
    pub fn new(cache: Arc<TranslationCache>, target_language: &str) -> Self {
        Self {
            cache,
            target_language: Arc::from(target_language),
            pending: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    pub fn lookup(&self, title: &str) -> Option<Arc<str>> {
        self.cache.lookup(title, &self.target_language)
    }
}

// ============================================================================
// Summary State
// ============================================================================

/// Article summary backend plus the summaries produced this session.
pub struct Summaries {
    pub summarizer: Arc<dyn Summarizer>,
    pub target_language: Arc<str>,
    /// Successful summaries by article URL.
    pub done: HashMap<Arc<str>, Arc<str>>,
    /// URL waiting for the loop to spawn its request.
    pub queued: Option<Arc<str>>,
    /// URLs with a request in flight.
    pub pending: HashSet<Arc<str>>,
}

impl Summaries {
    pub fn new(summarizer: Arc<dyn Summarizer>, target_language: &str) -> Self {
        Self {
            summarizer,
            target_language: Arc::from(target_language),
            done: HashMap::new(),
            queued: None,
            pending: HashSet::new(),
        }
    }
}

// ============================================================================
// Application State
// ============================================================================

pub struct App {
    pub categories: Vec<Arc<Category>>,
    pub nav: NavigationState,
    /// Snapshot map the current frame is drawn from.
    pub snapshots: Arc<SnapshotMap>,
    store: SnapshotStore,
    refresh: Option<RefreshHandle>,
    pub translation: Option<Translation>,
    pub summaries: Option<Summaries>,
    /// Background tasks owned by the UI; aborted when the app is dropped.
    pub tasks: JoinSet<()>,
    pub keybindings: KeybindingRegistry,
    pub palette: ColorPalette,
    /// `(done, total)` of the running refresh cycle.
    pub refresh_progress: Option<(usize, usize)>,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    /// Latest cycle already reported as fully failed, per category.
    alerted: HashMap<Arc<str>, u64>,
}

impl App {
    /// Start on the first category. `categories` must not be empty.
    pub fn new(
        categories: Vec<Arc<Category>>,
        store: SnapshotStore,
        keybindings: KeybindingRegistry,
        palette: ColorPalette,
    ) -> Self {
        let active = categories
            .first()
            .map(|c| Arc::clone(&c.id))
            .unwrap_or_else(|| Arc::from(""));
        let snapshots = store.load();
        Self {
            categories,
            nav: NavigationState::new(active, 1),
            snapshots,
            store,
            refresh: None,
            translation: None,
            summaries: None,
            tasks: JoinSet::new(),
            keybindings,
            palette,
            refresh_progress: None,
            status_message: None,
            needs_redraw: true,
            alerted: HashMap::new(),
        }
    }

    pub fn with_refresh(mut self, handle: RefreshHandle) -> Self {
        self.refresh = Some(handle);
        self
    }

    pub fn with_translation(mut self, translation: Translation) -> Self {
        self.translation = Some(translation);
        self
    }

    pub fn with_summaries(mut self, summaries: Summaries) -> Self {
        self.summaries = Some(summaries);
        self
    }

    /// Run one event through the navigation state machine.
    pub fn apply(&mut self, event: NavEvent) -> Effect {
        let (next, effect) = nav::transition(&self.nav, event, &self.snapshots, &self.categories);
        if next != self.nav {
            self.needs_redraw = true;
        }
        self.nav = next;
        effect
    }

    /// Keybinding context for the current view mode.
    pub fn key_context(&self) -> Context {
        match self.nav.view_mode() {
            ViewMode::Error { .. } => Context::Popup,
            ViewMode::Jump { .. } => Context::Jump,
            ViewMode::List | ViewMode::Help | ViewMode::Summary { .. } => Context::Global,
        }
    }

    /// Tell the state machine how many list rows fit on screen.
    pub fn set_viewport_height(&mut self, height: usize) {
        if height.max(1) != self.nav.viewport_height() {
            self.apply(NavEvent::Resize(height));
        }
    }

    /// Pick up snapshots published since the last frame.
    ///
    /// Returns true when the map changed.
    pub fn sync_snapshots(&mut self) -> bool {
        let latest = self.store.load();
        if Arc::ptr_eq(&latest, &self.snapshots) {
            return false;
        }
        self.snapshots = latest;
        self.apply(NavEvent::SnapshotsChanged);
        if let Some(translation) = self.translation.as_mut() {
            translation.failed.clear();
        }
        self.check_alert();
        self.needs_redraw = true;
        true
    }

    /// Raise the error popup once per cycle when every source of the active
    /// category failed and nothing is cached.
    fn check_alert(&mut self) {
        let active = Arc::clone(self.nav.active_category());
        let Some(snapshot) = self.snapshots.get(&active) else {
            return;
        };
        let reported = self
            .alerted
            .get(&active)
            .is_some_and(|&cycle| cycle >= snapshot.cycle);
        if !snapshot.all_failed() || reported {
            return;
        }
        self.alerted.insert(Arc::clone(&active), snapshot.cycle);
        let title = self
            .categories
            .iter()
            .find(|c| c.id == active)
            .map_or(&*active, |c| c.title.as_str());
        tracing::warn!(category = %active, cycle = snapshot.cycle, "Every feed failed");
        let message = format!(
            "Could not load any feed in \"{}\".\nCheck your connection and press r to retry.",
            title
        );
        self.apply(NavEvent::Alert(message));
    }

    pub fn handle_refresh_event(&mut self, event: RefreshEvent) {
        match event {
            RefreshEvent::Started { total, .. } => {
                self.refresh_progress = Some((0, total));
            }
            RefreshEvent::Progress { done, total, .. } => {
                self.refresh_progress = Some((done, total));
            }
            RefreshEvent::Published { .. } => {
                self.sync_snapshots();
            }
            RefreshEvent::Finished { failed, .. } => {
                self.refresh_progress = None;
                self.sync_snapshots();
                if failed > 0 {
                    self.set_status(format!(
                        "{} feed{} failed to update",
                        failed,
                        if failed == 1 { "" } else { "s" }
                    ));
                }
            }
            RefreshEvent::Panicked { error } => {
                self.refresh_progress = None;
                self.set_status(format!("Refresh failed: {}", error));
            }
        }
        self.needs_redraw = true;
    }

    /// Ask the background loop for a refresh now.
    pub fn request_refresh(&mut self) {
        let Some(handle) = &self.refresh else {
            self.set_status("Refresh unavailable");
            return;
        };
        match handle.request_refresh() {
            RefreshRequest::Queued => self.set_status("Refreshing..."),
            RefreshRequest::AlreadyRunning => self.set_status("Refresh already in progress"),
            RefreshRequest::Stopped => {
                tracing::warn!("Refresh loop stopped");
                self.set_status("Refresh loop stopped");
            }
        }
    }

    /// Queue a summary of `url` for the popup that is now showing it.
    ///
    /// Answers at once from the session cache, or with an error when
    /// summaries are off or the link is unsafe to fetch.
    pub fn request_summary(&mut self, url: Arc<str>) {
        let Some(summaries) = self.summaries.as_mut() else {
            self.apply(NavEvent::SummaryReady {
                url,
                result: Err("Summaries need a Gemini API key".to_string()),
            });
            return;
        };

        if let Some(done) = summaries.done.get(&url) {
            let result = Ok(done.to_string());
            self.apply(NavEvent::SummaryReady { url, result });
            return;
        }

        if let Err(e) = validate_url_for_open(&url) {
            tracing::warn!(url = %url, error = %e, "Refusing to fetch article");
            self.apply(NavEvent::SummaryReady {
                url,
                result: Err(format!("Cannot fetch article: {}", e)),
            });
            return;
        }

        if !summaries.pending.contains(&url) {
            summaries.queued = Some(url);
        }
    }

    /// Record a finished summary and show it if its popup is still open.
    pub fn finish_summary(&mut self, url: Arc<str>, result: Result<String, String>) {
        if let Some(summaries) = self.summaries.as_mut() {
            summaries.pending.remove(&url);
            if let Ok(text) = &result {
                summaries
                    .done
                    .insert(Arc::clone(&url), Arc::from(text.as_str()));
            }
        }
        if let Err(e) = &result {
            tracing::debug!(url = %url, error = %e, "Summary failed");
        }
        self.apply(NavEvent::SummaryReady { url, result });
    }

    /// Stop background refresh and translation work.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.refresh.take() {
            handle.shutdown();
        }
        self.tasks.abort_all();
    }

    /// Build the render request for the current frame.
    pub fn view_model(&self) -> ViewModel<'_> {
        let translation = self.translation.as_ref();
        nav::view_model(&self.nav, &self.snapshots, &self.categories, |title| {
            translation.and_then(|t| t.lookup(title))
        })
    }

    /// Visible titles that have neither a translation nor a request in flight.
    pub fn untranslated_titles(&self) -> Vec<Arc<str>> {
        let Some(translation) = &self.translation else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        nav::visible_entries(&self.nav, &self.snapshots)
            .iter()
            .map(|e| &e.title)
            .filter(|title| {
                !translation.pending.contains(*title)
                    && !translation.failed.contains(*title)
                    && translation.lookup(title).is_none()
                    && seen.insert(Arc::clone(title))
            })
            .cloned()
            .collect()
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear the status message once it is older than three seconds.
    /// Returns true if a message was actually cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

// ============================================================================
// Tests
// ============================================================================
