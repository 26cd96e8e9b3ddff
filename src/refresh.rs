//! Refresh orchestration.
//!
//! A refresh cycle fetches every feed of the requested categories through one
//! `buffer_unordered` pool, aggregates a category as soon as its last feed
//! resolves and publishes the snapshot into the [`SnapshotStore`] by swapping
//! the whole map. Readers clone the current `Arc` and never see a half-built
//! category.
//!
//! Cycles are numbered. Starting a cycle aborts still-running fetches of older
//! cycles for the same categories, and the store refuses a snapshot whose
//! cycle is older than the one it already holds.

use crate::feed::{
    aggregate, Category, CategorySnapshot, FeedFetcher, FeedPayload, FeedSource, FetchOutcome,
    FetchResult, SourceKey,
};
use crate::util::catch_task_panic;
use chrono::Utc;
use futures::future::{AbortHandle, Abortable, Aborted};
use futures::stream::{self, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

pub type SnapshotMap = HashMap<Arc<str>, Arc<CategorySnapshot>>;

// ============================================================================
// Snapshot Store
// ============================================================================

/// Shared, atomically swapped map of the latest snapshot per category.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Arc<SnapshotMap>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current map. Cheap: clones one `Arc`.
    pub fn load(&self) -> Arc<SnapshotMap> {
        Arc::clone(&self.inner.read())
    }

    pub fn get(&self, category_id: &str) -> Option<Arc<CategorySnapshot>> {
        self.inner.read().get(category_id).cloned()
    }

    /// Publish `snapshot` unless the store already holds one from the same or
    /// a newer cycle. Returns the published snapshot.
    pub fn publish(&self, snapshot: CategorySnapshot) -> Option<Arc<CategorySnapshot>> {
        let mut guard = self.inner.write();
        if let Some(existing) = guard.get(&snapshot.category_id) {
            if existing.cycle >= snapshot.cycle {
                tracing::debug!(
                    category = %snapshot.category_id,
                    cycle = snapshot.cycle,
                    current = existing.cycle,
                    "Discarding snapshot from an older cycle"
                );
                return None;
            }
        }

        let snapshot = Arc::new(snapshot);
        let mut next = SnapshotMap::clone(&guard);
        next.insert(Arc::clone(&snapshot.category_id), Arc::clone(&snapshot));
        *guard = Arc::new(next);
        Some(snapshot)
    }
}

// ============================================================================
// Last-known-good cache
// ============================================================================

/// Last successful payload per feed source.
///
/// Feeds conditional requests and serves as the fallback when a fetch fails.
/// Entries are replaced on the next success and never expire otherwise.
#[derive(Debug, Default)]
pub struct FeedCache {
    payloads: Mutex<HashMap<SourceKey, FeedPayload>>,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SourceKey) -> Option<FeedPayload> {
        self.payloads.lock().get(key).cloned()
    }

    /// Store `payload` unless a payload fetched later is already cached.
    pub fn store(&self, key: SourceKey, payload: FeedPayload) {
        let mut payloads = self.payloads.lock();
        match payloads.get(&key) {
            Some(existing) if existing.fetched_at > payload.fetched_at => {}
            _ => {
                payloads.insert(key, payload);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.payloads.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Events and state
// ============================================================================

/// Progress notifications for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    Started { cycle: u64, total: usize },
    Progress { cycle: u64, done: usize, total: usize },
    /// A new snapshot for `category_id` is in the store.
    Published { cycle: u64, category_id: Arc<str> },
    /// `failed` feeds could not be fetched this cycle.
    Finished { cycle: u64, failed: usize },
    /// The refresh task panicked; the next cycle still runs.
    Panicked { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Outcome of a manual refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    Queued,
    /// A cycle is already in flight; the request was dropped.
    AlreadyRunning,
    /// The background task has stopped.
    Stopped,
}

/// Decrements the running-cycle count when a cycle ends, including when its
/// future is dropped mid-flight.
struct RunningGuard<'a>(&'a AtomicUsize);

impl<'a> RunningGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Controller
// ============================================================================

pub struct RefreshController {
    fetcher: FeedFetcher,
    store: SnapshotStore,
    cache: FeedCache,
    max_concurrent: usize,
    cycle: AtomicU64,
    running: AtomicUsize,
    /// Abort handles of the newest cycle touching each category.
    in_flight: Mutex<HashMap<Arc<str>, (u64, Vec<AbortHandle>)>>,
    events: Option<mpsc::Sender<RefreshEvent>>,
}

impl RefreshController {
    pub const DEFAULT_MAX_CONCURRENT: usize = 8;

    pub fn new(fetcher: FeedFetcher, store: SnapshotStore) -> Self {
        Self {
            fetcher,
            store,
            cache: FeedCache::new(),
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
            cycle: AtomicU64::new(0),
            running: AtomicUsize::new(0),
            in_flight: Mutex::new(HashMap::new()),
            events: None,
        }
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_events(mut self, tx: mpsc::Sender<RefreshEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn state(&self) -> RefreshState {
        if self.running.load(Ordering::SeqCst) > 0 {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    /// Run one refresh cycle over `categories`.
    ///
    /// Returns the snapshots this cycle published. A category is missing from
    /// the result when a newer cycle superseded it.
    pub async fn refresh(&self, categories: &[Arc<Category>]) -> SnapshotMap {
        let _running = RunningGuard::enter(&self.running);
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let total: usize = categories.iter().map(|c| c.feeds.len()).sum();
        self.emit(RefreshEvent::Started { cycle, total });
        tracing::info!(cycle, categories = categories.len(), feeds = total, "Refresh started");

        let mut jobs = Vec::with_capacity(total);
        {
            let mut in_flight = self.in_flight.lock();
            for (index, category) in categories.iter().enumerate() {
                let mut handles = Vec::with_capacity(category.feeds.len());
                for source in &category.feeds {
                    let (handle, registration) = AbortHandle::new_pair();
                    handles.push(handle);
                    jobs.push((index, Arc::clone(source), registration));
                }
                if let Some((old_cycle, old)) =
                    in_flight.insert(Arc::clone(&category.id), (cycle, handles))
                {
                    if !old.is_empty() {
                        tracing::debug!(
                            category = %category.id,
                            superseded = old_cycle,
                            cycle,
                            "Aborting fetches of an older cycle"
                        );
                    }
                    old.iter().for_each(AbortHandle::abort);
                }
            }
        }

        let mut remaining: Vec<usize> = categories.iter().map(|c| c.feeds.len()).collect();
        let mut results: Vec<Vec<FetchResult>> = vec![Vec::new(); categories.len()];
        let mut superseded = vec![false; categories.len()];
        let mut published = SnapshotMap::new();

        for category in categories.iter().filter(|c| c.feeds.is_empty()) {
            self.finish_category(category, &[], cycle, false, &mut published);
        }

        let mut fetches = stream::iter(jobs)
            .map(|(index, source, registration)| {
                let previous = self.cache.get(&source.key());
                async move {
                    let result = Abortable::new(
                        self.fetcher.fetch(&source, previous.as_ref()),
                        registration,
                    )
                    .await;
                    (index, source, result)
                }
            })
            .buffer_unordered(self.max_concurrent);

        let mut done = 0;
        let mut failed = 0;

        while let Some((index, source, result)) = fetches.next().await {
            done += 1;
            self.emit(RefreshEvent::Progress { cycle, done, total });
            match result {
                Ok(result) => {
                    self.record(&source, &result);
                    if !matches!(result.outcome, FetchOutcome::Ok(_)) {
                        failed += 1;
                    }
                    results[index].push(result);
                }
                Err(Aborted) => superseded[index] = true,
            }

            remaining[index] -= 1;
            if remaining[index] == 0 {
                let category = &categories[index];
                self.finish_category(
                    category,
                    &results[index],
                    cycle,
                    superseded[index],
                    &mut published,
                );
            }
        }

        tracing::info!(cycle, failed, published = published.len(), "Refresh finished");
        self.emit(RefreshEvent::Finished { cycle, failed });
        published
    }

    fn record(&self, source: &FeedSource, result: &FetchResult) {
        if let FetchOutcome::Ok(payload) = &result.outcome {
            self.cache.store(source.key(), payload.clone());
        }
    }

    fn finish_category(
        &self,
        category: &Arc<Category>,
        results: &[FetchResult],
        cycle: u64,
        superseded: bool,
        published: &mut SnapshotMap,
    ) {
        {
            let mut in_flight = self.in_flight.lock();
            if in_flight.get(&category.id).is_some_and(|(c, _)| *c == cycle) {
                in_flight.remove(&category.id);
            }
        }

        if superseded {
            tracing::debug!(category = %category.id, cycle, "Category superseded, not publishing");
            return;
        }

        let snapshot = aggregate(category, results, Utc::now(), cycle);
        if let Some(snapshot) = self.store.publish(snapshot) {
            published.insert(Arc::clone(&category.id), snapshot);
            self.emit(RefreshEvent::Published {
                cycle,
                category_id: Arc::clone(&category.id),
            });
        }
    }

    /// Abort every in-flight fetch of every cycle.
    pub fn abort_all(&self) {
        let mut in_flight = self.in_flight.lock();
        for (_, (_, handles)) in in_flight.drain() {
            handles.iter().for_each(AbortHandle::abort);
        }
    }

    fn emit(&self, event: RefreshEvent) {
        if let Some(tx) = &self.events {
            // Progress is advisory; a full channel must never stall fetching.
            if let Err(e) = tx.try_send(event) {
                tracing::trace!(error = %e, "Refresh event dropped");
            }
        }
    }

    /// Spawn the refresh loop: one cycle right away, then one per `interval`
    /// (`None` = manual only) or whenever [`RefreshHandle::request_refresh`]
    /// is called. A manual request restarts the interval.
    pub fn start_background(
        self: &Arc<Self>,
        categories: Vec<Arc<Category>>,
        interval: Option<Duration>,
    ) -> RefreshHandle {
        let (manual_tx, mut manual_rx) = mpsc::channel::<()>(1);
        let controller = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = interval.map(|period| {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });

            loop {
                if let Err(error) = catch_task_panic(controller.refresh(&categories)).await {
                    tracing::error!(error = %error, "Refresh cycle panicked");
                    controller.emit(RefreshEvent::Panicked { error });
                }

                // Requests that arrived mid-cycle are already satisfied.
                while manual_rx.try_recv().is_ok() {}

                tokio::select! {
                    _ = next_tick(&mut ticker) => {
                        tracing::debug!("Automatic refresh");
                    }
                    request = manual_rx.recv() => {
                        if request.is_none() {
                            break;
                        }
                        tracing::debug!("Manual refresh");
                        if let Some(ticker) = ticker.as_mut() {
                            ticker.reset();
                        }
                    }
                }
            }
        });

        RefreshHandle {
            controller: Arc::clone(self),
            manual_tx,
            task,
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Control surface of the background refresh loop. Dropping it stops the loop.
pub struct RefreshHandle {
    controller: Arc<RefreshController>,
    manual_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Ask for a refresh now. Ignored while a cycle is running.
    pub fn request_refresh(&self) -> RefreshRequest {
        if self.controller.state() == RefreshState::Refreshing {
            return RefreshRequest::AlreadyRunning;
        }
        match self.manual_tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => RefreshRequest::Queued,
            Err(mpsc::error::TrySendError::Closed(())) => RefreshRequest::Stopped,
        }
    }

    pub fn state(&self) -> RefreshState {
        self.controller.state()
    }

    /// Stop the loop and abort in-flight fetches without waiting for them.
    pub fn shutdown(&self) {
        self.task.abort();
        self.controller.abort_all();
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
