//! Query dispatch: routing, concurrent execution, the response-time budget,
//! cancellation and fallbacks.
//!
//! ```text
//! start_query(input)
//!   ├── invalidate previous query
//!   ├── route: exclusive trigger claimants, or every non-exclusive extension
//!   └── coordinator thread
//!         ├── batch wave: one thread per extension ──┐
//!         ├── budget expires or wave done ──> Sorted publication
//!         ├── late batch matches ──> Appended (every flush interval)
//!         ├── realtime wave ──> Appended (every flush interval)
//!         └── nothing collected ──> Fallbacks from every extension
//! ```
//!
//! The caller of `start_query` never blocks. Cancellation is cooperative:
//! extensions poll [`QueryHandle::is_valid`], tasks that ignore it run to
//! completion in the background and their matches are dropped.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::collector::sort_matches;
use super::extension::{ExecutionType, Extension};
use super::item::Match;
use super::query::{QueryHandle, QueryState};
use super::registry::{ExtensionRegistry, RoutingTable};

/// Default response-time budget.
pub const DEFAULT_BUDGET: Duration = Duration::from_millis(100);

/// Default cadence for appending late matches.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Session hooks running longer than this are reported.
pub const DEFAULT_HOOK_WARN: Duration = Duration::from_millis(50);

/// Timing knobs of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Time after which the sorted result set is published regardless of
    /// outstanding extensions.
    pub budget: Duration,
    /// How often matches arriving after the sorted publication are appended.
    pub flush_interval: Duration,
    /// Threshold for warning about slow session hooks.
    pub hook_warn: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            hook_warn: DEFAULT_HOOK_WARN,
        }
    }
}

/// What a publication contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationKind {
    /// The ranked result set. Sent exactly once per query that was not
    /// canceled first, no later than the budget.
    Sorted,
    /// Matches that arrived after the sorted publication, in arrival order.
    Appended,
    /// Replacement items because the query produced no matches.
    Fallbacks,
}

/// A batch of results delivered to the presentation layer.
#[derive(Debug, Clone)]
pub struct Publication {
    pub query_id: u64,
    pub kind: PublicationKind,
    pub matches: Vec<Match>,
}

/// Receives publications. Called from dispatcher threads.
pub trait ResultSink: Send + Sync {
    fn publish(&self, publication: Publication);
}

impl<F> ResultSink for F
where
    F: Fn(Publication) + Send + Sync,
{
    fn publish(&self, publication: Publication) {
        self(publication)
    }
}

/// A sink that forwards publications into a channel.
pub fn channel_sink() -> (Arc<dyn ResultSink>, Receiver<Publication>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let sink = move |publication: Publication| {
        // The receiver going away just means nobody is watching anymore.
        let _ = tx.lock().send(publication);
    };
    (Arc::new(sink), rx)
}

/// How one input is routed.
#[derive(Clone)]
pub(crate) struct Route {
    pub trigger: String,
    pub search_term: String,
    pub batch: Vec<Arc<dyn Extension>>,
    pub realtime: Vec<Arc<dyn Extension>>,
}

impl Route {
    /// The first whitespace-delimited token is a trigger candidate. If any
    /// trigger-exclusive extension claims it, only those run and the token
    /// plus one separator are stripped. Otherwise every non-exclusive
    /// extension runs on the raw input.
    pub fn resolve(table: &RoutingTable, input: &str) -> Self {
        let rest = input.trim_start();
        let token = rest.split(char::is_whitespace).next().unwrap_or_default();

        let exclusive: Vec<Arc<dyn Extension>> = if token.is_empty() {
            Vec::new()
        } else {
            table
                .claimants(token)
                .iter()
                .filter(|e| e.is_trigger_exclusive())
                .cloned()
                .collect()
        };

        let (trigger, search_term, selected) = if exclusive.is_empty() {
            let selected: Vec<Arc<dyn Extension>> = table
                .extensions()
                .iter()
                .filter(|e| !e.is_trigger_exclusive())
                .cloned()
                .collect();
            (String::new(), input.to_string(), selected)
        } else {
            let after = &rest[token.len()..];
            let mut chars = after.chars();
            let search_term = match chars.next() {
                Some(c) if c.is_whitespace() => chars.as_str(),
                _ => after,
            };
            (token.to_string(), search_term.to_string(), exclusive)
        };

        let (batch, realtime): (Vec<_>, Vec<_>) = selected
            .into_iter()
            .partition(|e| e.execution_type() == ExecutionType::Batch);

        Self {
            trigger,
            search_term,
            batch,
            realtime,
        }
    }
}

/// Runs queries for one launcher session.
pub struct Dispatcher {
    registry: Arc<ExtensionRegistry>,
    config: DispatchConfig,
    sink: Arc<dyn ResultSink>,
    next_id: AtomicU64,
    queries: Mutex<Vec<QueryHandle>>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ExtensionRegistry>,
        config: DispatchConfig,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            registry,
            config,
            sink,
            next_id: AtomicU64::new(1),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    /// Run every active extension's `setup_session` hook.
    pub fn setup_session(&self) {
        tracing::info!("session setup started");
        let start = Instant::now();
        for extension in self.registry.active_extensions() {
            run_hook(&*extension, "setup", self.config.hook_warn, |e| {
                e.setup_session()
            });
        }
        tracing::debug!(
            "TIME: {:>6} µs SESSION SETUP OVERALL",
            start.elapsed().as_micros()
        );
    }

    /// Supersede the current query and start a new one for `input`.
    ///
    /// Returns immediately; results are delivered to the sink.
    pub fn start_query(&self, input: &str) -> QueryHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let routing = self.registry.routing();
        let route = Route::resolve(&routing, input);
        let query = QueryHandle::new(id, input, route.search_term.clone(), route.trigger.clone());

        {
            let mut queries = self.queries.lock();
            for previous in queries.drain(..) {
                previous.invalidate();
            }
            queries.push(query.clone());
        }

        tracing::debug!(
            query = id,
            input,
            trigger = %route.trigger,
            batch = route.batch.len(),
            realtime = route.realtime.len(),
            "starting query"
        );

        let execution = Execution {
            query: query.clone(),
            route,
            fallback_providers: routing.extensions().to_vec(),
            config: self.config,
            sink: Arc::clone(&self.sink),
        };
        let spawned = thread::Builder::new()
            .name(format!("orbit-query-{}", id))
            .spawn(move || execution.run());
        if let Err(e) = spawned {
            tracing::error!(query = id, "failed to spawn query coordinator: {}", e);
            query.invalidate();
        }

        query
    }

    /// The most recently started query, if the session has one.
    pub fn current_query(&self) -> Option<QueryHandle> {
        self.queries.lock().last().cloned()
    }

    /// Invalidate every query of this session and run the `teardown_session`
    /// hooks. Tasks still running keep running in the background.
    pub fn teardown_session(&self) {
        tracing::info!("session teardown started");
        let start = Instant::now();

        let retired: Vec<QueryHandle> = std::mem::take(&mut *self.queries.lock());
        for query in &retired {
            query.invalidate();
        }

        for extension in self.registry.active_extensions() {
            run_hook(&*extension, "teardown", self.config.hook_warn, |e| {
                e.teardown_session()
            });
        }

        tracing::debug!(
            retired = retired.len(),
            "TIME: {:>6} µs SESSION TEARDOWN OVERALL",
            start.elapsed().as_micros()
        );
    }
}

/// Outcome of one extension task.
struct TaskReport {
    origin: usize,
    extension_id: String,
    panicked: bool,
}

/// The coordinator of one query.
struct Execution {
    query: QueryHandle,
    route: Route,
    /// Every registered extension, routed or not.
    fallback_providers: Vec<Arc<dyn Extension>>,
    config: DispatchConfig,
    sink: Arc<dyn ResultSink>,
}

impl Execution {
    fn run(self) {
        let start = Instant::now();
        let deadline = start + self.config.budget;
        self.query.advance(QueryState::Running);

        let (tx, rx) = mpsc::channel();

        // Batch wave, bounded by the budget.
        let mut sorted_published = false;
        let mut outstanding = self.spawn_wave(&self.route.batch, 1, &tx);
        while outstanding > 0 {
            let wait = if sorted_published {
                self.config.flush_interval
            } else {
                deadline.saturating_duration_since(Instant::now())
            };
            match rx.recv_timeout(wait) {
                Ok(report) => {
                    outstanding -= 1;
                    self.settle(report);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if !self.query.is_valid() {
                return self.abandon(start);
            }
            if sorted_published {
                self.publish_appended();
            } else if Instant::now() >= deadline {
                tracing::debug!(
                    query = self.query.id(),
                    outstanding,
                    "response budget exhausted, publishing partial results"
                );
                self.publish_sorted();
                sorted_published = true;
            }
        }
        if sorted_published {
            self.publish_appended();
        } else {
            self.publish_sorted();
        }

        // Realtime wave, appended as it arrives.
        let origin_base = self.route.batch.len() + 1;
        let mut outstanding = self.spawn_wave(&self.route.realtime, origin_base, &tx);
        while outstanding > 0 {
            match rx.recv_timeout(self.config.flush_interval) {
                Ok(report) => {
                    outstanding -= 1;
                    self.settle(report);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if !self.query.is_valid() {
                return self.abandon(start);
            }
            self.publish_appended();
        }

        if !self.query.is_valid() {
            return self.abandon(start);
        }

        if self.query.collector().is_empty() && !self.query.input().trim().is_empty() {
            self.publish_fallbacks();
        }

        self.query.advance(QueryState::Finished);
        tracing::debug!(
            query = self.query.id(),
            "TIME: {:>6} µs QUERY OVERALL",
            start.elapsed().as_micros()
        );
    }

    /// Start one thread per extension. Returns how many were started.
    fn spawn_wave(
        &self,
        wave: &[Arc<dyn Extension>],
        origin_base: usize,
        tx: &Sender<TaskReport>,
    ) -> usize {
        let mut spawned = 0;
        for (offset, extension) in wave.iter().enumerate() {
            let origin = origin_base + offset;
            let extension_id = extension.id().to_string();
            let extension = Arc::clone(extension);
            let query = self.query.for_task(origin);
            let tx = tx.clone();

            let result = thread::Builder::new()
                .name(format!("orbit-ext-{}", extension_id))
                .spawn(move || {
                    let report = run_handler(&*extension, &query, origin);
                    // The coordinator is gone if the query was abandoned.
                    let _ = tx.send(report);
                });
            match result {
                Ok(_) => spawned += 1,
                Err(e) => tracing::error!(
                    extension = %extension_id,
                    "failed to spawn query task: {}",
                    e
                ),
            }
        }
        spawned
    }

    fn settle(&self, report: TaskReport) {
        if report.panicked {
            let removed = self.query.collector().retract(report.origin);
            tracing::debug!(
                extension = %report.extension_id,
                removed,
                "discarded matches of failed extension"
            );
        }
    }

    fn publish(&self, kind: PublicationKind, matches: Vec<Match>) {
        if !self.query.is_valid() {
            return;
        }
        self.sink.publish(Publication {
            query_id: self.query.id(),
            kind,
            matches,
        });
    }

    fn publish_sorted(&self) {
        let matches = self.query.collector().publish_sorted();
        self.publish(PublicationKind::Sorted, matches);
    }

    fn publish_appended(&self) {
        let matches = self.query.collector().take_unpublished();
        if !matches.is_empty() {
            self.publish(PublicationKind::Appended, matches);
        }
    }

    fn publish_fallbacks(&self) {
        let search_term = self.query.search_term();

        let mut fallbacks: Vec<Match> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .fallback_providers
                .iter()
                .map(|extension| scope.spawn(move || collect_fallbacks(&**extension, search_term)))
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_default())
                .collect()
        });
        if fallbacks.is_empty() {
            return;
        }

        sort_matches(&mut fallbacks);
        self.publish(PublicationKind::Fallbacks, fallbacks);
    }

    fn abandon(&self, start: Instant) {
        tracing::debug!(
            query = self.query.id(),
            "TIME: {:>6} µs QUERY CANCELED",
            start.elapsed().as_micros()
        );
    }
}

fn run_handler(extension: &dyn Extension, query: &QueryHandle, origin: usize) -> TaskReport {
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| extension.handle_query(query)));
    let runtime = start.elapsed();
    query.record_runtime(extension.id(), runtime);

    let panicked = match outcome {
        Ok(()) => {
            tracing::debug!(
                "TIME: {:>6} µs MATCHES [{}]",
                runtime.as_micros(),
                extension.id()
            );
            false
        }
        Err(payload) => {
            tracing::error!(
                extension = extension.id(),
                "handle_query panicked: {}",
                panic_message(payload.as_ref())
            );
            true
        }
    };

    TaskReport {
        origin,
        extension_id: extension.id().to_string(),
        panicked,
    }
}

fn collect_fallbacks(extension: &dyn Extension, search_term: &str) -> Vec<Match> {
    match panic::catch_unwind(AssertUnwindSafe(|| extension.fallbacks(search_term))) {
        Ok(items) => items
            .into_iter()
            .map(|item| Match::new(Arc::new(item), 0))
            .collect(),
        Err(payload) => {
            tracing::error!(
                extension = extension.id(),
                "fallbacks panicked: {}",
                panic_message(payload.as_ref())
            );
            Vec::new()
        }
    }
}

/// Run a session hook with panic isolation and overrun reporting.
fn run_hook<F>(extension: &dyn Extension, stage: &str, warn_after: Duration, hook: F)
where
    F: FnOnce(&dyn Extension),
{
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| hook(extension)));
    let elapsed = start.elapsed();

    if let Err(payload) = outcome {
        tracing::error!(
            extension = extension.id(),
            "{} hook panicked: {}",
            stage,
            panic_message(payload.as_ref())
        );
    }
    if elapsed > warn_after {
        tracing::warn!(
            extension = extension.id(),
            elapsed_ms = elapsed.as_millis() as u64,
            "{} hook took longer than {} ms",
            stage,
            warn_after.as_millis()
        );
    } else {
        tracing::debug!(
            "TIME: {:>6} µs SESSION {} [{}]",
            elapsed.as_micros(),
            stage.to_uppercase(),
            extension.id()
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
