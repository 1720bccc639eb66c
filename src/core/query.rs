//! One search session: the user's input, how it was routed, and the matches
//! extensions have contributed so far.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::collector::{ResultCollector, UNTRACKED_ORIGIN};
use super::item::{Item, Match};

/// Lifecycle of a query. `Finished` and `Canceled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Running,
    Finished,
    Canceled,
}

impl QueryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, QueryState::Finished | QueryState::Canceled)
    }
}

#[derive(Debug)]
struct Query {
    id: u64,
    input: String,
    search_term: String,
    trigger: String,
    collector: ResultCollector,
    state: Mutex<QueryState>,
    state_changed: Condvar,
    runtimes: Mutex<HashMap<String, Duration>>,
}

/// Shared handle to a query.
///
/// Extensions receive one in [`Extension::handle_query`](super::Extension::handle_query)
/// and use it to read the search term, poll validity and add matches. Cloning
/// is cheap; all clones refer to the same query.
#[derive(Debug, Clone)]
pub struct QueryHandle {
    inner: Arc<Query>,
    origin: usize,
}

impl QueryHandle {
    pub(crate) fn new(
        id: u64,
        input: impl Into<String>,
        search_term: impl Into<String>,
        trigger: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Query {
                id,
                input: input.into(),
                search_term: search_term.into(),
                trigger: trigger.into(),
                collector: ResultCollector::new(),
                state: Mutex::new(QueryState::Idle),
                state_changed: Condvar::new(),
                runtimes: Mutex::new(HashMap::new()),
            }),
            origin: UNTRACKED_ORIGIN,
        }
    }

    /// A handle whose matches are tagged with `origin`, so they can be
    /// retracted if the task behind it fails.
    pub(crate) fn for_task(&self, origin: usize) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            origin,
        }
    }

    /// A standalone query that is not managed by a dispatcher. Handy for
    /// driving a single extension directly.
    pub fn detached(search_term: impl Into<String>) -> Self {
        let search_term = search_term.into();
        Self::new(0, search_term.clone(), search_term, "")
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// The raw text the user typed.
    pub fn input(&self) -> &str {
        &self.inner.input
    }

    /// The input with a claimed trigger token stripped.
    pub fn search_term(&self) -> &str {
        &self.inner.search_term
    }

    /// The trigger token this query was routed by, empty if untriggered.
    pub fn trigger(&self) -> &str {
        &self.inner.trigger
    }

    pub fn is_triggered(&self) -> bool {
        !self.inner.trigger.is_empty()
    }

    /// False once the query was superseded or torn down. Long-running
    /// extensions must poll this and stop early.
    pub fn is_valid(&self) -> bool {
        self.inner.collector.is_valid()
    }

    pub fn add_match(&self, item: Arc<Item>, score: u16) {
        self.inner.collector.add_match_from(self.origin, item, score);
    }

    /// Batched form of [`add_match`](Self::add_match); prefer it for many results.
    pub fn add_matches<I>(&self, batch: I)
    where
        I: IntoIterator<Item = (Arc<Item>, u16)>,
    {
        self.inner.collector.add_matches_from(self.origin, batch);
    }

    /// Number of matches collected so far.
    pub fn size(&self) -> usize {
        self.inner.collector.size()
    }

    pub fn snapshot(&self) -> Vec<Match> {
        self.inner.collector.snapshot()
    }

    /// Mark the query invalid. Irreversible.
    pub fn invalidate(&self) {
        self.inner.collector.invalidate();
        let mut state = self.inner.state.lock();
        if *state != QueryState::Finished && *state != QueryState::Canceled {
            *state = QueryState::Canceled;
            self.inner.state_changed.notify_all();
        }
    }

    pub fn state(&self) -> QueryState {
        *self.inner.state.lock()
    }

    /// Block until the query reaches a terminal state or `timeout` passes.
    /// Returns the state observed last.
    pub fn wait(&self, timeout: Duration) -> QueryState {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while !state.is_terminal() {
            if self
                .inner
                .state_changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }
        *state
    }

    /// How long each extension spent in `handle_query`, by extension id.
    pub fn runtimes(&self) -> HashMap<String, Duration> {
        self.inner.runtimes.lock().clone()
    }

    pub(crate) fn collector(&self) -> &ResultCollector {
        &self.inner.collector
    }

    pub(crate) fn record_runtime(&self, extension_id: &str, runtime: Duration) {
        self.inner
            .runtimes
            .lock()
            .insert(extension_id.to_string(), runtime);
    }

    /// Move `Idle -> Running`, or `Running -> Finished`. Other transitions
    /// are ignored so a cancellation is never overwritten.
    pub(crate) fn advance(&self, next: QueryState) {
        let mut state = self.inner.state.lock();
        let allowed = matches!(
            (*state, next),
            (QueryState::Idle, QueryState::Running) | (QueryState::Running, QueryState::Finished)
        );
        if allowed {
            *state = next;
            self.inner.state_changed.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_query() {
        let query = QueryHandle::detached("fire");
        assert_eq!(query.search_term(), "fire");
        assert_eq!(query.input(), "fire");
        assert!(!query.is_triggered());
        assert!(query.is_valid());
        assert_eq!(query.state(), QueryState::Idle);
    }

    #[test]
    fn test_invalidate_is_permanent() {
        let query = QueryHandle::detached("x");
        query.add_match(Item::new("a", "a").into_shared(), 1);
        query.invalidate();

        let size = query.size();
        for _ in 0..10 {
            query.add_match(Item::new("b", "b").into_shared(), 1);
        }

        assert!(!query.is_valid());
        assert_eq!(query.size(), size);
        assert_eq!(query.state(), QueryState::Canceled);

        // A finished transition must not revive it.
        query.advance(QueryState::Running);
        query.advance(QueryState::Finished);
        assert_eq!(query.state(), QueryState::Canceled);
    }

    #[test]
    fn test_lifecycle() {
        let query = QueryHandle::new(1, "gg rust", "rust", "gg");
        assert!(query.is_triggered());

        query.advance(QueryState::Finished);
        assert_eq!(query.state(), QueryState::Idle);

        query.advance(QueryState::Running);
        query.advance(QueryState::Finished);
        assert_eq!(query.state(), QueryState::Finished);

        // Invalidating a finished query keeps it finished.
        query.invalidate();
        assert_eq!(query.state(), QueryState::Finished);
        assert!(!query.is_valid());
    }

    #[test]
    fn test_wait_times_out() {
        let query = QueryHandle::detached("x");
        let state = query.wait(Duration::from_millis(10));
        assert_eq!(state, QueryState::Idle);
    }

    #[test]
    fn test_wait_wakes_on_finish() {
        let query = QueryHandle::detached("x");
        query.advance(QueryState::Running);

        let waiter = query.clone();
        let handle = std::thread::spawn(move || waiter.wait(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));
        query.advance(QueryState::Finished);

        assert_eq!(handle.join().unwrap(), QueryState::Finished);
    }
}
