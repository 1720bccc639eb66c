//! The capability interface every search provider implements.

use super::item::Item;
use super::query::QueryHandle;

/// When an extension runs relative to the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionType {
    /// Runs in the first wave; its matches are sorted before the first publish.
    #[default]
    Batch,
    /// Runs once all batch extensions are done; its matches are appended as
    /// they arrive, unsorted.
    Realtime,
}

/// A pluggable unit of search logic.
///
/// Extensions are shared between the registry and concurrently running
/// query tasks, so they take `&self` everywhere and keep any mutable state
/// behind their own locks.
pub trait Extension: Send + Sync {
    /// Stable, process-wide unique identifier.
    fn id(&self) -> &str;

    /// Tokens that route a query to this extension.
    fn triggers(&self) -> Vec<String> {
        Vec::new()
    }

    /// When true, a matching trigger routes the query to this extension only,
    /// and the extension is never run for untriggered input.
    fn is_trigger_exclusive(&self) -> bool {
        false
    }

    fn execution_type(&self) -> ExecutionType {
        ExecutionType::Batch
    }

    /// Called before the launcher window is shown. Keep it short.
    fn setup_session(&self) {}

    /// Called after the launcher window is hidden. Keep it short.
    fn teardown_session(&self) {}

    /// Add matches for `query`. Runs on a worker thread; poll
    /// [`QueryHandle::is_valid`] during long work.
    fn handle_query(&self, query: &QueryHandle);

    /// Static items offered when a query produced nothing. Asked of every
    /// registered extension, whether or not the query was routed to it.
    fn fallbacks(&self, _search_term: &str) -> Vec<Item> {
        Vec::new()
    }
}
