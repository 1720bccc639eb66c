//! Core engine - platform-agnostic query machinery.
//!
//! This module contains everything between "the user typed something" and
//! "a ranked result list is ready":
//! - Item and action contracts
//! - The result collector and ranking order
//! - Queries and their lifecycle
//! - The extension interface and registry
//! - The dispatcher with its response-time budget

pub mod collector;
pub mod dispatcher;
pub mod extension;
pub mod item;
pub mod query;
pub mod registry;

pub use collector::{compare_matches, sort_matches, ResultCollector};
pub use dispatcher::{
    channel_sink, DispatchConfig, Dispatcher, Publication, PublicationKind, ResultSink,
};
pub use extension::{ExecutionType, Extension};
pub use item::{score_from_ratio, Action, Item, Match, Urgency, MAX_SCORE};
pub use query::{QueryHandle, QueryState};
pub use registry::{ExtensionRegistry, RoutingTable};
