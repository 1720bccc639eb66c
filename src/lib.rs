//! Orbit - the search core of a keyboard launcher.
//!
//! Orbit takes what the user typed, routes it to search extensions, runs
//! them concurrently and delivers a ranked result list within a fixed
//! response-time budget. Late results are appended, superseded queries are
//! canceled and misbehaving extensions are isolated.
//!
//! # Architecture
//!
//! The library is organized into these main modules:
//!
//! - [`core`] - Items, the result collector, queries, the extension
//!   interface, the registry and the dispatcher
//! - [`index`] - Exact and fuzzy keyword index for extensions
//! - [`services`] - Built-in extensions (calculator, aliases, web search)
//!   and the usage store
//! - [`config`] - Configuration loading and management
//! - [`executor`] - Actions a frontend performs when a result is activated
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use orbit::core::{channel_sink, Dispatcher, ExtensionRegistry};
//! use orbit::{services, Config};
//!
//! let config = Config::load();
//! let usage = services::open_usage(&config);
//!
//! let registry = Arc::new(ExtensionRegistry::new());
//! for extension in services::builtin_extensions(&config, &usage) {
//!     registry.register(extension).unwrap();
//! }
//!
//! let (sink, publications) = channel_sink();
//! let dispatcher = Dispatcher::new(registry, config.dispatch_config(), sink);
//! dispatcher.setup_session();
//! dispatcher.start_query("gg rust traits");
//!
//! for publication in publications.iter() {
//!     println!("{:?}: {} matches", publication.kind, publication.matches.len());
//! }
//! ```

// Public modules
pub mod config;
pub mod core;
pub mod executor;
pub mod index;
pub mod logging;
pub mod services;

mod error;

// Re-export commonly used types for convenience
pub use config::Config;
pub use crate::core::{Dispatcher, Extension, ExtensionRegistry, Item, QueryHandle};
pub use error::{OrbitError, OrbitResult, RegistryError};
pub use executor::ExecutionAction;
pub use index::{FuzzyIndex, WeightedKeyword};
