//! Registry of active extensions and their trigger routing table.
//!
//! Registration is rare compared to querying, so every change rebuilds an
//! immutable [`RoutingTable`] and swaps it in. A running query keeps the table
//! it started with.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::extension::Extension;
use crate::error::RegistryError;

/// Immutable view of the registered extensions at one point in time.
#[derive(Clone, Default)]
pub struct RoutingTable {
    extensions: Vec<Arc<dyn Extension>>,
    by_trigger: HashMap<String, Vec<Arc<dyn Extension>>>,
}

impl RoutingTable {
    fn build(extensions: Vec<Arc<dyn Extension>>) -> Self {
        let mut by_trigger: HashMap<String, Vec<Arc<dyn Extension>>> = HashMap::new();
        for extension in &extensions {
            for trigger in extension.triggers() {
                let trigger = trigger.trim();
                if trigger.is_empty() {
                    continue;
                }
                let claimants = by_trigger.entry(trigger.to_string()).or_default();
                if !claimants.iter().any(|e| e.id() == extension.id()) {
                    claimants.push(Arc::clone(extension));
                }
            }
        }
        Self {
            extensions,
            by_trigger,
        }
    }

    /// All extensions, in registration order.
    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    /// Extensions that declared `token` as one of their triggers.
    pub fn claimants(&self, token: &str) -> &[Arc<dyn Extension>] {
        self.by_trigger
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

#[derive(Default)]
pub struct ExtensionRegistry {
    table: RwLock<Arc<RoutingTable>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, extension: Arc<dyn Extension>) -> Result<(), RegistryError> {
        let mut table = self.table.write();
        if table.extensions.iter().any(|e| e.id() == extension.id()) {
            let err = RegistryError::AlreadyRegistered(extension.id().to_string());
            tracing::warn!("{}", err);
            return Err(err);
        }

        let mut extensions = table.extensions.clone();
        tracing::info!(extension = extension.id(), "registered extension");
        extensions.push(extension);
        *table = Arc::new(RoutingTable::build(extensions));
        Ok(())
    }

    /// Remove the extension with `id` and return it.
    pub fn unregister(&self, id: &str) -> Result<Arc<dyn Extension>, RegistryError> {
        let mut table = self.table.write();
        let Some(pos) = table.extensions.iter().position(|e| e.id() == id) else {
            let err = RegistryError::NotRegistered(id.to_string());
            tracing::warn!("{}", err);
            return Err(err);
        };

        let mut extensions = table.extensions.clone();
        let removed = extensions.remove(pos);
        *table = Arc::new(RoutingTable::build(extensions));
        tracing::info!(extension = id, "unregistered extension");
        Ok(removed)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.table.read().extensions.iter().any(|e| e.id() == id)
    }

    pub fn active_extensions(&self) -> Vec<Arc<dyn Extension>> {
        self.table.read().extensions.clone()
    }

    pub fn trigger_claimants(&self, token: &str) -> Vec<Arc<dyn Extension>> {
        self.table.read().claimants(token).to_vec()
    }

    /// The current routing table. Later registry changes do not affect it.
    pub fn routing(&self) -> Arc<RoutingTable> {
        Arc::clone(&*self.table.read())
    }
}
