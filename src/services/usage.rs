//! Activation counts per item id.
//!
//! Extensions read the count of an item when they create it and put it into
//! [`Item::usage`], which ranks above the match score. Counts are persisted
//! as JSON and entries unused for [`MAX_AGE_DAYS`] are dropped on load.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use crate::core::Item;
use crate::error::OrbitResult;

/// Maximum age in days before an entry is pruned.
pub const MAX_AGE_DAYS: u64 = 90;

/// Debounce interval for saving (in number of updates).
const SAVE_DEBOUNCE_COUNT: u32 = 5;

/// Store shared between extensions and whoever records activations.
pub type SharedUsage = Arc<RwLock<UsageStore>>;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A single usage entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    /// Number of activations.
    pub count: u32,

    /// Unix timestamp of last use.
    pub last_used: u64,

    /// Unix timestamp of first use.
    pub first_used: u64,
}

impl UsageEntry {
    fn new() -> Self {
        let now = now_secs();
        Self {
            count: 1,
            last_used: now,
            first_used: now,
        }
    }

    fn record_usage(&mut self) {
        self.count = self.count.saturating_add(1);
        self.last_used = now_secs();
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStore {
    /// Map of item id to usage entry.
    entries: HashMap<String, UsageEntry>,

    /// Number of updates since last save.
    #[serde(skip)]
    updates_since_save: u32,

    /// Path to the data file. In-memory stores have none.
    #[serde(skip)]
    data_path: Option<PathBuf>,
}

impl UsageStore {
    /// An empty store that is never written to disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store at `path`.
    ///
    /// Returns an empty store bound to `path` if the file doesn't exist or is
    /// corrupted.
    pub fn open(path: &Path) -> Self {
        let mut store = if path.exists() {
            match fs::read_to_string(path) {
                Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), "Discarding corrupt usage data: {}", e);
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to read usage data: {}", e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        store.data_path = Some(path.to_path_buf());
        store.prune_old();
        store
    }

    pub fn into_shared(self) -> SharedUsage {
        Arc::new(RwLock::new(self))
    }

    /// How often the item with `id` was activated.
    pub fn count(&self, id: &str) -> u32 {
        self.entries.get(id).map_or(0, |e| e.count)
    }

    /// Record an activation of `id`. Empty ids are ephemeral items and are
    /// ignored.
    pub fn log_usage(&mut self, id: &str) {
        if id.is_empty() {
            return;
        }

        self.entries
            .entry(id.to_string())
            .and_modify(|e| e.record_usage())
            .or_insert_with(UsageEntry::new);

        self.updates_since_save += 1;

        // Debounced save
        if self.updates_since_save >= SAVE_DEBOUNCE_COUNT {
            if let Err(e) = self.save() {
                tracing::warn!("Failed to save usage data: {}", e);
            }
        }
    }

    /// Record an activation of `item` if it is tracked.
    pub fn log_activation(&mut self, item: &Item) {
        if item.is_tracked() {
            self.log_usage(&item.id);
        }
    }

    /// Remove entries not used in MAX_AGE_DAYS.
    pub fn prune_old(&mut self) {
        let cutoff_secs = now_secs().saturating_sub(MAX_AGE_DAYS * 86400);

        let before_count = self.entries.len();
        self.entries.retain(|_, e| e.last_used > cutoff_secs);

        let pruned = before_count - self.entries.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned stale usage entries");
            self.updates_since_save += 1;
        }
    }

    /// Save data to disk. In-memory stores are left alone.
    pub fn save(&mut self) -> OrbitResult<()> {
        let Some(ref path) = self.data_path else {
            self.updates_since_save = 0;
            return Ok(());
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        self.updates_since_save = 0;
        Ok(())
    }

    /// Save pending updates (e.g., on shutdown).
    pub fn flush(&mut self) -> OrbitResult<()> {
        if self.updates_since_save > 0 {
            self.save()?;
        }
        Ok(())
    }

    /// Get the number of tracked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no tracked entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_count_unknown_item() {
        let store = UsageStore::new();
        assert_eq!(store.count("unknown"), 0);
    }

    #[test]
    fn test_log_usage() {
        let mut store = UsageStore::new();
        store.log_usage("firefox");
        store.log_usage("firefox");
        store.log_usage("terminal");

        assert_eq!(store.count("firefox"), 2);
        assert_eq!(store.count("terminal"), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_ephemeral_items_are_not_recorded() {
        let mut store = UsageStore::new();
        store.log_usage("");
        store.log_activation(&Item::new("", "2+2 = 4"));

        assert!(store.is_empty());

        store.log_activation(&Item::new("calc", "calc"));
        assert_eq!(store.count("calc"), 1);
    }

    #[test]
    fn test_prune_old() {
        let mut store = UsageStore::new();
        store.log_usage("fresh");
        store.entries.insert(
            "stale".to_string(),
            UsageEntry {
                count: 40,
                last_used: now_secs() - (MAX_AGE_DAYS + 1) * 86400,
                first_used: 0,
            },
        );

        store.prune_old();
        assert_eq!(store.count("stale"), 0);
        assert_eq!(store.count("fresh"), 1);
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("usage.json");

        let mut store = UsageStore::open(&path);
        assert!(store.is_empty());
        store.log_usage("firefox");
        store.log_usage("firefox");
        store.flush().unwrap();

        let reopened = UsageStore::open(&path);
        assert_eq!(reopened.count("firefox"), 2);
    }

    #[test]
    fn test_debounced_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");

        let mut store = UsageStore::open(&path);
        for _ in 0..SAVE_DEBOUNCE_COUNT {
            store.log_usage("terminal");
        }

        // Written without an explicit flush
        assert!(path.exists());
        assert_eq!(UsageStore::open(&path).count("terminal"), SAVE_DEBOUNCE_COUNT);
    }

    #[test]
    fn test_failed_save_keeps_updates_pending() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("data");
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("usage.json");

        let mut store = UsageStore::open(&path);
        store.log_usage("firefox");
        assert!(store.flush().is_err());

        fs::remove_file(&blocker).unwrap();
        store.flush().unwrap();
        assert_eq!(UsageStore::open(&path).count("firefox"), 1);
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("usage.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = UsageStore::open(&path);
        assert!(store.is_empty());

        store.log_usage("x");
        store.flush().unwrap();
        assert_eq!(UsageStore::open(&path).count("x"), 1);
    }
}
