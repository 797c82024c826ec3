//! Settings store
//!
//! Flattened name/value view over the persisted settings table. The whole map
//! is cached as one unit under a single key; any single-key write drops the
//! entire map rather than patching it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::store::SettingsTable;

/// Cache key for the flattened settings map.
const SETTINGS_KEY: &str = "settings:all";

/// The settings map stays cached for an hour unless a write drops it.
const SETTINGS_TTL: Duration = Duration::from_secs(3600);

/// Cache-backed view over the persisted settings table.
pub struct SettingsStore {
    table: Arc<dyn SettingsTable>,
    cache: TtlCache<HashMap<String, String>>,
}

impl SettingsStore {
    pub fn new(table: Arc<dyn SettingsTable>) -> Self {
        Self {
            table,
            cache: TtlCache::new("settings"),
        }
    }

    /// The full settings map, cache-aside
    ///
    /// Empty when the table is unavailable. The failure is not cached, so the
    /// next call retries the table.
    pub fn all(&self) -> HashMap<String, String> {
        let result = self.cache.get_or_compute(SETTINGS_KEY, SETTINGS_TTL, || {
            let rows = self.table.read_all()?;
            Ok(rows.into_iter().map(|row| (row.name, row.value)).collect())
        });
        match result {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Settings table unavailable, using defaults");
                HashMap::new()
            }
        }
    }

    /// The value stored under `key`, or `default` when absent.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.all()
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Write `value` through to the table, then drop the cached map
    ///
    /// A reader racing between the table write and the invalidation may still
    /// observe the stale map until the next miss; staleness is bounded by the
    /// map TTL.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.table
            .update(key, value)
            .with_context(|| format!("Failed to update setting '{}'", key))?;
        self.cache.forget(SETTINGS_KEY);
        debug!(key = key, "Setting updated, cached map dropped");
        Ok(())
    }
}
