//! Persistent table interfaces
//!
//! The settings and account tables are simple read/write collaborators; the
//! rest of the crate talks to them only through these traits. [`JsonStore`]
//! persists both tables in a single JSON file; [`MemoryStore`] backs tests
//! and lightweight embedding.

pub mod file;
pub mod memory;

pub use file::JsonStore;
pub use memory::MemoryStore;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::accounts::Account;

/// One row of the persisted settings table. Unique on `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRow {
    pub name: String,
    pub value: String,
}

/// Read/write access to the persisted settings table.
pub trait SettingsTable: Send + Sync {
    /// Read every row.
    fn read_all(&self) -> Result<Vec<SettingRow>>;

    /// Update the value stored under `name`, inserting the row if absent.
    fn update(&self, name: &str, value: &str) -> Result<()>;
}

/// Read access to the persisted account table.
pub trait AccountTable: Send + Sync {
    /// Read every linked account.
    fn read_all(&self) -> Result<Vec<Account>>;
}
