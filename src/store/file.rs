//! JSON-file-backed tables
//!
//! Persists the settings and account tables in a single JSON document,
//! written atomically via a temp file rename so a crash mid-write never
//! leaves a torn store behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AccountTable, SettingRow, SettingsTable};
use crate::accounts::Account;

/// On-disk document holding both tables.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDoc {
    #[serde(default)]
    settings: Vec<SettingRow>,
    #[serde(default)]
    accounts: Vec<Account>,
}

/// Both tables persisted in one JSON file.
pub struct JsonStore {
    path: PathBuf,
    doc: Mutex<StoreDoc>,
}

impl JsonStore {
    /// Open the store at the default platform location
    /// (`<config_dir>/drivemeta/store.json`).
    pub fn open_default() -> Result<Self> {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("drivemeta")
            .join("store.json");
        Self::open(path)
    }

    /// Open (or create) a store at `path`.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory: {:?}", parent))?;
        }

        let doc = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read store file: {:?}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Malformed store file: {:?}", path))?
        } else {
            StoreDoc::default()
        };

        info!(path = %path.display(), "Opened JSON store");
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// Replace the persisted account rows.
    pub fn put_accounts(&self, accounts: Vec<Account>) -> Result<()> {
        let mut doc = self.doc.lock().unwrap();
        doc.accounts = accounts;
        self.persist(&doc)
    }

    /// Write the document atomically.
    fn persist(&self, doc: &StoreDoc) -> Result<()> {
        let parent = self.path.parent().unwrap_or(Path::new("/tmp"));
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .context("Failed to create temp file for store")?;

        let raw = serde_json::to_vec_pretty(doc).context("Failed to encode store")?;
        tmp.write_all(&raw).context("Failed to write store")?;

        tmp.persist(&self.path)
            .with_context(|| format!("Failed to persist store file: {:?}", self.path))?;

        debug!(path = %self.path.display(), "Persisted store");
        Ok(())
    }
}

impl SettingsTable for JsonStore {
    fn read_all(&self) -> Result<Vec<SettingRow>> {
        Ok(self.doc.lock().unwrap().settings.clone())
    }

    fn update(&self, name: &str, value: &str) -> Result<()> {
        let mut doc = self.doc.lock().unwrap();
        match doc.settings.iter_mut().find(|row| row.name == name) {
            Some(row) => row.value = value.to_string(),
            None => doc.settings.push(SettingRow {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        self.persist(&doc)
    }
}

impl AccountTable for JsonStore {
    fn read_all(&self) -> Result<Vec<Account>> {
        Ok(self.doc.lock().unwrap().accounts.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account(id: u64) -> Account {
        Account {
            id,
            account_type: "com".to_string(),
            access_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            account_email: "alice@example.com".to_string(),
            access_token_expires: "2030-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonStore::open(path.clone()).unwrap();
            store.update("expires", "1200").unwrap();
            store.update("account_type", "com").unwrap();
            store.put_accounts(vec![test_account(1)]).unwrap();
        }

        let store = JsonStore::open(path).unwrap();
        let settings = SettingsTable::read_all(&store).unwrap();
        assert_eq!(settings.len(), 2);
        assert!(settings
            .iter()
            .any(|row| row.name == "expires" && row.value == "1200"));

        let accounts = AccountTable::read_all(&store).unwrap();
        assert_eq!(accounts, vec![test_account(1)]);
    }

    #[test]
    fn test_update_replaces_existing_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("store.json")).unwrap();

        store.update("expires", "600").unwrap();
        store.update("expires", "1200").unwrap();

        let settings = SettingsTable::read_all(&store).unwrap();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].value, "1200");
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("fresh.json")).unwrap();

        assert!(SettingsTable::read_all(&store).unwrap().is_empty());
        assert!(AccountTable::read_all(&store).unwrap().is_empty());
    }
}
