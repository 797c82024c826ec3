//! In-memory tables
//!
//! Backs unit tests and lightweight embedding. Counts table reads so tests
//! can assert how often the cache layer actually went to the store, and can
//! simulate an unavailable store.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use super::{AccountTable, SettingRow, SettingsTable};
use crate::accounts::Account;

/// Settings and account tables held in memory.
#[derive(Default)]
pub struct MemoryStore {
    settings: Mutex<Vec<SettingRow>>,
    accounts: Mutex<Vec<Account>>,
    setting_reads: AtomicU64,
    account_reads: AtomicU64,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with settings rows.
    pub fn with_settings(pairs: &[(&str, &str)]) -> Self {
        let store = Self::new();
        for (name, value) in pairs {
            store.put_setting(name, value);
        }
        store
    }

    /// Write a settings row directly, bypassing any cache.
    pub fn put_setting(&self, name: &str, value: &str) {
        let mut settings = self.settings.lock().unwrap();
        match settings.iter_mut().find(|row| row.name == name) {
            Some(row) => row.value = value.to_string(),
            None => settings.push(SettingRow {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Replace the account rows directly, bypassing any cache.
    pub fn put_accounts(&self, accounts: Vec<Account>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    /// Make every subsequent read fail, simulating an unavailable store.
    pub fn fail_reads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of settings-table reads served so far.
    pub fn setting_reads(&self) -> u64 {
        self.setting_reads.load(Ordering::SeqCst)
    }

    /// Number of account-table reads served so far.
    pub fn account_reads(&self) -> u64 {
        self.account_reads.load(Ordering::SeqCst)
    }
}

impl SettingsTable for MemoryStore {
    fn read_all(&self) -> Result<Vec<SettingRow>> {
        self.setting_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("settings table unavailable"));
        }
        Ok(self.settings.lock().unwrap().clone())
    }

    fn update(&self, name: &str, value: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("settings table unavailable"));
        }
        self.put_setting(name, value);
        Ok(())
    }
}

impl AccountTable for MemoryStore {
    fn read_all(&self) -> Result<Vec<Account>> {
        self.account_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("account table unavailable"));
        }
        Ok(self.accounts.lock().unwrap().clone())
    }
}
