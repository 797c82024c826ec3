//! Service facade
//!
//! Wires the tables, caches, gate and remote client into one handle whose
//! surface mirrors the helper layer it replaces: read/write settings, look
//! up linked accounts, resolve quota.

use std::sync::Arc;

use anyhow::Result;

use crate::accounts::{Account, AccountField, AccountRegistry};
use crate::auth::{OauthApi, TokenGate};
use crate::quota::{QuotaMap, QuotaResolver};
use crate::remote::DriveApi;
use crate::settings::SettingsStore;
use crate::size::{BinarySize, SizeFormat};
use crate::store::{AccountTable, SettingsTable};

/// One handle over the whole metadata layer.
pub struct MetaService {
    settings: Arc<SettingsStore>,
    accounts: Arc<AccountRegistry>,
    quota: QuotaResolver,
}

impl MetaService {
    /// Wire the service from its collaborators, with binary-unit size
    /// formatting.
    pub fn new(
        settings_table: Arc<dyn SettingsTable>,
        account_table: Arc<dyn AccountTable>,
        oauth: Arc<dyn OauthApi>,
        drive: Arc<dyn DriveApi>,
    ) -> Self {
        Self::with_size_format(settings_table, account_table, oauth, drive, Arc::new(BinarySize))
    }

    /// Wire the service with a custom size formatter.
    pub fn with_size_format(
        settings_table: Arc<dyn SettingsTable>,
        account_table: Arc<dyn AccountTable>,
        oauth: Arc<dyn OauthApi>,
        drive: Arc<dyn DriveApi>,
        sizes: Arc<dyn SizeFormat>,
    ) -> Self {
        let settings = Arc::new(SettingsStore::new(settings_table));
        let accounts = Arc::new(AccountRegistry::new(account_table));
        let gate = Arc::new(TokenGate::new(
            Arc::clone(&settings),
            Arc::clone(&accounts),
            oauth,
        ));
        let quota = QuotaResolver::new(
            gate,
            Arc::clone(&accounts),
            Arc::clone(&settings),
            drive,
            sizes,
        );
        Self {
            settings,
            accounts,
            quota,
        }
    }

    /// The setting stored under `key`, or `default` when absent.
    pub fn setting(&self, key: &str, default: &str) -> String {
        self.settings.get(key, default)
    }

    /// Write a setting through to the table and drop the cached map.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings.set(key, value)
    }

    /// All linked accounts.
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.list()
    }

    /// The account with `id`, if linked.
    pub fn account(&self, id: u64) -> Option<Account> {
        self.accounts.get(id)
    }

    /// One field of account `id`, or `default` when the account is absent.
    pub fn account_field(&self, id: u64, field: AccountField, default: &str) -> String {
        self.accounts.field(id, field, default)
    }

    /// Eagerly repopulate the account cache from the table.
    pub fn refresh_accounts(&self) {
        self.accounts.refresh()
    }

    /// The quota map for account `id`. Empty on a stale token or remote
    /// failure.
    pub async fn quota(&self, id: u64) -> QuotaMap {
        self.quota.quota(id).await
    }

    /// One quota field for account `id`, or `default` when absent.
    pub async fn quota_field(&self, id: u64, field: &str, default: &str) -> String {
        self.quota.quota_field(id, field, default).await
    }
}
