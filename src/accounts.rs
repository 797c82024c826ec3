//! Linked account registry
//!
//! Caches the full collection of linked drive accounts as one unit and
//! resolves individual accounts by linear scan over it. `refresh` eagerly
//! repopulates the cache after an external mutation (e.g. a token refresh)
//! instead of waiting for the next natural miss.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::store::AccountTable;

/// Cache key for the linked-account collection.
const ACCOUNTS_KEY: &str = "accounts:all";

/// Accounts stay cached for an hour unless explicitly refreshed.
const ACCOUNTS_TTL: Duration = Duration::from_secs(3600);

/// A linked drive account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Row id in the account table; identity for all lookups.
    pub id: u64,
    /// Endpoint family the account lives in ("com" or "cn").
    #[serde(default)]
    pub account_type: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub account_email: String,
    /// Access-token expiry as written by the OAuth flow.
    #[serde(default)]
    pub access_token_expires: String,
}

/// Field projection over an [`Account`].
///
/// A closed enum rather than a field-name string, so "whole record" and
/// "named field" are two distinct operations with no ambiguous empty-key case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountField {
    AccountType,
    AccessToken,
    RefreshToken,
    AccountEmail,
    AccessTokenExpires,
}

impl Account {
    /// The named field's value.
    pub fn field(&self, field: AccountField) -> &str {
        match field {
            AccountField::AccountType => &self.account_type,
            AccountField::AccessToken => &self.access_token,
            AccountField::RefreshToken => &self.refresh_token,
            AccountField::AccountEmail => &self.account_email,
            AccountField::AccessTokenExpires => &self.access_token_expires,
        }
    }
}

/// Cached view over the persisted account table.
pub struct AccountRegistry {
    table: Arc<dyn AccountTable>,
    cache: TtlCache<Vec<Account>>,
}

impl AccountRegistry {
    pub fn new(table: Arc<dyn AccountTable>) -> Self {
        Self {
            table,
            cache: TtlCache::new("accounts"),
        }
    }

    /// All linked accounts, cache-aside
    ///
    /// Empty when the table is unavailable; the failure is not cached, so the
    /// next call retries the table.
    pub fn list(&self) -> Vec<Account> {
        match self
            .cache
            .get_or_compute(ACCOUNTS_KEY, ACCOUNTS_TTL, || self.table.read_all())
        {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!(error = %e, "Account table unavailable, returning no accounts");
                Vec::new()
            }
        }
    }

    /// The account with `id`, if linked.
    pub fn get(&self, id: u64) -> Option<Account> {
        self.list().into_iter().find(|account| account.id == id)
    }

    /// Project one field of account `id`, or `default` when the account is
    /// absent. Never fails.
    pub fn field(&self, id: u64, field: AccountField, default: &str) -> String {
        self.get(id)
            .map(|account| account.field(field).to_string())
            .unwrap_or_else(|| default.to_string())
    }

    /// Drop and eagerly repopulate the cached collection from the table.
    ///
    /// On a table read failure only the invalidation happens; the next miss
    /// retries.
    pub fn refresh(&self) {
        self.cache.forget(ACCOUNTS_KEY);
        match self.table.read_all() {
            Ok(accounts) => {
                debug!(count = accounts.len(), "Repopulated account cache");
                self.cache.put(ACCOUNTS_KEY, accounts, ACCOUNTS_TTL);
            }
            Err(e) => {
                warn!(error = %e, "Account refresh failed, cache left empty");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn test_account(id: u64, email: &str) -> Account {
        Account {
            id,
            account_type: "com".to_string(),
            access_token: format!("token-{}", id),
            refresh_token: format!("refresh-{}", id),
            account_email: email.to_string(),
            access_token_expires: "2030-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_list_is_cached() {
        let store = Arc::new(MemoryStore::new());
        store.put_accounts(vec![test_account(1, "alice@example.com")]);
        let registry = AccountRegistry::new(store.clone());

        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.list().len(), 1);
        assert_eq!(store.account_reads(), 1);
    }

    #[test]
    fn test_get_by_id() {
        let store = Arc::new(MemoryStore::new());
        store.put_accounts(vec![
            test_account(1, "alice@example.com"),
            test_account(2, "bob@example.com"),
        ]);
        let registry = AccountRegistry::new(store);

        let account = registry.get(2).unwrap();
        assert_eq!(account.account_email, "bob@example.com");
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn test_field_defaults_for_unknown_id() {
        let store = Arc::new(MemoryStore::new());
        store.put_accounts(vec![test_account(1, "alice@example.com")]);
        let registry = AccountRegistry::new(store);

        assert_eq!(
            registry.field(1, AccountField::AccountEmail, ""),
            "alice@example.com"
        );
        assert_eq!(
            registry.field(999, AccountField::AccountEmail, "nobody"),
            "nobody"
        );
    }

    #[test]
    fn test_refresh_repopulates_eagerly() {
        let store = Arc::new(MemoryStore::new());
        store.put_accounts(vec![test_account(1, "old@example.com")]);
        let registry = AccountRegistry::new(store.clone());

        assert_eq!(
            registry.field(1, AccountField::AccountEmail, ""),
            "old@example.com"
        );

        // Mutate the table behind the cache, then refresh eagerly.
        store.put_accounts(vec![test_account(1, "new@example.com")]);
        registry.refresh();

        assert_eq!(
            registry.field(1, AccountField::AccountEmail, ""),
            "new@example.com"
        );
        // list + refresh both read the table; the final field() was a cache hit
        assert_eq!(store.account_reads(), 2);
    }

    #[test]
    fn test_list_degrades_to_empty_on_store_failure() {
        let store = Arc::new(MemoryStore::new());
        store.put_accounts(vec![test_account(1, "alice@example.com")]);
        store.fail_reads(true);
        let registry = AccountRegistry::new(store.clone());

        assert!(registry.list().is_empty());

        // The failure was not cached; a recovered store serves data again.
        store.fail_reads(false);
        assert_eq!(registry.list().len(), 1);
    }
}
