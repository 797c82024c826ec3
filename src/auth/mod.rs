//! Token freshness gate
//!
//! Decides whether the locally held access token is still usable before any
//! remote call, and drives the external refresh flow when it is not. A token
//! whose expiry equals the current instant counts as expired.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accounts::{Account, AccountRegistry};
use crate::settings::SettingsStore;

/// Settings key holding the access-token expiry timestamp.
const EXPIRES_SETTING: &str = "access_token_expires";

/// Response from the external OAuth refresh flow. Success iff `code == 200`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub code: u16,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime of the new token in seconds.
    #[serde(default)]
    pub expires_in: i64,
}

/// External OAuth refresh flow
///
/// Persisting the rotated token (and its new expiry) is the implementor's
/// concern; the gate only interprets the response code.
#[async_trait]
pub trait OauthApi: Send + Sync {
    async fn refresh(&self, account: &Account) -> Result<RefreshResponse>;
}

/// Parse a stored expiry value to unix seconds
///
/// Accepts raw unix seconds, RFC 3339, and `YYYY-MM-DD HH:MM:SS` (read as
/// UTC). Anything else parses to 0, which always reads as expired.
pub fn parse_expiry(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    if let Ok(ts) = raw.parse::<i64>() {
        return ts;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc().timestamp();
    }
    0
}

/// Check-and-maybe-refresh step guarding remote calls behind token validity.
pub struct TokenGate {
    settings: Arc<SettingsStore>,
    accounts: Arc<AccountRegistry>,
    oauth: Arc<dyn OauthApi>,
}

impl TokenGate {
    pub fn new(
        settings: Arc<SettingsStore>,
        accounts: Arc<AccountRegistry>,
        oauth: Arc<dyn OauthApi>,
    ) -> Self {
        Self {
            settings,
            accounts,
            oauth,
        }
    }

    /// `true` when the token for `account_id` is usable, refreshing it first
    /// when needed
    ///
    /// A still-valid token returns `true` without any remote traffic. On a
    /// successful refresh the account cache is eagerly repopulated before
    /// returning, so dependent lookups observe the new token immediately.
    pub async fn ensure_fresh(&self, account_id: u64) -> bool {
        let expires_at = parse_expiry(&self.settings.get(EXPIRES_SETTING, "0"));
        let now = Utc::now().timestamp();
        if expires_at - now > 0 {
            debug!(
                account_id = account_id,
                expires_in = expires_at - now,
                "Access token still valid"
            );
            return true;
        }

        let Some(account) = self.accounts.get(account_id) else {
            warn!(account_id = account_id, "No such account, cannot refresh token");
            return false;
        };

        debug!(account_id = account_id, "Access token expired, invoking refresh flow");
        match self.oauth.refresh(&account).await {
            Ok(resp) if resp.code == 200 => {
                info!(account_id = account_id, "Token refresh succeeded");
                self.accounts.refresh();
                true
            }
            Ok(resp) => {
                warn!(
                    account_id = account_id,
                    code = resp.code,
                    "Token refresh rejected"
                );
                false
            }
            Err(e) => {
                warn!(account_id = account_id, error = %e, "Token refresh failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountField;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct MockOauth {
        code: u16,
        calls: AtomicU64,
    }

    impl MockOauth {
        fn returning(code: u16) -> Arc<Self> {
            Arc::new(Self {
                code,
                calls: AtomicU64::new(0),
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OauthApi for MockOauth {
        async fn refresh(&self, _account: &Account) -> Result<RefreshResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RefreshResponse {
                code: self.code,
                access_token: "fresh-token".to_string(),
                refresh_token: "fresh-refresh".to_string(),
                expires_in: 3600,
            })
        }
    }

    fn test_account(id: u64, email: &str) -> Account {
        Account {
            id,
            account_type: "com".to_string(),
            access_token: "stale-token".to_string(),
            refresh_token: "refresh".to_string(),
            account_email: email.to_string(),
            access_token_expires: String::new(),
        }
    }

    fn gate_with(
        store: Arc<MemoryStore>,
        oauth: Arc<MockOauth>,
    ) -> (TokenGate, Arc<AccountRegistry>) {
        let settings = Arc::new(SettingsStore::new(store.clone()));
        let accounts = Arc::new(AccountRegistry::new(store));
        let gate = TokenGate::new(settings, Arc::clone(&accounts), oauth);
        (gate, accounts)
    }

    #[test]
    fn test_parse_expiry_forms() {
        assert_eq!(parse_expiry("1700000000"), 1_700_000_000);
        assert_eq!(parse_expiry("1970-01-01 00:00:10"), 10);
        assert_eq!(parse_expiry("1970-01-01T00:00:10+00:00"), 10);
        assert_eq!(parse_expiry(""), 0);
        assert_eq!(parse_expiry("not a date"), 0);
    }

    #[tokio::test]
    async fn test_valid_token_skips_refresh() {
        let future = (Utc::now().timestamp() + 3600).to_string();
        let store = Arc::new(MemoryStore::with_settings(&[(
            "access_token_expires",
            &future,
        )]));
        store.put_accounts(vec![test_account(1, "alice@example.com")]);
        let oauth = MockOauth::returning(200);
        let (gate, _) = gate_with(store, oauth.clone());

        assert!(gate.ensure_fresh(1).await);
        assert_eq!(oauth.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_successfully() {
        // Expired ten minutes ago.
        let past = (Utc::now().timestamp() - 600).to_string();
        let store = Arc::new(MemoryStore::with_settings(&[(
            "access_token_expires",
            &past,
        )]));
        store.put_accounts(vec![test_account(1, "alice@example.com")]);
        let oauth = MockOauth::returning(200);
        let (gate, _) = gate_with(store, oauth.clone());

        assert!(gate.ensure_fresh(1).await);
        assert_eq!(oauth.calls(), 1);
    }

    #[tokio::test]
    async fn test_expiry_boundary_counts_as_expired() {
        let now = Utc::now().timestamp().to_string();
        let store = Arc::new(MemoryStore::with_settings(&[(
            "access_token_expires",
            &now,
        )]));
        store.put_accounts(vec![test_account(1, "alice@example.com")]);
        let oauth = MockOauth::returning(200);
        let (gate, _) = gate_with(store, oauth.clone());

        assert!(gate.ensure_fresh(1).await);
        // expires_at == now is expired, so the refresh flow ran
        assert_eq!(oauth.calls(), 1);
    }

    #[tokio::test]
    async fn test_rejected_refresh_returns_false() {
        let store = Arc::new(MemoryStore::with_settings(&[(
            "access_token_expires",
            "0",
        )]));
        store.put_accounts(vec![test_account(1, "alice@example.com")]);
        let oauth = MockOauth::returning(400);
        let (gate, _) = gate_with(store, oauth.clone());

        assert!(!gate.ensure_fresh(1).await);
        assert_eq!(oauth.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_account_cannot_refresh() {
        let store = Arc::new(MemoryStore::new());
        let oauth = MockOauth::returning(200);
        let (gate, _) = gate_with(store, oauth.clone());

        assert!(!gate.ensure_fresh(42).await);
        assert_eq!(oauth.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_refresh_resyncs_registry() {
        let store = Arc::new(MemoryStore::with_settings(&[(
            "access_token_expires",
            "0",
        )]));
        store.put_accounts(vec![test_account(1, "old@example.com")]);
        let oauth = MockOauth::returning(200);
        let (gate, accounts) = gate_with(store.clone(), oauth);

        // Warm the account cache, then mutate the table behind it, the way
        // the refresh flow rewrites the stored record.
        assert_eq!(
            accounts.field(1, AccountField::AccountEmail, ""),
            "old@example.com"
        );
        store.put_accounts(vec![test_account(1, "new@example.com")]);

        assert!(gate.ensure_fresh(1).await);

        // The registry was repopulated before ensure_fresh returned.
        assert_eq!(
            accounts.field(1, AccountField::AccountEmail, ""),
            "new@example.com"
        );
    }
}
