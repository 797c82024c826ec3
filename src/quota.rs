//! Quota resolver
//!
//! Per-account cached lookup of remote storage quota, gated by the token
//! freshness check. A failed gate short-circuits to an empty result without
//! touching the network or the cache. A drive-info error envelope caches as
//! empty for the TTL window, so callers must tolerate an empty quota
//! persisting after a transient remote failure.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::accounts::{Account, AccountRegistry};
use crate::auth::TokenGate;
use crate::cache::TtlCache;
use crate::remote::DriveApi;
use crate::settings::SettingsStore;
use crate::size::SizeFormat;

/// Settings key holding the quota cache TTL in seconds.
const EXPIRES_SETTING: &str = "expires";

/// Used when the `expires` setting is absent, zero or unparseable.
const DEFAULT_QUOTA_TTL: Duration = Duration::from_secs(600);

/// Quota fields normalized to display strings.
pub type QuotaMap = BTreeMap<String, String>;

/// Token-gated, cached access to per-account storage quota.
pub struct QuotaResolver {
    gate: Arc<TokenGate>,
    accounts: Arc<AccountRegistry>,
    settings: Arc<SettingsStore>,
    drive: Arc<dyn DriveApi>,
    sizes: Arc<dyn SizeFormat>,
    cache: TtlCache<QuotaMap>,
}

impl QuotaResolver {
    pub fn new(
        gate: Arc<TokenGate>,
        accounts: Arc<AccountRegistry>,
        settings: Arc<SettingsStore>,
        drive: Arc<dyn DriveApi>,
        sizes: Arc<dyn SizeFormat>,
    ) -> Self {
        Self {
            gate,
            accounts,
            settings,
            drive,
            sizes,
            cache: TtlCache::new("quota"),
        }
    }

    /// The quota map for `account_id`
    ///
    /// Empty when the token is stale and unrefreshable, when the account is
    /// unknown, or when the remote call fails. The stale-token and
    /// unknown-account cases skip the cache entirely.
    pub async fn quota(&self, account_id: u64) -> QuotaMap {
        if !self.gate.ensure_fresh(account_id).await {
            warn!(account_id = account_id, "Token not fresh, skipping quota fetch");
            return QuotaMap::new();
        }

        let Some(account) = self.accounts.get(account_id) else {
            warn!(account_id = account_id, "No such account, no quota");
            return QuotaMap::new();
        };

        let key = format!("quota:{}", account_id);
        let ttl = self.quota_ttl();
        let result = self
            .cache
            .get_or_compute_async(&key, ttl, || self.fetch(account))
            .await;
        match result {
            Ok(quota) => quota,
            Err(e) => {
                warn!(account_id = account_id, error = %e, "Quota fetch failed");
                QuotaMap::new()
            }
        }
    }

    /// Project one quota field, or `default` when absent.
    pub async fn quota_field(&self, account_id: u64, field: &str, default: &str) -> String {
        self.quota(account_id)
            .await
            .get(field)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Producer for a cache miss: fetch from the drive endpoint, then
    /// normalize. Error envelopes come back `Ok(empty)` and get cached;
    /// transport failures come back `Err` and do not.
    async fn fetch(&self, account: Account) -> Result<QuotaMap> {
        let response = self.drive.drive_info(&account).await?;
        if response.errno != 0 {
            warn!(
                account_id = account.id,
                errno = response.errno,
                "Drive info error envelope, caching empty quota"
            );
            return Ok(QuotaMap::new());
        }

        debug!(
            account_id = account.id,
            fields = response.data.quota.len(),
            "Caching quota"
        );
        Ok(self.normalize(response.data.quota))
    }

    /// Strings pass through untouched; every other field is a raw byte count
    /// that gets display formatting.
    fn normalize(&self, raw: BTreeMap<String, Value>) -> QuotaMap {
        raw.into_iter()
            .map(|(name, value)| {
                let display = match value {
                    Value::String(s) => s,
                    other => self.sizes.convert(other.as_f64().unwrap_or(0.0)),
                };
                (name, display)
            })
            .collect()
    }

    /// TTL from the dynamic `expires` setting, guarded against zero and
    /// unparseable values.
    fn quota_ttl(&self) -> Duration {
        let raw = self.settings.get(EXPIRES_SETTING, "");
        match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_QUOTA_TTL,
        }
    }
}
