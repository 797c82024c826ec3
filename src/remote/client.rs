//! Drive service HTTP client
//!
//! Talks to the Graph drive endpoint and the OAuth token endpoint. Requests
//! are single-attempt with a fixed timeout; callers degrade to empty results
//! rather than retrying. The account's type picks the worldwide or 21Vianet
//! endpoint family.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::errors::RemoteError;
use super::types::{DriveInfoResponse, GraphDrive};
use crate::accounts::Account;
use crate::auth::{OauthApi, RefreshResponse};

/// HTTP client timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Worldwide endpoints
const OAUTH_URL_COM: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";
const API_URL_COM: &str = "https://graph.microsoft.com/v1.0";

/// 21Vianet (China) endpoints
const OAUTH_URL_CN: &str = "https://login.partner.microsoftonline.cn/common/oauth2/v2.0/token";
const API_URL_CN: &str = "https://microsoftgraph.chinacloudapi.cn/v1.0";

/// App registration used for token refresh.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Override the token endpoint (tests, proxies). `None` selects by
    /// account type.
    pub oauth_url: Option<String>,
    /// Override the API base. `None` selects by account type.
    pub api_url: Option<String>,
}

/// Remote drive-info service. Success iff the envelope's `errno == 0`.
#[async_trait]
pub trait DriveApi: Send + Sync {
    async fn drive_info(&self, account: &Account) -> Result<DriveInfoResponse>;
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
}

/// Reqwest client implementing both remote collaborator interfaces.
pub struct DriveClient {
    http: Client,
    config: DriveConfig,
}

impl DriveClient {
    pub fn new(config: DriveConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { http, config })
    }

    fn oauth_url(&self, account: &Account) -> String {
        self.config.oauth_url.clone().unwrap_or_else(|| {
            if account.account_type.eq_ignore_ascii_case("cn") {
                OAUTH_URL_CN.to_string()
            } else {
                OAUTH_URL_COM.to_string()
            }
        })
    }

    fn api_url(&self, account: &Account) -> String {
        self.config.api_url.clone().unwrap_or_else(|| {
            if account.account_type.eq_ignore_ascii_case("cn") {
                API_URL_CN.to_string()
            } else {
                API_URL_COM.to_string()
            }
        })
    }
}

#[async_trait]
impl OauthApi for DriveClient {
    async fn refresh(&self, account: &Account) -> Result<RefreshResponse> {
        let url = self.oauth_url(account);
        debug!(account_id = account.id, url = %url, "Refreshing access token");

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("refresh_token", account.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(RemoteError::from_transport)
            .context("Failed to reach token endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                account_id = account.id,
                status = status.as_u16(),
                error = %RemoteError::from_status(status.as_u16(), &body),
                "Token endpoint rejected refresh"
            );
            return Ok(RefreshResponse {
                code: status.as_u16(),
                ..RefreshResponse::default()
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response")?;

        info!(
            account_id = account.id,
            expires_in = token.expires_in,
            "Access token refreshed"
        );
        Ok(RefreshResponse {
            code: 200,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
        })
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn drive_info(&self, account: &Account) -> Result<DriveInfoResponse> {
        let url = format!("{}/me/drive", self.api_url(account));
        debug!(account_id = account.id, url = %url, "Fetching drive info");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&account.access_token)
            .send()
            .await
            .map_err(RemoteError::from_transport)
            .context("Failed to reach drive endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                account_id = account.id,
                status = status.as_u16(),
                error = %RemoteError::from_status(status.as_u16(), &body),
                "Drive info request failed"
            );
            // Status errors travel in the envelope so callers can cache the
            // empty result for the TTL window.
            return Ok(DriveInfoResponse::err(i64::from(status.as_u16())));
        }

        let drive: GraphDrive = response
            .json()
            .await
            .context("Failed to parse drive info response")?;

        debug!(
            account_id = account.id,
            fields = drive.quota.len(),
            "Drive info fetched"
        );
        Ok(DriveInfoResponse::ok(drive.quota))
    }
}
