//! Bearer-token credentials.
//!
//! [`TokenCredential`] is the seam the pipeline authenticates through.
//! [`ClientSecretCredential`] implements the Microsoft identity platform
//! client-credentials flow with a per-scope token cache;
//! [`StaticTokenCredential`] serves a pre-acquired token.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{ArmError, ArmResult};
use crate::http::{run_cancellable, Context};
use crate::options::CloudConfiguration;

/// Tokens expiring within this window are refreshed before use.
const REFRESH_WINDOW_SECS: i64 = 300;

// ── Token ────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AccessToken {
    pub token: String,
    #[serde(default)]
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_on {
            Some(exp) => Utc::now() >= exp,
            None => false,
        }
    }

    pub fn expires_within(&self, window: Duration) -> bool {
        match self.expires_on {
            Some(exp) => Utc::now() + window >= exp,
            None => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of bearer tokens for the pipeline.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[&str], ctx: &Context) -> ArmResult<AccessToken>;
}

// ── Static ───────────────────────────────────────────────────────────

/// Always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token, None),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scopes: &[&str], _ctx: &Context) -> ArmResult<AccessToken> {
        if self.token.token.is_empty() {
            return Err(ArmError::authentication("static token is empty"));
        }
        Ok(self.token.clone())
    }
}

// ── Client secret ────────────────────────────────────────────────────

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Service-principal credential (client-credentials grant).
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
    http: reqwest::Client,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> ArmResult<Self> {
        Self::with_authority(
            tenant_id,
            client_id,
            client_secret,
            CloudConfiguration::AzurePublic.authority_host(),
        )
    }

    pub fn with_authority(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        authority_host: impl Into<String>,
    ) -> ArmResult<Self> {
        let tenant_id = tenant_id.into();
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if tenant_id.is_empty() || client_id.is_empty() || client_secret.is_empty() {
            return Err(ArmError::configuration(
                "tenant_id, client_id, and client_secret are all required",
            ));
        }
        if !valid_tenant_id(&tenant_id) {
            return Err(ArmError::configuration(format!(
                "invalid tenant_id {tenant_id:?}: expected alphanumerics, '-' or '.'"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()
            .map_err(|e| ArmError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            authority_host: authority_host.into(),
            http,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Build from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`
    /// and optionally `AZURE_AUTHORITY_HOST`.
    pub fn from_env() -> ArmResult<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| {
                ArmError::configuration(format!("environment variable {name} is not set"))
            })
        };
        let authority = std::env::var("AZURE_AUTHORITY_HOST")
            .unwrap_or_else(|_| CloudConfiguration::AzurePublic.authority_host().to_string());
        Self::with_authority(
            var("AZURE_TENANT_ID")?,
            var("AZURE_CLIENT_ID")?,
            var("AZURE_CLIENT_SECRET")?,
            authority,
        )
    }

    fn token_url(&self) -> String {
        token_url(&self.authority_host, &self.tenant_id)
    }

    async fn request_token(&self, scope: &str) -> ArmResult<AccessToken> {
        let url = self.token_url();
        debug!("token request → {}", url);
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];
        let resp = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ArmError::authentication(format!("token request failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ArmError::authentication(format!("token response: {e}")))?;
        if !status.is_success() {
            return Err(ArmError::authentication(format!(
                "token endpoint returned {status}: {}",
                body.chars().take(500).collect::<String>()
            )));
        }
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ArmError::authentication(format!("token response JSON: {e}")))?;
        Ok(token_from_response(parsed))
    }
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority_host", &self.authority_host)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scopes: &[&str], ctx: &Context) -> ArmResult<AccessToken> {
        if scopes.is_empty() {
            return Err(ArmError::authentication("at least one scope is required"));
        }
        let key = scopes.join(" ");
        let mut cache = self.cache.lock().await;
        if let Some(tok) = cache.get(&key) {
            if !tok.expires_within(Duration::seconds(REFRESH_WINDOW_SECS)) {
                return Ok(tok.clone());
            }
        }
        let fresh = run_cancellable(ctx, self.request_token(&key)).await?;
        cache.insert(key, fresh.clone());
        Ok(fresh)
    }
}

/// Token endpoint URL for a tenant.
fn token_url(authority_host: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority_host.trim_end_matches('/'),
        tenant_id
    )
}

fn token_from_response(resp: TokenResponse) -> AccessToken {
    let expires_on = resp
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs as i64));
    AccessToken {
        token: resp.access_token,
        expires_on,
    }
}

fn valid_tenant_id(tenant: &str) -> bool {
    tenant
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

// ─── Tests ──────────────────────────────────────────────────────────
