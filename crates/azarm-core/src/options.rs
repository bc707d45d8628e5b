//! Client configuration: cloud endpoints, retry policy, timeouts, telemetry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ArmError, ArmResult};

/// Longest `application_id` accepted in the `User-Agent` prefix.
pub const MAX_APPLICATION_ID_LEN: usize = 24;

// ── Cloud ────────────────────────────────────────────────────────────

/// Which Azure cloud the client talks to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CloudConfiguration {
    #[default]
    AzurePublic,
    AzureChina,
    AzureGovernment,
    Custom {
        resource_manager_endpoint: String,
        audience: String,
        authority_host: String,
    },
}

impl CloudConfiguration {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::AzurePublic => "https://management.azure.com",
            Self::AzureChina => "https://management.chinacloudapi.cn",
            Self::AzureGovernment => "https://management.usgovcloudapi.net",
            Self::Custom {
                resource_manager_endpoint,
                ..
            } => resource_manager_endpoint,
        }
    }

    pub fn audience(&self) -> &str {
        match self {
            Self::AzurePublic => "https://management.core.windows.net/",
            Self::AzureChina => "https://management.core.chinacloudapi.cn",
            Self::AzureGovernment => "https://management.core.usgovcloudapi.net",
            Self::Custom { audience, .. } => audience,
        }
    }

    pub fn authority_host(&self) -> &str {
        match self {
            Self::AzurePublic => "https://login.microsoftonline.com",
            Self::AzureChina => "https://login.chinacloudapi.cn",
            Self::AzureGovernment => "https://login.microsoftonline.us",
            Self::Custom { authority_host, .. } => authority_host,
        }
    }

    /// OAuth2 scope for the resource manager audience.
    pub fn scope(&self) -> String {
        format!("{}/.default", self.audience().trim_end_matches('/'))
    }
}

// ── Retry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryOptions {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    /// Base delay, doubled on each attempt.
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub status_codes: Vec<u16>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 60_000,
            status_codes: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryOptions {
    pub fn should_retry(&self, status: u16) -> bool {
        self.status_codes.contains(&status)
    }

    /// Exponential backoff for the given zero-based attempt, capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

// ── Telemetry ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Telemetry {
    /// Prepended to the `User-Agent` header.
    pub application_id: Option<String>,
    /// Suppress the SDK `User-Agent` entirely.
    pub disabled: bool,
}

// ── ClientOptions ────────────────────────────────────────────────────

/// Options shared by every client created from the same configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientOptions {
    pub cloud: CloudConfiguration,
    pub retry: RetryOptions,
    pub timeout_secs: u64,
    pub telemetry: Telemetry,
    /// Overrides every operation's pinned `api-version`.
    pub api_version: Option<String>,
    /// Permit bearer tokens over plain `http://` (local emulators only).
    pub insecure_allow_credential_with_http: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            cloud: CloudConfiguration::default(),
            retry: RetryOptions::default(),
            timeout_secs: 30,
            telemetry: Telemetry::default(),
            api_version: None,
            insecure_allow_credential_with_http: false,
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cloud(mut self, cloud: CloudConfiguration) -> Self {
        self.cloud = cloud;
        self
    }

    pub fn with_endpoint(self, endpoint: impl Into<String>) -> Self {
        let audience = self.cloud.audience().to_string();
        let authority_host = self.cloud.authority_host().to_string();
        self.with_cloud(CloudConfiguration::Custom {
            resource_manager_endpoint: endpoint.into(),
            audience,
            authority_host,
        })
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Fail-fast validation run once per client construction.
    pub fn validate(&self) -> ArmResult<Url> {
        let endpoint = Url::parse(self.cloud.endpoint()).map_err(|e| {
            ArmError::configuration(format!(
                "invalid resource manager endpoint {:?}: {e}",
                self.cloud.endpoint()
            ))
        })?;
        match endpoint.scheme() {
            "https" => {}
            "http" if self.insecure_allow_credential_with_http => {}
            other => {
                return Err(ArmError::configuration(format!(
                    "endpoint scheme {other:?} is not allowed; bearer tokens require https"
                )))
            }
        }
        if self.timeout_secs == 0 {
            return Err(ArmError::configuration("timeout_secs must be greater than zero"));
        }
        if let Some(app_id) = &self.telemetry.application_id {
            if app_id.len() > MAX_APPLICATION_ID_LEN || app_id.contains(char::is_whitespace) {
                return Err(ArmError::configuration(format!(
                    "application_id must be at most {MAX_APPLICATION_ID_LEN} characters without whitespace"
                )));
            }
        }
        if matches!(&self.api_version, Some(v) if v.trim().is_empty()) {
            return Err(ArmError::configuration("api_version override cannot be empty"));
        }
        Ok(endpoint)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
