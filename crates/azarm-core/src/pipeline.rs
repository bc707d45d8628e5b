//! The transport seam and the default bearer-token HTTP pipeline.
//!
//! [`HttpPipeline`] injects the `Authorization`, `x-ms-client-request-id`
//! and `User-Agent` headers, then sends the request with reqwest, retrying
//! throttled and transient statuses with exponential backoff. It never
//! judges whether a status is acceptable for an operation; that belongs to
//! [`crate::response`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use uuid::Uuid;

use crate::credential::TokenCredential;
use crate::error::{ArmError, ArmResult, ErrorKind};
use crate::http::{run_cancellable, sleep_cancellable, Context, RawResponse, Request};
use crate::options::{ClientOptions, RetryOptions, Telemetry};

pub const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// Sends a built request and returns the buffered response, whatever its status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request, ctx: &Context) -> ArmResult<RawResponse>;
}

/// Name and version of the client module, reported in `User-Agent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: &'static str,
    pub version: &'static str,
}

impl ModuleInfo {
    pub const fn new(name: &'static str, version: &'static str) -> Self {
        Self { name, version }
    }
}

/// `[<application_id> ]azsdk-rust-<module>/<version> (<os>)`, or `None` when disabled.
pub fn user_agent(module: &ModuleInfo, telemetry: &Telemetry) -> Option<String> {
    if telemetry.disabled {
        return None;
    }
    let sdk = format!(
        "azsdk-rust-{}/{} ({}; {})",
        module.name,
        module.version,
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    Some(match &telemetry.application_id {
        Some(app) if !app.is_empty() => format!("{app} {sdk}"),
        _ => sdk,
    })
}

/// Delay requested by the service via `retry-after-ms`, `x-ms-retry-after-ms`
/// or `Retry-After` (seconds or HTTP date), in that order of preference.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    for name in ["retry-after-ms", "x-ms-retry-after-ms"] {
        if let Some(ms) = header(name).and_then(|v| v.trim().parse::<u64>().ok()) {
            return Some(Duration::from_millis(ms));
        }
    }
    let value = header("retry-after")?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - Utc::now()).to_std().unwrap_or(Duration::ZERO))
}

// ── HttpPipeline ─────────────────────────────────────────────────────

/// Default [`Transport`]: reqwest with bearer auth, telemetry and retries.
pub struct HttpPipeline {
    http: Client,
    credential: Arc<dyn TokenCredential>,
    scope: String,
    retry: RetryOptions,
    user_agent: Option<String>,
    allow_http: bool,
}

impl HttpPipeline {
    pub fn new(
        module: ModuleInfo,
        credential: Arc<dyn TokenCredential>,
        options: &ClientOptions,
    ) -> ArmResult<Self> {
        options.validate()?;
        let http = Client::builder()
            .timeout(options.timeout())
            .build()
            .map_err(|e| ArmError::configuration(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            credential,
            scope: options.cloud.scope(),
            retry: options.retry.clone(),
            user_agent: user_agent(&module, &options.telemetry),
            allow_http: options.insecure_allow_credential_with_http,
        })
    }

    async fn authorize(&self, request: &mut Request, ctx: &Context) -> ArmResult<()> {
        if request.url().scheme() != "https" && !self.allow_http {
            return Err(ArmError::configuration(format!(
                "refusing to send a bearer token to non-https URL {}",
                request.url()
            )));
        }
        let token = self.credential.get_token(&[self.scope.as_str()], ctx).await?;
        request.insert_header(AUTHORIZATION, &format!("Bearer {}", token.token))
    }

    fn stamp(&self, request: &mut Request) -> ArmResult<()> {
        if request.header_str(CLIENT_REQUEST_ID).is_none() {
            request.insert_header(
                HeaderName::from_static(CLIENT_REQUEST_ID),
                &Uuid::new_v4().to_string(),
            )?;
        }
        if let Some(ua) = &self.user_agent {
            request.insert_header(USER_AGENT, ua)?;
        }
        Ok(())
    }

    async fn send_once(&self, request: &Request) -> ArmResult<RawResponse> {
        let mut builder = self
            .http
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }
        let resp = builder.send().await.map_err(|e| {
            ArmError::transport(format!("{} {}: {e}", request.method(), request.url()))
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ArmError::transport(format!("reading response body: {e}")))?;
        Ok(RawResponse::new(status, headers, body)
            .with_request(request.method().clone(), request.url().clone()))
    }
}

impl fmt::Debug for HttpPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPipeline")
            .field("scope", &self.scope)
            .field("retry", &self.retry)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpPipeline {
    async fn execute(&self, mut request: Request, ctx: &Context) -> ArmResult<RawResponse> {
        self.authorize(&mut request, ctx).await?;
        self.stamp(&mut request)?;

        let mut attempt = 0;
        loop {
            let outcome = run_cancellable(ctx, self.send_once(&request)).await;
            let retries_left = attempt < self.retry.max_retries;
            let delay = match outcome {
                Ok(ref resp) if retries_left && self.retry.should_retry(resp.status().as_u16()) => {
                    let delay = retry_after(resp.headers())
                        .unwrap_or_else(|| self.retry.delay_for(attempt));
                    warn!(
                        "ARM {} {} → {} – retrying in {}ms",
                        request.method(),
                        request.url(),
                        resp.status(),
                        delay.as_millis()
                    );
                    delay
                }
                Err(ref e) if retries_left && e.kind == ErrorKind::Transport => {
                    let delay = self.retry.delay_for(attempt);
                    warn!("ARM {} – retrying in {}ms", e.message, delay.as_millis());
                    delay
                }
                Ok(ref resp) => {
                    debug!("ARM {} {} → {}", request.method(), request.url(), resp.status());
                    return outcome;
                }
                Err(_) => return outcome,
            };
            sleep_cancellable(ctx, delay).await?;
            attempt += 1;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
