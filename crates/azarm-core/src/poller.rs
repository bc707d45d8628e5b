//! Long-running-operation poller.
//!
//! The strategy is picked from the initiating response:
//!
//! * `Azure-AsyncOperation` / `Operation-Location` header: poll the status
//!   monitor and read its `status` field;
//! * `Location` header: poll until something other than `202` comes back;
//! * `properties.provisioningState` in a `200`/`201` body: re-read the
//!   resource itself until the state is terminal;
//! * otherwise the operation already finished with the initial response.
//!
//! Pollers can be frozen into a JSON resume token and rebuilt later, also in
//! another process and against another transport.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ArmError, ArmResult};
use crate::http::{run_cancellable, sleep_cancellable, Context, RawResponse};
use crate::operation::{FinalStateVia, OperationSpec};
use crate::pipeline::{retry_after, Transport};
use crate::request::get_request;
use crate::response::check_status;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
const OPERATION_LOCATION: &str = "operation-location";
const LOCATION: &str = "location";

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    /// Service states are matched case-insensitively; anything unknown
    /// (`Creating`, `Updating`, `Accepted`, ...) counts as in progress.
    pub fn from_service(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::InProgress,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Strategy {
    StatusMonitor,
    Location,
    Body,
    Completed,
}

/// Everything a resume token carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PollerState {
    #[serde(rename = "type")]
    operation: String,
    strategy: Strategy,
    method: String,
    original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    polling_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    final_state_via: Option<FinalStateVia>,
    status: OperationStatus,
}

#[derive(Debug, Deserialize)]
struct StatusMonitor {
    status: Option<String>,
    #[serde(rename = "resourceLocation")]
    resource_location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProvisioningBody {
    properties: Option<ProvisioningProperties>,
}

#[derive(Debug, Deserialize)]
struct ProvisioningProperties {
    #[serde(rename = "provisioningState")]
    provisioning_state: Option<String>,
}

fn provisioning_state(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ProvisioningBody>(body)
        .ok()?
        .properties?
        .provisioning_state
}

// ── Options ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerOptions {
    /// Operation name recorded in (and required of) resume tokens.
    pub operation: String,
    pub final_state_via: Option<FinalStateVia>,
}

impl PollerOptions {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            final_state_via: None,
        }
    }
}

impl From<&OperationSpec> for PollerOptions {
    fn from(op: &OperationSpec) -> Self {
        Self {
            operation: op.name.to_string(),
            final_state_via: op.final_state_via,
        }
    }
}

// ── Poller ───────────────────────────────────────────────────────────

pub struct Poller<T> {
    transport: Arc<dyn Transport>,
    state: PollerState,
    last_body: Bytes,
    retry_after: Option<Duration>,
    failure: Option<ArmError>,
    _result: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Poller<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Poller")
            .field("state", &self.state)
            .field("retry_after", &self.retry_after)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> Poller<T> {
    /// Start tracking an operation from its initiating response.
    pub fn new(
        initial: RawResponse,
        transport: Arc<dyn Transport>,
        options: PollerOptions,
    ) -> ArmResult<Self> {
        if !initial.status().is_success() {
            return Err(ArmError::from_response(initial));
        }
        let method = initial.request_method().clone();
        let header = |name: &str| {
            initial
                .header_str(name)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };
        let monitor = header(AZURE_ASYNC_OPERATION).or_else(|| header(OPERATION_LOCATION));
        let location = header(LOCATION);
        let body_state = provisioning_state(initial.body());

        let (strategy, polling_url, status) = if let Some(url) = monitor {
            (Strategy::StatusMonitor, Some(url), OperationStatus::InProgress)
        } else if let Some(url) = location.clone() {
            (Strategy::Location, Some(url), OperationStatus::InProgress)
        } else if initial.status().as_u16() == 202 {
            return Err(ArmError::poller(format!(
                "{}: 202 response carries no polling URL",
                options.operation
            )));
        } else {
            let status = body_state
                .as_deref()
                .map(OperationStatus::from_service)
                .unwrap_or(OperationStatus::Succeeded);
            let resumable = (method == Method::PUT || method == Method::PATCH)
                && matches!(initial.status().as_u16(), 200 | 201);
            match status {
                OperationStatus::InProgress if resumable => {
                    (Strategy::Body, Some(initial.request_url().to_string()), status)
                }
                OperationStatus::InProgress => {
                    (Strategy::Completed, None, OperationStatus::Succeeded)
                }
                _ => (Strategy::Completed, None, status),
            }
        };

        let failure = match status {
            OperationStatus::Failed | OperationStatus::Canceled => {
                Some(ArmError::from_response(initial.clone()))
            }
            _ => None,
        };
        let state = PollerState {
            operation: options.operation,
            strategy,
            method: method.to_string(),
            original_url: initial.request_url().to_string(),
            polling_url,
            location_url: location,
            resource_location: None,
            final_state_via: options.final_state_via,
            status,
        };
        debug!("{} poller started: {:?} {:?}", state.operation, state.strategy, state.status);
        Ok(Self {
            transport,
            state,
            last_body: initial.body_bytes(),
            retry_after: retry_after(initial.headers()),
            failure,
            _result: PhantomData,
        })
    }

    /// Rebuild a poller from [`Self::resume_token`] output.
    pub fn from_resume_token(
        token: &str,
        transport: Arc<dyn Transport>,
        options: PollerOptions,
    ) -> ArmResult<Self> {
        let state: PollerState = serde_json::from_str(token)
            .map_err(|e| ArmError::poller(format!("malformed resume token: {e}")))?;
        if state.operation != options.operation {
            return Err(ArmError::poller(format!(
                "resume token belongs to {}, not {}",
                state.operation, options.operation
            )));
        }
        if state.status.is_terminal() || state.strategy == Strategy::Completed {
            return Err(ArmError::poller("resume token describes a finished operation"));
        }
        if state.polling_url.is_none() {
            return Err(ArmError::poller("resume token has no polling URL"));
        }
        Ok(Self {
            transport,
            state,
            last_body: Bytes::new(),
            retry_after: None,
            failure: None,
            _result: PhantomData,
        })
    }

    pub fn resume_token(&self) -> ArmResult<String> {
        if self.done() {
            return Err(ArmError::poller("cannot create a resume token for a finished operation"));
        }
        serde_json::to_string(&self.state)
            .map_err(|e| ArmError::poller(format!("resume token: {e}")))
    }

    pub fn done(&self) -> bool {
        self.state.status.is_terminal()
    }

    pub fn status(&self) -> OperationStatus {
        self.state.status
    }

    /// Delay the service asked for on its last response.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// One status check. A finished poller answers without a network call.
    pub async fn poll(&mut self, ctx: &Context) -> ArmResult<OperationStatus> {
        if self.done() {
            return Ok(self.state.status);
        }
        let url = self
            .state
            .polling_url
            .as_deref()
            .ok_or_else(|| ArmError::poller("no polling URL"))?;
        let request = get_request(url, None)?;
        let resp = run_cancellable(ctx, self.transport.execute(request, ctx)).await?;
        self.retry_after = retry_after(resp.headers());

        let status = match self.state.strategy {
            Strategy::StatusMonitor => {
                // Throttling or a server error on the monitor leaves the
                // operation in progress; only the reported status is final.
                let resp = check_status(resp, &[200, 201, 202])?;
                let monitor: StatusMonitor = resp.json()?;
                let state = monitor
                    .status
                    .ok_or_else(|| ArmError::poller("status monitor response has no status"))?;
                let status = OperationStatus::from_service(&state);
                if status == OperationStatus::Succeeded {
                    self.state.resource_location =
                        monitor.resource_location.filter(|u| !u.is_empty());
                }
                self.record(resp, status)
            }
            Strategy::Location => {
                let resp = self.checked(resp, &[200, 201, 202, 204])?;
                let status = if resp.status().as_u16() == 202 {
                    OperationStatus::InProgress
                } else {
                    OperationStatus::Succeeded
                };
                self.record(resp, status)
            }
            Strategy::Body => {
                let resp = self.checked(resp, &[200, 201, 202, 204])?;
                let status = match resp.status().as_u16() {
                    200 => provisioning_state(resp.body())
                        .as_deref()
                        .map(OperationStatus::from_service)
                        .unwrap_or(OperationStatus::Succeeded),
                    204 => OperationStatus::Succeeded,
                    _ => OperationStatus::InProgress,
                };
                self.record(resp, status)
            }
            Strategy::Completed => self.state.status,
        };
        debug!("{} poll → {:?}", self.state.operation, status);
        Ok(status)
    }

    fn checked(&mut self, resp: RawResponse, accepted: &[u16]) -> ArmResult<RawResponse> {
        check_status(resp, accepted).map_err(|e| {
            self.state.status = OperationStatus::Failed;
            self.failure = Some(e.clone());
            e
        })
    }

    fn record(&mut self, resp: RawResponse, status: OperationStatus) -> OperationStatus {
        if matches!(status, OperationStatus::Failed | OperationStatus::Canceled) {
            self.failure = Some(ArmError::from_response(resp.clone()));
        }
        self.last_body = resp.body_bytes();
        self.state.status = status;
        status
    }

    /// URL of the final GET for a succeeded operation, if one is needed.
    fn final_url(&self) -> Option<&str> {
        let s = &self.state;
        let put_or_patch = s.method == "PUT" || s.method == "PATCH";
        match s.strategy {
            Strategy::StatusMonitor => match (s.method.as_str(), s.final_state_via) {
                (_, Some(FinalStateVia::AzureAsyncOperation)) => None,
                _ if s.resource_location.is_some() => s.resource_location.as_deref(),
                (_, Some(FinalStateVia::Location)) => s.location_url.as_deref(),
                (_, Some(FinalStateVia::OriginalUri)) => Some(s.original_url.as_str()),
                ("PUT" | "PATCH", None) => Some(s.original_url.as_str()),
                ("POST", None) => s.location_url.as_deref(),
                _ => None,
            },
            Strategy::Location if put_or_patch && self.last_body.is_empty() => {
                Some(s.original_url.as_str())
            }
            _ => None,
        }
    }

    /// The final payload. Fails until the poller is done, and reports the
    /// service error when the operation failed or was canceled.
    pub async fn result(&self, ctx: &Context) -> ArmResult<T> {
        match self.state.status {
            OperationStatus::InProgress => {
                return Err(ArmError::poller(format!(
                    "{} has not reached a terminal state",
                    self.state.operation
                )))
            }
            OperationStatus::Failed | OperationStatus::Canceled => {
                return Err(self.failure.clone().unwrap_or_else(|| {
                    ArmError::poller(format!(
                        "{} ended in {:?}",
                        self.state.operation, self.state.status
                    ))
                }))
            }
            OperationStatus::Succeeded => {}
        }
        let body = match self.final_url() {
            Some(url) => {
                debug!("{} final GET {}", self.state.operation, url);
                let request = get_request(url, None)?;
                let resp = run_cancellable(ctx, self.transport.execute(request, ctx)).await?;
                check_status(resp, &[200, 201, 204])?.body_bytes()
            }
            None => self.last_body.clone(),
        };
        decode_final(&body)
    }

    /// Poll until terminal, sleeping `frequency` (or the service's
    /// `Retry-After`) between checks, then return [`Self::result`].
    pub async fn poll_until_done(&mut self, ctx: &Context, frequency: Duration) -> ArmResult<T> {
        if frequency.is_zero() {
            return Err(ArmError::poller("poll frequency must be greater than zero"));
        }
        while !self.done() {
            self.poll(ctx).await?;
            if self.done() {
                break;
            }
            let delay = self.retry_after.unwrap_or(frequency);
            sleep_cancellable(ctx, delay).await?;
        }
        self.result(ctx).await
    }
}

/// Empty final bodies decode as `null`, or as `{}` for types that reject `null`.
fn decode_final<T: DeserializeOwned>(body: &[u8]) -> ArmResult<T> {
    if body.is_empty() {
        return serde_json::from_slice(b"null")
            .or_else(|_| serde_json::from_slice(b"{}"))
            .map_err(|e| ArmError::deserialization(format!("empty final response: {e}")));
    }
    serde_json::from_slice(body)
        .map_err(|e| ArmError::deserialization(format!("final response: {e}")))
}

// ─── Tests ──────────────────────────────────────────────────────────
