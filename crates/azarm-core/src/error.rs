//! Error types shared by every ARM client.
//!
//! All failures surface as a single [`ArmError`] carrying a categorised
//! [`ErrorKind`]. Unacceptable HTTP statuses additionally carry the raw
//! response as a [`ResponseError`] so callers can inspect status, headers
//! and body.

use std::fmt;

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use crate::http::RawResponse;

/// Header ARM uses to report the service error code independently of the body.
pub const ERROR_CODE_HEADER: &str = "x-ms-error-code";

// ─── Error kinds ─────────────────────────────────────────────────────

/// Categorised error kinds for ARM operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad client construction input (endpoint, options, credential fields).
    Configuration,
    /// A request could not be built: empty path parameter, body serialization.
    RequestBuild,
    /// Network, timeout or connection failure reported by the pipeline.
    Transport,
    /// Token acquisition failed.
    Authentication,
    /// The service answered with a status outside the operation's accepted set.
    Api,
    /// The status was acceptable but the body did not match the expected shape.
    Deserialization,
    Pager,
    Poller,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration error"),
            Self::RequestBuild => write!(f, "Request build error"),
            Self::Transport => write!(f, "Transport error"),
            Self::Authentication => write!(f, "Authentication error"),
            Self::Api => write!(f, "API error"),
            Self::Deserialization => write!(f, "Deserialization error"),
            Self::Pager => write!(f, "Pager error"),
            Self::Poller => write!(f, "Poller error"),
            Self::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

// ─── Response error ──────────────────────────────────────────────────

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

/// An HTTP response whose status code the operation does not accept.
#[derive(Debug, Clone)]
pub struct ResponseError {
    /// Service error code from `x-ms-error-code` or the body, when present.
    pub error_code: Option<String>,
    pub detail: Option<ErrorDetail>,
    pub raw: RawResponse,
}

impl ResponseError {
    pub fn from_response(raw: RawResponse) -> Self {
        let detail = parse_error_detail(raw.body());
        let error_code = raw
            .header_str(ERROR_CODE_HEADER)
            .map(str::to_owned)
            .or_else(|| detail.as_ref().and_then(|d| d.code.clone()));
        Self {
            error_code,
            detail,
            raw,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.raw.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.raw.headers()
    }

    pub fn body(&self) -> &[u8] {
        self.raw.body()
    }

    pub fn method(&self) -> &Method {
        self.raw.request_method()
    }

    pub fn message(&self) -> Option<&str> {
        self.detail.as_ref().and_then(|d| d.message.as_deref())
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} → {}",
            self.raw.request_method(),
            self.raw.request_url(),
            self.raw.status()
        )?;
        if let Some(code) = &self.error_code {
            write!(f, " ({})", code)?;
        }
        match self.message() {
            Some(msg) => write!(f, ": {}", msg),
            None if !self.raw.body().is_empty() => {
                let text = String::from_utf8_lossy(self.raw.body());
                write!(f, ": {}", text.chars().take(500).collect::<String>())
            }
            None => Ok(()),
        }
    }
}

/// Parse either the enveloped `{"error": {...}}` shape or a bare `{code, message}`.
fn parse_error_detail(body: &[u8]) -> Option<ErrorDetail> {
    if body.is_empty() {
        return None;
    }
    if let Ok(ErrorEnvelope { error: Some(detail) }) = serde_json::from_slice(body) {
        return Some(detail);
    }
    serde_json::from_slice::<ErrorDetail>(body)
        .ok()
        .filter(|d| d.code.is_some() || d.message.is_some())
}

// ─── ArmError ────────────────────────────────────────────────────────

/// Main error type for ARM operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct ArmError {
    pub kind: ErrorKind,
    pub message: String,
    pub status_code: Option<u16>,
    response: Option<Box<ResponseError>>,
}

impl ArmError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            response: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn request_build(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestBuild, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Deserialization, message)
    }

    pub fn pager(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Pager, message)
    }

    pub fn poller(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Poller, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation was cancelled")
    }

    /// Wrap an unacceptable response.
    pub fn api(response: ResponseError) -> Self {
        Self {
            kind: ErrorKind::Api,
            message: response.to_string(),
            status_code: Some(response.status().as_u16()),
            response: Some(Box::new(response)),
        }
    }

    pub fn from_response(raw: RawResponse) -> Self {
        Self::api(ResponseError::from_response(raw))
    }

    /// The raw response behind an [`ErrorKind::Api`] error.
    pub fn response(&self) -> Option<&ResponseError> {
        self.response.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::Api && self.status_code == Some(404)
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl From<serde_json::Error> for ArmError {
    fn from(e: serde_json::Error) -> Self {
        Self::deserialization(format!("JSON: {e}"))
    }
}

impl From<url::ParseError> for ArmError {
    fn from(e: url::ParseError) -> Self {
        Self::configuration(format!("invalid URL: {e}"))
    }
}

impl From<ArmError> for String {
    fn from(e: ArmError) -> String {
        e.to_string()
    }
}

pub type ArmResult<T> = Result<T, ArmError>;

// ─── Tests ──────────────────────────────────────────────────────────
