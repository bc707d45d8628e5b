//! Transport-level request/response values and the per-call [`Context`].

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{ArmError, ArmResult};

// ── Request ──────────────────────────────────────────────────────────

/// A fully built HTTP request, ready for a [`crate::pipeline::Transport`].
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Insert (replace) a header, rejecting values that are not valid header text.
    pub fn insert_header(&mut self, name: HeaderName, value: &str) -> ArmResult<()> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            ArmError::request_build(format!("invalid value for header {name}: {e}"))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    /// Query value for `name`, if present.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

// ── Response ─────────────────────────────────────────────────────────

/// Status, headers and fully-buffered body of an HTTP response, together
/// with the method and URL of the request that produced it.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    request_method: Method,
    request_url: Option<Url>,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            request_method: Method::GET,
            request_url: None,
        }
    }

    /// Attach the originating request line (pollers need it to pick a strategy).
    pub fn with_request(mut self, method: Method, url: Url) -> Self {
        self.request_method = method;
        self.request_url = Some(url);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }

    pub fn request_method(&self) -> &Method {
        &self.request_method
    }

    pub fn request_url(&self) -> &str {
        self.request_url.as_ref().map(Url::as_str).unwrap_or("")
    }

    /// Deserialize the body; an empty body is read as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self) -> ArmResult<T> {
        let bytes: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
        serde_json::from_slice(bytes).map_err(|e| {
            ArmError::deserialization(format!(
                "{} {} → {}: {e}",
                self.request_method,
                self.request_url(),
                self.status
            ))
        })
    }
}

// ── Context ──────────────────────────────────────────────────────────

/// Per-call context. Cancelling its token aborts the in-flight HTTP call
/// and any paging/polling loop using it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancellation: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// A child context: cancelled with this one, but cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
        }
    }
}

/// Race `fut` against the context's cancellation token.
pub async fn run_cancellable<F, T>(ctx: &Context, fut: F) -> ArmResult<T>
where
    F: Future<Output = ArmResult<T>>,
{
    if ctx.is_cancelled() {
        return Err(ArmError::cancelled());
    }
    tokio::select! {
        biased;
        _ = ctx.cancellation.cancelled() => Err(ArmError::cancelled()),
        result = fut => result,
    }
}

/// Sleep for `duration` unless the context is cancelled first.
pub async fn sleep_cancellable(ctx: &Context, duration: Duration) -> ArmResult<()> {
    run_cancellable(ctx, async {
        tokio::time::sleep(duration).await;
        Ok(())
    })
    .await
}

// ─── Tests ──────────────────────────────────────────────────────────
