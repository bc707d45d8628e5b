//! In-memory [`Transport`] for tests: canned responses are served in FIFO
//! order and every request is recorded for later assertions.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::{ArmError, ArmResult};
use crate::http::{sleep_cancellable, Context, RawResponse, Request};
use crate::pipeline::Transport;

/// One canned response.
#[derive(Debug, Clone)]
pub struct FakeResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
    delay: Option<Duration>,
}

impl FakeResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
            delay: None,
        }
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Self {
        self.body = serde_json::to_vec(body).map(Bytes::from).unwrap_or_default();
        self.header(CONTENT_TYPE.as_str(), "application/json")
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Hold the response back for `delay` (cancellable through the context).
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn into_raw(self, request: &Request) -> ArmResult<RawResponse> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| ArmError::transport(format!("fake status {}: {e}", self.status)))?;
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ArmError::transport(format!("fake header {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ArmError::transport(format!("fake header value {value}: {e}")))?;
            headers.append(name, value);
        }
        Ok(RawResponse::new(status, headers, self.body)
            .with_request(request.method().clone(), request.url().clone()))
    }
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<FakeResponse>>,
    requests: Mutex<Vec<Request>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: impl IntoIterator<Item = FakeResponse>) -> Self {
        let fake = Self::new();
        for r in responses {
            fake.push(r);
        }
        fake
    }

    pub fn push(&self, response: FakeResponse) {
        lock(&self.responses).push_back(response);
    }

    /// Every request executed so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: Request, ctx: &Context) -> ArmResult<RawResponse> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.responses).pop_front();
        let Some(canned) = next else {
            return Err(ArmError::transport(format!(
                "no canned response queued for {} {}",
                request.method(),
                request.url()
            )));
        };
        if let Some(delay) = canned.delay {
            sleep_cancellable(ctx, delay).await?;
        }
        canned.into_raw(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use url::Url;

    fn get(url: &str) -> Request {
        Request::new(Method::GET, Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn serves_in_order_and_records() {
        let fake = FakeTransport::with_responses([
            FakeResponse::new(200).json(&serde_json::json!({"n": 1})),
            FakeResponse::new(404).header("x-ms-error-code", "NotFound"),
        ]);
        let ctx = Context::new();

        let a = fake.execute(get("https://h/a"), &ctx).await.unwrap();
        assert_eq!(a.status(), StatusCode::OK);
        assert_eq!(a.header_str("content-type"), Some("application/json"));
        assert_eq!(a.request_url(), "https://h/a");

        let b = fake.execute(get("https://h/b"), &ctx).await.unwrap();
        assert_eq!(b.status(), StatusCode::NOT_FOUND);
        assert_eq!(b.header_str("x-ms-error-code"), Some("NotFound"));

        let urls: Vec<String> = fake.requests().iter().map(|r| r.url().to_string()).collect();
        assert_eq!(urls, ["https://h/a", "https://h/b"]);
        assert_eq!(fake.remaining(), 0);
    }

    #[tokio::test]
    async fn empty_queue_is_transport_error() {
        let fake = FakeTransport::new();
        let e = fake.execute(get("https://h/a"), &Context::new()).await.unwrap_err();
        assert_eq!(e.kind, crate::error::ErrorKind::Transport);
        assert_eq!(fake.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_response_is_cancellable() {
        let fake =
            FakeTransport::with_responses([FakeResponse::new(200).delay(Duration::from_secs(60))]);
        let ctx = Context::new();
        ctx.cancel();
        let e = fake.execute(get("https://h/a"), &ctx).await.unwrap_err();
        assert!(e.is_cancelled());
    }
}
