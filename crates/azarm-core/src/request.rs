//! Request construction: endpoint + built path, `api-version`, optional
//! query parameters, `Accept` header and JSON body.
//!
//! Building is synchronous and happens before any network activity, so a
//! body that fails to serialize never leaves the process.

use bytes::Bytes;
use reqwest::header::{HeaderName, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::error::{ArmError, ArmResult};
use crate::http::Request;
use crate::url_template::join_paths;

pub const API_VERSION: &str = "api-version";
pub const APPLICATION_JSON: &str = "application/json";

impl Request {
    /// Start building a request for `path` relative to `endpoint`.
    pub fn builder(
        method: Method,
        endpoint: impl Into<String>,
        path: impl Into<String>,
    ) -> RequestBuilder {
        RequestBuilder::new(method, endpoint, path)
    }
}

/// Builder for a single operation request.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    endpoint: String,
    path: String,
    api_version: Option<String>,
    query: Vec<(String, String)>,
    headers: Vec<(HeaderName, String)>,
    accept: Option<String>,
    body: Option<ArmResult<Bytes>>,
}

impl RequestBuilder {
    pub fn new(method: Method, endpoint: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            path: path.into(),
            api_version: None,
            query: Vec::new(),
            headers: Vec::new(),
            accept: Some(APPLICATION_JSON.to_string()),
            body: None,
        }
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set `name` only when `value` is present.
    pub fn query_opt<V: ToString>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(name, v.to_string()),
            None => self,
        }
    }

    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Override the `Accept` header; `None` sends no `Accept` at all.
    pub fn accept(mut self, content_type: Option<&str>) -> Self {
        self.accept = content_type.map(str::to_owned);
        self
    }

    /// Serialize `body` as JSON. Errors are reported by [`Self::build`].
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.body = Some(
            serde_json::to_vec(body).map(Bytes::from).map_err(|e| {
                ArmError::request_build(format!("failed to serialize request body: {e}"))
            }),
        );
        self
    }

    pub fn build(self) -> ArmResult<Request> {
        let mut url = Url::parse(&join_paths(&self.endpoint, &self.path)).map_err(|e| {
            ArmError::configuration(format!("invalid request URL for {}: {e}", self.endpoint))
        })?;
        if let Some(v) = &self.api_version {
            set_query_param(&mut url, API_VERSION, v);
        }
        for (k, v) in &self.query {
            set_query_param(&mut url, k, v);
        }

        let mut req = Request::new(self.method, url);
        if let Some(accept) = &self.accept {
            req.insert_header(ACCEPT, accept)?;
        }
        for (name, value) in &self.headers {
            req.insert_header(name.clone(), value)?;
        }
        if let Some(body) = self.body {
            req.set_body(body?);
            req.insert_header(CONTENT_TYPE, APPLICATION_JSON)?;
        }
        Ok(req)
    }
}

/// Replace every existing `name` pair with a single `name=value`.
pub fn set_query_param(url: &mut Url, name: &str, value: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut pairs = url.query_pairs_mut();
    pairs.clear();
    for (k, v) in &kept {
        pairs.append_pair(k, v);
    }
    pairs.append_pair(name, value);
}

/// Append `name=value` only when the URL does not carry `name` yet.
pub fn ensure_query_param(url: &mut Url, name: &str, value: &str) {
    if !url.query_pairs().any(|(k, _)| k == name) {
        url.query_pairs_mut().append_pair(name, value);
    }
}

/// A bare GET against a service-supplied URL (next links, polling URLs).
pub fn get_request(link: &str, api_version: Option<&str>) -> ArmResult<Request> {
    let mut url = Url::parse(link).map_err(|e| {
        ArmError::request_build(format!("invalid service-supplied URL {link:?}: {e}"))
    })?;
    if let Some(v) = api_version {
        ensure_query_param(&mut url, API_VERSION, v);
    }
    let mut req = Request::new(Method::GET, url);
    req.insert_header(ACCEPT, APPLICATION_JSON)?;
    Ok(req)
}

// ─── Tests ──────────────────────────────────────────────────────────
