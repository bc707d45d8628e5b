//! `nextLink` pagination.
//!
//! A [`Pager`] starts in the has-more state holding the original list
//! request. Each [`Pager::next_page`] fetches one page; a present, non-empty
//! `nextLink` keeps the pager in has-more, anything else exhausts it for good.
//! Follow-up requests use the link verbatim, only appending `api-version`
//! when the service left it out.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::stream::{self, Stream};
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ArmError, ArmResult};
use crate::http::{run_cancellable, Context, Request};
use crate::pipeline::Transport;
use crate::request::{get_request, API_VERSION};
use crate::response::handle;

/// A page of a list operation.
pub trait Page: DeserializeOwned {
    type Item;

    fn next_link(&self) -> Option<&str>;
    fn into_items(self) -> Vec<Self::Item>;
}

/// The standard ARM list envelope: `{"value": [...], "nextLink": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResult<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            next_link: None,
        }
    }
}

impl<T: DeserializeOwned> Page for ListResult<T> {
    type Item = T;

    fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }

    fn into_items(self) -> Vec<T> {
        self.value
    }
}

#[derive(Debug, Clone)]
enum PagerState {
    First(Request),
    Next(String),
    Exhausted,
}

pub struct Pager<P> {
    transport: Arc<dyn Transport>,
    state: PagerState,
    accepted: &'static [u16],
    api_version: Option<String>,
    operation: &'static str,
    _page: PhantomData<fn() -> P>,
}

impl<P> fmt::Debug for Pager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pager")
            .field("state", &self.state)
            .field("accepted", &self.accepted)
            .field("api_version", &self.api_version)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

impl<P: Page> Pager<P> {
    pub fn new(transport: Arc<dyn Transport>, first: Request, accepted: &'static [u16]) -> Self {
        let api_version = first.query_param(API_VERSION);
        Self {
            transport,
            state: PagerState::First(first),
            accepted,
            api_version,
            operation: "list",
            _page: PhantomData,
        }
    }

    /// Label used in log lines.
    pub fn named(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    pub fn more(&self) -> bool {
        !matches!(self.state, PagerState::Exhausted)
    }

    /// Fetch the next page. A failed fetch leaves the pager where it was, so
    /// the same page can be requested again.
    pub async fn next_page(&mut self, ctx: &Context) -> ArmResult<P> {
        let request = match &self.state {
            PagerState::First(req) => req.clone(),
            PagerState::Next(link) => {
                debug!("{} following nextLink {}", self.operation, link);
                get_request(link, self.api_version.as_deref())?
            }
            PagerState::Exhausted => {
                return Err(ArmError::pager(format!("{}: no more pages", self.operation)))
            }
        };
        let resp = run_cancellable(ctx, self.transport.execute(request, ctx)).await?;
        let page: P = handle(resp, self.accepted)?;
        self.state = match page.next_link() {
            Some(link) if !link.is_empty() => PagerState::Next(link.to_string()),
            _ => PagerState::Exhausted,
        };
        Ok(page)
    }

    /// Pages as a stream. The stream ends after the last page or after the
    /// first error.
    pub fn into_stream(self, ctx: Context) -> impl Stream<Item = ArmResult<P>> {
        stream::unfold((self, ctx), |(mut pager, ctx)| async move {
            if !pager.more() {
                return None;
            }
            let page = pager.next_page(&ctx).await;
            if page.is_err() {
                pager.state = PagerState::Exhausted;
            }
            Some((page, (pager, ctx)))
        })
    }

    /// Drain every remaining page into one list of items.
    pub async fn collect_all(mut self, ctx: &Context) -> ArmResult<Vec<P::Item>> {
        let mut all = Vec::new();
        while self.more() {
            all.extend(self.next_page(ctx).await?.into_items());
        }
        Ok(all)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
