//! # azarm-core
//!
//! Runtime shared by the Azure Resource Manager clients in this workspace.
//!
//! | Module | Role |
//! |--------|------|
//! | [`url_template`] | `{placeholder}` path substitution with empty-parameter checks |
//! | [`request`] | request construction (`api-version`, optional query, JSON body) |
//! | [`response`] | status checking and deserialization |
//! | [`pager`] | `nextLink` pagination |
//! | [`poller`] | long-running-operation polling and resume tokens |
//! | [`client`] | [`ArmClient`], the generic operation runner |
//! | [`pipeline`] | [`Transport`] seam and the default bearer-token HTTP pipeline |
//! | [`credential`] | token credentials |
//! | [`fake`] | in-memory transport for tests |

pub mod client;
pub mod credential;
pub mod error;
pub mod fake;
pub mod http;
pub mod operation;
pub mod options;
pub mod pager;
pub mod pipeline;
pub mod poller;
pub mod request;
pub mod resource_id;
pub mod response;
pub mod url_template;

pub use client::ArmClient;
pub use credential::{AccessToken, ClientSecretCredential, StaticTokenCredential, TokenCredential};
pub use error::{ArmError, ArmResult, ErrorKind, ResponseError};
pub use http::{Context, RawResponse, Request};
pub use operation::{FinalStateVia, OperationSpec, Verb};
pub use options::{ClientOptions, CloudConfiguration, RetryOptions, Telemetry};
pub use pager::{ListResult, Page, Pager};
pub use pipeline::{HttpPipeline, ModuleInfo, Transport};
pub use poller::{OperationStatus, Poller, PollerOptions};
pub use request::RequestBuilder;
pub use resource_id::ResourceId;
pub use url_template::PathTemplate;
