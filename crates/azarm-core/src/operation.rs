//! Declarative per-operation metadata.
//!
//! Each resource client describes its operations as `const` [`OperationSpec`]
//! values (name, verb, path template, pinned `api-version`, accepted status
//! codes). [`crate::client::ArmClient`] derives the actual calls from them.

use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Put,
    Post,
    Patch,
    Delete,
    Head,
}

impl Verb {
    pub fn method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Put => Method::PUT,
            Self::Post => Method::POST,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
            Self::Head => Method::HEAD,
        }
    }
}

/// Where the final resource of a long-running operation is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalStateVia {
    AzureAsyncOperation,
    Location,
    OriginalUri,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// `Client.Operation`, used for logging and resume-token matching.
    pub name: &'static str,
    pub verb: Verb,
    pub path: &'static str,
    pub api_version: &'static str,
    pub accepted: &'static [u16],
    pub final_state_via: Option<FinalStateVia>,
}

impl OperationSpec {
    pub const fn new(
        name: &'static str,
        verb: Verb,
        path: &'static str,
        api_version: &'static str,
        accepted: &'static [u16],
    ) -> Self {
        Self {
            name,
            verb,
            path,
            api_version,
            accepted,
            final_state_via: None,
        }
    }

    pub const fn with_final_state_via(self, via: FinalStateVia) -> Self {
        Self {
            final_state_via: Some(via),
            ..self
        }
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.accepted.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELETE: OperationSpec = OperationSpec::new(
        "WidgetsClient.BeginDelete",
        Verb::Delete,
        "/widgets/{name}",
        "2021-01-01",
        &[200, 202, 204],
    )
    .with_final_state_via(FinalStateVia::Location);

    #[test]
    fn const_table_entry() {
        assert_eq!(DELETE.verb.method(), Method::DELETE);
        assert!(DELETE.accepts(202));
        assert!(!DELETE.accepts(201));
        assert_eq!(DELETE.final_state_via, Some(FinalStateVia::Location));
    }

    #[test]
    fn final_state_via_wire_names() {
        assert_eq!(
            serde_json::to_string(&FinalStateVia::AzureAsyncOperation).unwrap(),
            "\"azure-async-operation\""
        );
        assert_eq!(
            serde_json::from_str::<FinalStateVia>("\"original-uri\"").unwrap(),
            FinalStateVia::OriginalUri
        );
    }
}
