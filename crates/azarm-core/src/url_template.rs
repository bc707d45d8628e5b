//! Path templating for ARM URLs.
//!
//! A template such as
//! `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`
//! is filled from named parameters. Every parameter is checked for
//! emptiness before anything is substituted, and values are escaped as a
//! single path segment unless registered with [`PathTemplate::raw_param`]
//! (scope-style parameters that legitimately contain `/`).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::{ArmError, ArmResult};

/// Everything except RFC 3986 unreserved characters gets escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Copy)]
struct Param<'a> {
    name: &'a str,
    value: &'a str,
    escape: bool,
}

/// Builder that validates and substitutes `{name}` placeholders.
#[derive(Debug, Clone)]
pub struct PathTemplate<'a> {
    template: &'a str,
    params: Vec<Param<'a>>,
}

impl<'a> PathTemplate<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            params: Vec::new(),
        }
    }

    pub fn template(&self) -> &'a str {
        self.template
    }

    /// Add a parameter whose value is escaped as one path segment.
    pub fn param(mut self, name: &'a str, value: &'a str) -> Self {
        self.params.push(Param {
            name,
            value,
            escape: true,
        });
        self
    }

    /// Add a parameter substituted verbatim (e.g. `{scope}`, `{resourceId}`).
    pub fn raw_param(mut self, name: &'a str, value: &'a str) -> Self {
        self.params.push(Param {
            name,
            value,
            escape: false,
        });
        self
    }

    /// Substitute every placeholder. Fails if any supplied parameter is empty
    /// or if a placeholder has no value.
    pub fn build(&self) -> ArmResult<String> {
        for p in &self.params {
            if p.value.is_empty() {
                return Err(ArmError::request_build(format!(
                    "parameter {} cannot be empty",
                    p.name
                )));
            }
        }
        let missing: Vec<&str> = placeholders(self.template)
            .into_iter()
            .filter(|name| !self.params.iter().any(|p| p.name == *name))
            .collect();
        if !missing.is_empty() {
            return Err(ArmError::request_build(format!(
                "missing path parameter {}",
                missing.join(", ")
            )));
        }

        let mut out = String::with_capacity(self.template.len() + 64);
        let mut rest = self.template;
        while let Some(open) = rest.find('{') {
            let close = rest[open..].find('}').map(|i| open + i).ok_or_else(|| {
                ArmError::request_build(format!("unterminated placeholder in {}", self.template))
            })?;
            out.push_str(&rest[..open]);
            let name = &rest[open + 1..close];
            let param = self
                .params
                .iter()
                .find(|p| p.name == name)
                .ok_or_else(|| {
                    ArmError::request_build(format!("missing path parameter {name}"))
                })?;
            if param.escape {
                out.push_str(&escape_segment(param.value));
            } else {
                out.push_str(param.value);
            }
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Placeholder names in template order.
fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        match rest[open..].find('}') {
            Some(len) => {
                names.push(&rest[open + 1..open + len]);
                rest = &rest[open + len + 1..];
            }
            None => break,
        }
    }
    names
}

/// Percent-escape `value` for use as a single path segment.
pub fn escape_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Join an endpoint and a path with exactly one `/` between them.
pub fn join_paths(root: &str, path: &str) -> String {
    let root = root.trim_end_matches('/');
    if path.is_empty() {
        return root.to_string();
    }
    format!("{}/{}", root, path.trim_start_matches('/'))
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const LOCK_PATH: &str =
        "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Authorization/locks/{lockName}";

    #[test]
    fn substitutes_all_placeholders() {
        let path = PathTemplate::new(LOCK_PATH)
            .param("subscriptionId", "sub1")
            .param("resourceGroupName", "rg1")
            .param("lockName", "no-delete")
            .build()
            .unwrap();
        assert_eq!(
            path,
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Authorization/locks/no-delete"
        );
    }

    #[test]
    fn empty_parameter_names_the_parameter() {
        let err = PathTemplate::new(LOCK_PATH)
            .param("subscriptionId", "sub1")
            .param("resourceGroupName", "")
            .param("lockName", "l")
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RequestBuild);
        assert!(err.message.contains("resourceGroupName cannot be empty"));
    }

    #[test]
    fn empty_check_runs_before_substitution() {
        // lockName appears last in the template but is still reported
        // even though subscriptionId would also be missing.
        let err = PathTemplate::new(LOCK_PATH)
            .param("lockName", "")
            .build()
            .unwrap_err();
        assert!(err.message.contains("lockName cannot be empty"));
    }

    #[test]
    fn missing_placeholder_value() {
        let err = PathTemplate::new(LOCK_PATH)
            .param("subscriptionId", "sub1")
            .param("resourceGroupName", "rg1")
            .build()
            .unwrap_err();
        assert!(err.message.contains("missing path parameter lockName"));

        let err = PathTemplate::new(LOCK_PATH).build().unwrap_err();
        assert!(err
            .message
            .contains("missing path parameter subscriptionId, resourceGroupName, lockName"));
    }

    #[test]
    fn values_are_segment_escaped() {
        let path = PathTemplate::new("/a/{name}")
            .param("name", "my vm/x?y#z%")
            .build()
            .unwrap();
        assert_eq!(path, "/a/my%20vm%2Fx%3Fy%23z%25");
    }

    #[test]
    fn raw_params_keep_slashes() {
        let path = PathTemplate::new("/{scope}/providers/Microsoft.Authorization/locks")
            .raw_param("scope", "subscriptions/s1/resourceGroups/rg1")
            .build()
            .unwrap();
        assert_eq!(
            path,
            "/subscriptions/s1/resourceGroups/rg1/providers/Microsoft.Authorization/locks"
        );
    }

    #[test]
    fn unreserved_characters_untouched() {
        assert_eq!(escape_segment("rg-1_a.b~c"), "rg-1_a.b~c");
        assert_eq!(escape_segment("é"), "%C3%A9");
    }

    #[test]
    fn placeholder_listing() {
        assert_eq!(
            placeholders(LOCK_PATH),
            vec!["subscriptionId", "resourceGroupName", "lockName"]
        );
        assert!(placeholders("/providers/Microsoft.Compute/operations").is_empty());
    }

    #[test]
    fn join_paths_single_slash() {
        assert_eq!(
            join_paths("https://management.azure.com/", "/subscriptions/s"),
            "https://management.azure.com/subscriptions/s"
        );
        assert_eq!(
            join_paths("https://management.azure.com", "subscriptions/s"),
            "https://management.azure.com/subscriptions/s"
        );
        assert_eq!(join_paths("https://h/", ""), "https://h");
    }
}
