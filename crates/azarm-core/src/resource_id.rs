//! Parsing of service-assigned resource ids such as
//! `/subscriptions/{s}/resourceGroups/{g}/providers/{ns}/{type}/{name}[/{type}/{name}...]`.

use std::fmt;
use std::str::FromStr;

use crate::error::{ArmError, ArmResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    id: String,
    pub subscription_id: Option<String>,
    pub resource_group_name: Option<String>,
    pub provider_namespace: Option<String>,
    /// Type path below the provider, e.g. `virtualMachines/extensions`.
    pub resource_type: Option<String>,
    pub name: String,
}

impl ResourceId {
    pub fn parse(id: &str) -> ArmResult<Self> {
        let invalid =
            |why: &str| ArmError::request_build(format!("invalid resource ID {id:?}: {why}"));
        let rest = id.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;
        let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("empty segment"));
        }

        let mut parsed = Self {
            id: id.to_string(),
            subscription_id: None,
            resource_group_name: None,
            provider_namespace: None,
            resource_type: None,
            name: String::new(),
        };
        let mut types: Vec<&str> = Vec::new();
        let mut i = 0;
        while i < segments.len() {
            let key = segments[i];
            let value = segments
                .get(i + 1)
                .copied()
                .ok_or_else(|| invalid("odd number of segments"))?;
            if i == 0
                && key.eq_ignore_ascii_case("subscriptions")
                && parsed.subscription_id.is_none()
            {
                parsed.subscription_id = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("resourceGroups")
                && parsed.resource_group_name.is_none()
            {
                parsed.resource_group_name = Some(value.to_string());
            } else if key.eq_ignore_ascii_case("providers") {
                // `providers/{ns}/{type}/{name}`: the namespace takes the value slot.
                parsed.provider_namespace = Some(value.to_string());
                types.clear();
                i += 2;
                continue;
            } else {
                types.push(key);
            }
            parsed.name = value.to_string();
            i += 2;
        }
        if parsed.provider_namespace.is_some() && types.is_empty() {
            return Err(invalid("provider namespace without a resource type"));
        }
        if !types.is_empty() {
            parsed.resource_type = Some(types.join("/"));
        }
        Ok(parsed)
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl FromStr for ResourceId {
    type Err = ArmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
