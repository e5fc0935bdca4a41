// SPDX-License-Identifier: MIT OR Apache-2.0

//! The uniform result returned by every appliance operation.
//!
//! An [`Envelope`] says whether a mutation happened (or would happen in check
//! mode), carries the payload the appliance returned, and collects warnings
//! about skipped or unsupported work.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether the connected deployment can serve an API at all.
///
/// Set by the appliance client during its capability check. Operations branch
/// on this value to short-circuit instead of inspecting warning text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EnvironmentSupport {
    /// The API is available on this deployment.
    #[default]
    Supported,
    /// The API does not exist on this deployment.
    Unsupported(String),
}

impl EnvironmentSupport {
    /// Returns `true` for [`EnvironmentSupport::Unsupported`].
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, EnvironmentSupport::Unsupported(_))
    }
}

/// Result envelope for a single operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Whether a mutation occurred, or would occur in check mode.
    pub changed: bool,
    /// Payload returned by the appliance, usually a JSON object.
    #[serde(default = "empty_object")]
    pub data: Value,
    /// Ordered, human-readable warnings.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Whether the deployment supports the API that produced this envelope.
    #[serde(default)]
    pub support: EnvironmentSupport,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            changed: false,
            data: empty_object(),
            warnings: Vec::new(),
            support: EnvironmentSupport::Supported,
        }
    }
}

impl Envelope {
    /// An empty, unchanged envelope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An unchanged envelope carrying the given warnings.
    #[must_use]
    pub fn unchanged(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            ..Self::default()
        }
    }

    /// A changed envelope with no payload, as reported by check mode.
    #[must_use]
    pub fn planned_change(warnings: Vec<String>) -> Self {
        Self {
            changed: true,
            warnings,
            ..Self::default()
        }
    }

    /// An envelope for a deployment that cannot serve the API.
    ///
    /// The reason is also pushed onto `warnings` so that callers who only
    /// print warnings still see why nothing happened.
    #[must_use]
    pub fn unsupported(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            warnings: vec![reason.clone()],
            support: EnvironmentSupport::Unsupported(reason),
            ..Self::default()
        }
    }

    /// Set the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Set the change flag.
    #[must_use]
    pub fn with_changed(mut self, changed: bool) -> Self {
        self.changed = changed;
        self
    }

    /// Append a warning.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Look up a top-level field of an object payload.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_object().and_then(|map| map.get(name))
    }

    /// Look up a top-level string field of an object payload.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Whether the deployment reported the API as unsupported.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.support.is_unsupported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_envelope() {
        let env = Envelope::new();
        assert!(!env.changed);
        assert_eq!(env.data, json!({}));
        assert!(env.warnings.is_empty());
        assert_eq!(env.support, EnvironmentSupport::Supported);
    }

    #[test]
    fn test_unsupported_carries_reason_as_warning() {
        let env = Envelope::unsupported("not on containers");
        assert!(!env.changed);
        assert!(env.is_unsupported());
        assert_eq!(env.warnings, vec!["not on containers".to_string()]);
    }

    #[test]
    fn test_field_access() {
        let env = Envelope::new().with_data(json!({"server_config": "available", "n": 3}));
        assert_eq!(env.str_field("server_config"), Some("available"));
        assert_eq!(env.str_field("n"), None);
        assert_eq!(env.field("n"), Some(&json!(3)));
        assert!(env.field("missing").is_none());
    }

    #[test]
    fn test_field_on_non_object_payload() {
        let env = Envelope::new().with_data(json!([{"id": "a"}]));
        assert!(env.field("id").is_none());
    }

    #[test]
    fn test_serialize_shape() {
        let env = Envelope::planned_change(vec!["w".into()]);
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["changed"], json!(true));
        assert_eq!(value["warnings"], json!(["w"]));
        assert_eq!(value["support"]["status"], json!("supported"));
    }

    #[test]
    fn test_deserialize_minimal() {
        let env: Envelope = serde_json::from_str(r#"{"changed": false}"#).unwrap();
        assert_eq!(env, Envelope::new());
    }
}
