//! Failure shapes produced by parameter resolution and action invocation.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Identity of the action a failure occurred in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRef {
    pub controller: String,
    pub action: String,
}

/// Underlying failure raised by a resolver, a lookup, or an action body.
///
/// `name` carries the error class when the failure source had one; plain
/// string rejections carry no class and are labeled `"Unknown"`. `extra`
/// holds any additional fields the source attached (e.g. `details`), passed
/// through to the escalated error untouched.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ResolveFailure {
    pub message: String,
    pub name: Option<String>,
    pub extra: Map<String, Value>,
}

impl ResolveFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: Some(name.into()),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl From<&str> for ResolveFailure {
    fn from(message: &str) -> Self {
        Self::named("Unknown", message)
    }
}

impl From<String> for ResolveFailure {
    fn from(message: String) -> Self {
        Self::named("Unknown", message)
    }
}

impl From<gantry_container::ContainerError> for ResolveFailure {
    fn from(error: gantry_container::ContainerError) -> Self {
        Self::new(error.to_string())
    }
}

/// Structured failure handed to error escalation.
///
/// `params` is the argument list as it stood when resolution stopped, with
/// live transport handles replaced by placeholder tokens, so serializing or
/// logging the error never touches a live transport object.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct ActionError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub meta: ActionRef,
    pub params: Vec<Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ActionError {
    #[must_use]
    pub fn new(meta: ActionRef, params: Vec<Value>, failure: ResolveFailure) -> Self {
        Self {
            message: failure.message,
            name: failure.name,
            meta,
            params,
            extra: failure.extra,
        }
    }
}

/// Failure modes surfaced by a bound action call.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A decoration was attached without a usable payload. Surfaces at the
    /// first invocation, never at registration.
    #[error("Invalid param decorator in class \"{class}\" method \"{method}\"")]
    InvalidDecoration { class: String, method: String },
    /// The action is not declared by the controller.
    #[error("unknown action \"{action}\" on controller \"{controller}\"")]
    UnknownAction { controller: String, action: String },
    /// Resolution or invocation failed.
    #[error(transparent)]
    Action(#[from] ActionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_rejections_are_labeled_unknown() {
        let failure = ResolveFailure::from("Invalid ID");
        assert_eq!(failure.message, "Invalid ID");
        assert_eq!(failure.name.as_deref(), Some("Unknown"));
    }

    #[test]
    fn extra_fields_pass_through_to_the_action_error() {
        let failure = ResolveFailure::named("LookupError", "no such record")
            .with_extra("details", json!({"key": 42}));
        let error = ActionError::new(
            ActionRef {
                controller: "WidgetController".to_string(),
                action: "show".to_string(),
            },
            vec![json!(42)],
            failure,
        );

        assert_eq!(error.message, "no such record");
        assert_eq!(error.extra["details"], json!({"key": 42}));

        let serialized = serde_json::to_value(&error).unwrap();
        assert_eq!(serialized["meta"]["action"], json!("show"));
        assert_eq!(serialized["params"], json!([42]));
    }

    #[test]
    fn invalid_decoration_message_is_exact() {
        let error = PipelineError::InvalidDecoration {
            class: "WidgetController".to_string(),
            method: "show".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid param decorator in class \"WidgetController\" method \"show\""
        );
    }
}
