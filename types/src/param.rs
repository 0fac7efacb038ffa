//! The argument currency flowing through parameter resolution.

use std::sync::Arc;

use serde_json::Value;

use crate::request::{Request, ResponseHandle};
use crate::{REQUEST_TOKEN, RESPONSE_TOKEN};

/// One resolved argument: plain data, or a live transport handle.
///
/// Transport handles get their own variants so error payloads can substitute
/// the placeholder tokens without ever serializing a live request or
/// response object.
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Plain data produced by a resolver or supplied as a fallback.
    Value(Value),
    /// The inbound request handle.
    Request(Arc<Request>),
    /// The outbound response handle.
    Response(ResponseHandle),
}

impl ParamValue {
    /// The null sentinel used for unresolved slots and exhausted fallbacks.
    #[must_use]
    pub const fn none() -> Self {
        Self::Value(Value::Null)
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Request(_) | Self::Response(_) => None,
        }
    }

    /// Extract the plain value, discarding transport handles.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(value) => value,
            Self::Request(_) | Self::Response(_) => Value::Null,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    /// Error-payload form: transport handles become placeholder tokens so a
    /// logged failure never re-serializes a live transport object.
    #[must_use]
    pub fn redacted(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Request(_) => Value::String(REQUEST_TOKEN.to_string()),
            Self::Response(_) => Value::String(RESPONSE_TOKEN.to_string()),
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Value(a), Self::Value(b)) => a == b,
            (Self::Request(a), Self::Request(b)) => Arc::ptr_eq(a, b),
            (Self::Response(a), Self::Response(b)) => a.same_handle(b),
            _ => false,
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn none_is_the_null_sentinel() {
        assert!(ParamValue::none().is_none());
        assert!(!ParamValue::from("x").is_none());
    }

    #[test]
    fn redacted_replaces_transport_handles() {
        let request = Arc::new(Request::new("GET", "/"));
        assert_eq!(
            ParamValue::Request(Arc::clone(&request)).redacted(),
            json!(REQUEST_TOKEN)
        );
        assert_eq!(
            ParamValue::Response(ResponseHandle::new()).redacted(),
            json!(RESPONSE_TOKEN)
        );
        assert_eq!(ParamValue::from(json!({"id": 7})).redacted(), json!({"id": 7}));
    }

    #[test]
    fn request_equality_is_by_handle() {
        let request = Arc::new(Request::new("GET", "/"));
        let a = ParamValue::Request(Arc::clone(&request));
        let b = ParamValue::Request(Arc::clone(&request));
        let other = ParamValue::Request(Arc::new(Request::new("GET", "/")));
        assert_eq!(a, b);
        assert_ne!(a, other);
    }
}
