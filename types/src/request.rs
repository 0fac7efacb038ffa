//! Transport snapshots: the immutable request and the writable response.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Immutable snapshot of an inbound request.
///
/// The transport builds one per call and shares it via `Arc`; resolvers only
/// ever read it. Header names are lowercased at construction so lookups are
/// case-insensitive.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    raw_query: String,
}

impl Request {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            raw_query: String::new(),
        }
    }

    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers.insert(name.into().to_lowercase(), value.into());
        }
        self
    }

    #[must_use]
    pub fn with_raw_query(mut self, raw_query: impl Into<String>) -> Self {
        self.raw_query = raw_query.into();
        self
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Accumulated outbound response state.
#[derive(Debug, Default, Clone)]
pub struct ResponseParts {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl ResponseParts {
    /// Whether anything has been written to this response.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.status.is_some() || self.body.is_some()
    }
}

/// Cheap-to-clone writable overlay for the outbound response.
///
/// Actions and recovery hooks write through it; the transport serializes it
/// exactly once after dispatch. A poisoned lock is treated as an untouched
/// response rather than propagated.
#[derive(Debug, Default, Clone)]
pub struct ResponseHandle {
    inner: Arc<Mutex<ResponseParts>>,
}

impl ResponseHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, status: u16) {
        if let Ok(mut parts) = self.inner.lock() {
            parts.status = Some(status);
        }
    }

    pub fn insert_header(&self, name: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut parts) = self.inner.lock() {
            parts.headers.push((name.into(), value.into()));
        }
    }

    /// Write a JSON body, setting the content type.
    pub fn write_json(&self, value: &Value) {
        if let Ok(mut parts) = self.inner.lock() {
            parts
                .headers
                .push(("content-type".to_string(), "application/json".to_string()));
            parts.body = Some(value.to_string().into_bytes());
        }
    }

    /// Write a plain-text body.
    pub fn write_text(&self, text: impl Into<String>) {
        if let Ok(mut parts) = self.inner.lock() {
            parts.body = Some(text.into().into_bytes());
        }
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.inner
            .lock()
            .map(|parts| parts.is_committed())
            .unwrap_or(false)
    }

    /// Snapshot the accumulated parts for serialization.
    #[must_use]
    pub fn snapshot(&self) -> ResponseParts {
        self.inner.lock().map(|parts| parts.clone()).unwrap_or_default()
    }

    /// Whether two handles refer to the same underlying response.
    #[must_use]
    pub fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request =
            Request::new("GET", "/widgets").with_headers([("Content-Type", "application/json")]);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(request.header("accept"), None);
    }

    #[test]
    fn fresh_response_is_uncommitted() {
        let response = ResponseHandle::new();
        assert!(!response.is_committed());
        assert!(response.snapshot().status.is_none());
    }

    #[test]
    fn writes_commit_the_response() {
        let response = ResponseHandle::new();
        response.set_status(201);
        response.write_json(&json!({"ok": true}));

        assert!(response.is_committed());
        let parts = response.snapshot();
        assert_eq!(parts.status, Some(201));
        assert_eq!(parts.body.as_deref(), Some(br#"{"ok":true}"# as &[u8]));
        assert!(parts
            .headers
            .iter()
            .any(|(name, value)| name == "content-type" && value == "application/json"));
    }

    #[test]
    fn clones_share_the_same_response() {
        let response = ResponseHandle::new();
        let clone = response.clone();
        clone.set_status(204);

        assert!(response.same_handle(&clone));
        assert_eq!(response.snapshot().status, Some(204));
        assert!(!response.same_handle(&ResponseHandle::new()));
    }
}
