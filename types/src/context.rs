//! The per-invocation data bag handed to every resolver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::request::{Request, ResponseHandle};
use crate::session::SessionData;

/// Shared, mutable session handle carried by a context.
pub type SharedSession = Arc<Mutex<SessionData>>;

/// Everything one invocation may draw parameter values from.
///
/// Built by the transport per inbound call; resolvers and action bodies only
/// ever see it behind a shared reference. Two invocations never share a
/// context.
#[derive(Debug, Clone)]
pub struct Context {
    request: Arc<Request>,
    response: ResponseHandle,
    path_params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Value,
    session: SharedSession,
}

impl Context {
    #[must_use]
    pub fn new(request: Arc<Request>) -> Self {
        Self {
            request,
            response: ResponseHandle::new(),
            path_params: HashMap::new(),
            query: HashMap::new(),
            body: Value::Null,
            session: Arc::new(Mutex::new(SessionData::empty(String::new()))),
        }
    }

    #[must_use]
    pub fn with_path_params(mut self, params: HashMap<String, String>) -> Self {
        self.path_params = params;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: SharedSession) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    #[must_use]
    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    #[must_use]
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Read one session entry from the live overlay.
    #[must_use]
    pub fn session_value(&self, key: &str) -> Option<Value> {
        self.session
            .lock()
            .ok()
            .and_then(|session| session.get(key).cloned())
    }
}
