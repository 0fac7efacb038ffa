//! Session loading, persistence, and cookie plumbing.
//!
//! The core treats the session purely as a resolver data source; this crate
//! owns everything around it: extracting the session id from the `Cookie`
//! header (minting a fresh one when absent), loading entries from a backing
//! store, and writing the overlay back only when a request actually changed
//! it.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use gantry_types::{Request, SessionData};

/// Default cookie carrying the session id.
pub const DEFAULT_COOKIE: &str = "gantry_session";

/// Session operation future type alias.
pub type SessionFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session backend unavailable: {message}")]
    Backend { message: String },
}

/// Backing store for session entries.
pub trait SessionStore: Send + Sync {
    fn load<'a>(&'a self, id: &'a str) -> SessionFut<'a, Option<Map<String, Value>>>;
    fn save<'a>(&'a self, id: &'a str, entries: Map<String, Value>) -> SessionFut<'a, ()>;
    fn remove<'a>(&'a self, id: &'a str) -> SessionFut<'a, ()>;
}

struct StoredSession {
    entries: Map<String, Value>,
    expires_at: DateTime<Utc>,
}

/// In-memory store with per-session expiry.
///
/// Expired sessions are dropped lazily on access; [`MemoryStore::purge_expired`]
/// sweeps the rest and is expected to be called periodically by the host.
pub struct MemoryStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let Ok(mut sessions) = self.sessions.lock() else {
            return 0;
        };
        let before = sessions.len();
        sessions.retain(|_, stored| stored.expires_at > now);
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired sessions");
        }
        purged
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|sessions| sessions.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredSession>>, SessionError> {
        self.sessions.lock().map_err(|_| SessionError::Backend {
            message: "session store lock poisoned".to_string(),
        })
    }
}

impl SessionStore for MemoryStore {
    fn load<'a>(&'a self, id: &'a str) -> SessionFut<'a, Option<Map<String, Value>>> {
        let result = (|| {
            let mut sessions = self.lock()?;
            let Some(stored) = sessions.get(id) else {
                return Ok(None);
            };
            if stored.expires_at > Utc::now() {
                return Ok(Some(stored.entries.clone()));
            }
            sessions.remove(id);
            Ok(None)
        })();
        Box::pin(std::future::ready(result))
    }

    fn save<'a>(&'a self, id: &'a str, entries: Map<String, Value>) -> SessionFut<'a, ()> {
        let result = self.lock().map(|mut sessions| {
            sessions.insert(
                id.to_string(),
                StoredSession {
                    entries,
                    expires_at: Utc::now() + self.ttl,
                },
            );
        });
        Box::pin(std::future::ready(result))
    }

    fn remove<'a>(&'a self, id: &'a str) -> SessionFut<'a, ()> {
        let result = self.lock().map(|mut sessions| {
            sessions.remove(id);
        });
        Box::pin(std::future::ready(result))
    }
}

/// Pull `name` out of a `Cookie` header value.
#[must_use]
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

/// Session id for a request: the cookie's value, or a freshly minted v4 UUID.
///
/// The boolean is `true` when the id is fresh and the transport should set
/// the cookie on the way out.
#[must_use]
pub fn session_id_from(request: &Request, cookie_name: &str) -> (String, bool) {
    if let Some(id) = request
        .header("cookie")
        .and_then(|header| cookie_value(header, cookie_name))
        .filter(|id| !id.is_empty())
    {
        return (id.to_string(), false);
    }
    (Uuid::new_v4().to_string(), true)
}

/// Load the session view for `id`, empty when the store has nothing.
pub async fn open(store: &dyn SessionStore, id: &str) -> Result<SessionData, SessionError> {
    let entries = store.load(id).await?.unwrap_or_default();
    Ok(SessionData::new(id, entries))
}

/// Write the overlay back, but only when the request changed something.
pub async fn persist(store: &dyn SessionStore, session: SessionData) -> Result<bool, SessionError> {
    if !session.is_dirty() {
        return Ok(false);
    }
    let id = session.id().to_string();
    store.save(&id, session.into_entries()).await?;
    tracing::debug!(session = %id, "session persisted");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new(60)
    }

    #[test]
    fn cookie_value_finds_named_pair() {
        let header = "theme=dark; gantry_session=abc123; lang=en";
        assert_eq!(cookie_value(header, "gantry_session"), Some("abc123"));
        assert_eq!(cookie_value(header, "theme"), Some("dark"));
        assert_eq!(cookie_value(header, "missing"), None);
    }

    #[test]
    fn session_id_prefers_the_cookie() {
        let request =
            Request::new("GET", "/").with_headers([("Cookie", "gantry_session=abc123")]);
        let (id, fresh) = session_id_from(&request, DEFAULT_COOKIE);
        assert_eq!(id, "abc123");
        assert!(!fresh);
    }

    #[test]
    fn session_id_is_minted_when_absent() {
        let request = Request::new("GET", "/");
        let (id, fresh) = session_id_from(&request, DEFAULT_COOKIE);
        assert!(fresh);
        assert_eq!(id.len(), 36);
    }

    #[tokio::test]
    async fn open_returns_empty_for_unknown_id() {
        let store = store();
        let session = open(&store, "nope").await.unwrap();
        assert!(session.entries().is_empty());
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn dirty_sessions_round_trip() {
        let store = store();
        let mut session = open(&store, "s1").await.unwrap();
        session.insert("count", json!(3));

        assert!(persist(&store, session).await.unwrap());

        let reloaded = open(&store, "s1").await.unwrap();
        assert_eq!(reloaded.get("count"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn clean_sessions_are_not_written() {
        let store = store();
        let session = open(&store, "s1").await.unwrap();
        assert!(!persist(&store, session).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped() {
        let store = MemoryStore::new(-1);
        store
            .save("s1", Map::from_iter([("k".to_string(), json!(1))]))
            .await
            .unwrap();

        assert_eq!(store.load("s1").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn purge_sweeps_expired_sessions() {
        let store = MemoryStore::new(-1);
        store.save("s1", Map::new()).await.unwrap();
        store.save("s2", Map::new()).await.unwrap();

        assert_eq!(store.purge_expired(), 2);
        assert!(store.is_empty());
    }
}
