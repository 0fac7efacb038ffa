//! Per-request session view: a read snapshot plus a writable overlay.

use serde_json::{Map, Value};

/// Session entries as seen by one request.
///
/// The snapshot is what the backing store held when the request began; the
/// overlay accumulates mutations. The transport persists the overlay only
/// when [`SessionData::is_dirty`] reports a real difference, so read-only
/// requests never write back.
#[derive(Debug, Clone)]
pub struct SessionData {
    id: String,
    snapshot: Map<String, Value>,
    live: Map<String, Value>,
}

impl SessionData {
    #[must_use]
    pub fn new(id: impl Into<String>, entries: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            live: entries.clone(),
            snapshot: entries,
        }
    }

    /// An empty session with a fresh overlay.
    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self::new(id, Map::new())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.live.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.live.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.live.remove(key)
    }

    /// Whether the overlay differs from the snapshot by any key or value.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.live != self.snapshot
    }

    /// The current overlay entries.
    #[must_use]
    pub fn entries(&self) -> &Map<String, Value> {
        &self.live
    }

    /// Consume the view, yielding the overlay for persistence.
    #[must_use]
    pub fn into_entries(self) -> Map<String, Value> {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn untouched_session_is_clean() {
        let session = SessionData::new("s1", entries(&[("user", json!("ada"))]));
        assert!(!session.is_dirty());
        assert_eq!(session.get("user"), Some(&json!("ada")));
    }

    #[test]
    fn insert_marks_dirty() {
        let mut session = SessionData::empty("s1");
        session.insert("count", json!(1));
        assert!(session.is_dirty());
    }

    #[test]
    fn overwriting_with_the_same_value_stays_clean() {
        let mut session = SessionData::new("s1", entries(&[("user", json!("ada"))]));
        session.insert("user", json!("ada"));
        assert!(!session.is_dirty());
    }

    #[test]
    fn remove_marks_dirty() {
        let mut session = SessionData::new("s1", entries(&[("user", json!("ada"))]));
        assert_eq!(session.remove("user"), Some(json!("ada")));
        assert!(session.is_dirty());
        assert!(session.entries().is_empty());
    }
}
