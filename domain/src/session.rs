use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::session_value::SessionValue;

/// Per-connection session: `{string → opaque}` plus `uid` (set once the
/// handshake/login completes) and the owning connection's `cid`. Lifecycle
/// equals connection lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub cid: String,
    pub uid: Option<String>,
    data: HashMap<String, SessionValue>,
}

impl Session {
    pub fn new(cid: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            uid: None,
            data: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.data.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<SessionValue>) {
        self.data.insert(key.into(), value.into());
    }

    /// Merges `incoming` into this session's map, but only if `uid` matches
    /// what this session currently holds — defense against a stale remote
    /// write racing a session that has since been reassigned or cleared. A
    /// session with no `uid` bound yet (the common case: no login flow ever
    /// sets one, so the first SessionSync after a user enters a room is
    /// what establishes it) adopts `uid` rather than rejecting the merge.
    pub fn merge_if_uid_matches(&mut self, uid: &str, incoming: &HashMap<String, SessionValue>) {
        match &self.uid {
            Some(existing) if existing != uid => return,
            _ => self.uid = Some(uid.to_string()),
        }
        for (k, v) in incoming {
            self.data.insert(k.clone(), v.clone());
        }
    }

    pub fn snapshot(&self) -> HashMap<String, SessionValue> {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_applies_when_uid_matches() {
        let mut s = Session::new("cid-1");
        s.uid = Some("user-a".into());
        s.put("score", 10i64);

        let mut incoming = HashMap::new();
        incoming.insert("score".to_string(), SessionValue::I64(99));

        s.merge_if_uid_matches("user-b", &incoming);
        assert_eq!(s.get("score"), Some(&SessionValue::I64(10)));

        s.merge_if_uid_matches("user-a", &incoming);
        assert_eq!(s.get("score"), Some(&SessionValue::I64(99)));
    }

    #[test]
    fn merge_adopts_uid_when_none_is_bound_yet() {
        let mut s = Session::new("cid-1");
        assert_eq!(s.uid, None);

        let mut incoming = HashMap::new();
        incoming.insert("room_id".to_string(), SessionValue::String("100000".into()));
        s.merge_if_uid_matches("user-a", &incoming);

        assert_eq!(s.uid.as_deref(), Some("user-a"));
        assert_eq!(s.get("room_id"), Some(&SessionValue::String("100000".into())));
    }
}
