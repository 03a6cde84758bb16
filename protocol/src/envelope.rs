use std::collections::HashMap;

use domain::SessionValue;
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Whether an envelope carries an ordinary routed message or a session
/// update pushed back to the owning edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EnvelopeKind {
    Normal = 0,
    SessionSync = 1,
}

/// What crosses the pub/sub fabric between an edge and a worker. JSON on
/// the wire (the subjects carry no binary framing of their own).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEnvelope {
    pub cid: String,
    pub uid: Option<String>,
    pub src_worker: String,
    pub dst_worker: String,
    pub route: Option<String>,
    pub body: Message,
    pub session_snapshot: HashMap<String, SessionValue>,
    pub kind: EnvelopeKind,
    pub push_users: Vec<String>,
}

impl RemoteEnvelope {
    pub fn request(
        cid: impl Into<String>,
        uid: Option<String>,
        src_worker: impl Into<String>,
        dst_worker: impl Into<String>,
        body: Message,
        session_snapshot: HashMap<String, SessionValue>,
    ) -> Self {
        let route = body.route.clone();
        Self {
            cid: cid.into(),
            uid,
            src_worker: src_worker.into(),
            dst_worker: dst_worker.into(),
            route,
            body,
            session_snapshot,
            kind: EnvelopeKind::Normal,
            push_users: Vec::new(),
        }
    }

    /// Builds the response envelope a worker sends back to the edge that
    /// dispatched the original request: swapped src/dst, `type=Response`.
    pub fn respond(&self, data: bytes::Bytes) -> Self {
        Self {
            cid: self.cid.clone(),
            uid: self.uid.clone(),
            src_worker: self.dst_worker.clone(),
            dst_worker: self.src_worker.clone(),
            route: None,
            body: Message::response(self.body.id, data),
            session_snapshot: HashMap::new(),
            kind: EnvelopeKind::Normal,
            push_users: Vec::new(),
        }
    }

    pub fn session_sync(
        cid: impl Into<String>,
        uid: String,
        src_worker: impl Into<String>,
        dst_worker: impl Into<String>,
        session_snapshot: HashMap<String, SessionValue>,
    ) -> Self {
        Self {
            cid: cid.into(),
            uid: Some(uid),
            src_worker: src_worker.into(),
            dst_worker: dst_worker.into(),
            route: None,
            body: Message::notify("session.sync", bytes::Bytes::new()),
            session_snapshot,
            kind: EnvelopeKind::SessionSync,
            push_users: Vec::new(),
        }
    }

    pub fn push(
        src_worker: impl Into<String>,
        route: impl Into<String>,
        data: bytes::Bytes,
        push_users: Vec<String>,
    ) -> Self {
        let route = route.into();
        Self {
            cid: String::new(),
            uid: None,
            src_worker: src_worker.into(),
            dst_worker: String::new(),
            route: Some(route.clone()),
            body: Message::push(route, data),
            session_snapshot: HashMap::new(),
            kind: EnvelopeKind::Normal,
            push_users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trips() {
        let env = RemoteEnvelope::request(
            "cid-1",
            Some("uid-1".into()),
            "gateway-1",
            "worker-1",
            Message::request(7, "room.user.enter", bytes::Bytes::from_static(b"abc")),
            HashMap::new(),
        );
        let json = serde_json::to_string(&env).unwrap();
        let back: RemoteEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.cid, env.cid);
        assert_eq!(back.body, env.body);
    }
}
