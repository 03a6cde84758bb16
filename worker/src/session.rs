//! `WorkerSession`: adapts a [`RemoteEnvelope`] into the `GetUid`/`Get`/`Put`/
//! `Push` operations a handler needs (`spec.md` §4.5), grounded on the
//! original's `framework/net/session.go` merge-only-if-uid-match semantics.

use std::collections::HashMap;

use domain::SessionValue;
use protocol::RemoteEnvelope;

pub struct WorkerSession {
    pub cid: String,
    pub uid: Option<String>,
    src_worker: String,
    data: HashMap<String, SessionValue>,
    dirty: bool,
}

impl WorkerSession {
    pub fn from_envelope(envelope: &RemoteEnvelope) -> Self {
        Self {
            cid: envelope.cid.clone(),
            uid: envelope.uid.clone(),
            src_worker: envelope.src_worker.clone(),
            data: envelope.session_snapshot.clone(),
            dirty: false,
        }
    }

    pub fn get_uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// Binds the session to a uid once a handler resolves the game-level
    /// identity (e.g. `room.user.enter`'s request body) — the only place a
    /// uid is ever established, since this workspace runs no login flow
    /// (`spec.md` §1). Marks the session dirty when the uid actually
    /// changes, so `sync_envelope` fires even on a request that otherwise
    /// calls no `put`.
    pub fn set_uid(&mut self, uid: impl Into<String>) {
        let uid = uid.into();
        if self.uid.as_deref() != Some(uid.as_str()) {
            self.uid = Some(uid);
            self.dirty = true;
        }
    }

    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.data.get(key)
    }

    /// `session.Put(k,v)`. Marks the session dirty so the dispatcher emits
    /// a SessionSync envelope back to the owning edge after the handler
    /// returns (`spec.md` §4.5 step 4).
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<SessionValue>) {
        self.data.insert(key.into(), value.into());
        self.dirty = true;
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn snapshot(&self) -> HashMap<String, SessionValue> {
        self.data.clone()
    }

    /// Builds the SessionSync envelope to publish back to the edge that
    /// owns this `cid`, if and only if a handler called `put`.
    pub fn sync_envelope(&self, worker_id: &str) -> Option<RemoteEnvelope> {
        if !self.dirty {
            return None;
        }
        let uid = self.uid.clone()?;
        Some(RemoteEnvelope::session_sync(
            self.cid.clone(),
            uid,
            worker_id,
            self.src_worker.clone(),
            self.snapshot(),
        ))
    }
}
