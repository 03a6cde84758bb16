//! The remote consumer: reads envelopes arriving on this gateway's own
//! pub/sub subject and either delivers a Response straight to its owning
//! `cid`, merges a `SessionSync`, or hands a Push envelope off to the push
//! consumer (`spec.md` §4.4, fan-out goroutine 2).

use std::sync::Arc;

use bytes::Bytes;
use protocol::{EnvelopeKind, Message, MessageKind, Packet, PacketType, RemoteEnvelope};
use pubsub::Subscription;
use tokio::sync::mpsc;

use crate::state::AppState;

pub async fn remote_consumer(
    state: Arc<AppState>,
    mut subscription: Box<dyn Subscription>,
    push_tx: mpsc::Sender<RemoteEnvelope>,
) {
    while let Some(bytes) = subscription.next().await {
        match serde_json::from_slice::<RemoteEnvelope>(&bytes) {
            Ok(envelope) => handle_envelope(&state, envelope, &push_tx).await,
            Err(err) => tracing::error!(?err, "malformed remote envelope, dropping"),
        }
    }
    tracing::warn!(server_id = %state.server_id, "remote subscription ended");
}

async fn handle_envelope(state: &Arc<AppState>, envelope: RemoteEnvelope, push_tx: &mpsc::Sender<RemoteEnvelope>) {
    match envelope.kind {
        EnvelopeKind::SessionSync => {
            let Some(conn) = state.connections.get(&envelope.cid) else {
                tracing::info!(cid = %envelope.cid, "session sync for unknown connection");
                return;
            };
            if let Some(uid) = &envelope.uid {
                conn.session.lock().await.merge_if_uid_matches(uid, &envelope.session_snapshot);
            }
        }
        EnvelopeKind::Normal => {
            if envelope.body.kind == MessageKind::Push {
                let _ = push_tx.send(envelope).await;
                return;
            }
            let Some(conn) = state.connections.get(&envelope.cid) else {
                tracing::info!(cid = %envelope.cid, "push to unknown connection");
                return;
            };
            // Normal, non-push envelopes arriving here are always worker
            // responses to a prior client request: rewrite to Response
            // and deliver (`spec.md` §4.4).
            let message = Message::response(envelope.body.id, envelope.body.data.clone());
            match Packet::new(PacketType::Data, message.encode()) {
                Ok(packet) => {
                    let _ = conn.outbound_tx.send(packet.encode()).await;
                }
                Err(err) => tracing::error!(?err, "failed to encode response packet"),
            }
        }
    }
}

pub async fn push_consumer(state: Arc<AppState>, mut rx: mpsc::Receiver<RemoteEnvelope>) {
    while let Some(envelope) = rx.recv().await {
        let route = envelope.route.clone().unwrap_or_default();
        let message = Message::push(route, envelope.body.data.clone());
        let packet = match Packet::new(PacketType::Data, message.encode()) {
            Ok(packet) => packet,
            Err(err) => {
                tracing::error!(?err, "failed to encode push packet");
                continue;
            }
        };
        let bytes: Bytes = packet.encode();

        if envelope.push_users.is_empty() {
            if let Some(conn) = state.connections.get(&envelope.cid) {
                let _ = conn.outbound_tx.send(bytes).await;
            } else {
                tracing::info!(cid = %envelope.cid, "push to unknown connection");
            }
            continue;
        }

        // Collect handles before awaiting anything: holding a DashMap shard
        // guard across an `.await` would block `connections.remove()` on
        // the same shard (strike eviction, disconnects) for as long as
        // this loop runs.
        let targets: Vec<_> = state
            .connections
            .iter()
            .map(|conn| (conn.outbound_tx.clone(), conn.session.clone()))
            .collect();

        for (outbound_tx, session) in targets {
            let matches_uid = {
                let session = session.lock().await;
                session
                    .uid
                    .as_deref()
                    .is_some_and(|uid| envelope.push_users.iter().any(|pu| pu == uid))
            };
            if matches_uid {
                let _ = outbound_tx.send(bytes.clone()).await;
            }
        }
    }
}
