//! The client-packet consumer: the single task that drains the shared
//! fan-in queue, decodes each raw frame as a [`Packet`], and dispatches by
//! packet type (`spec.md` §4.4).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use bytes::{Bytes, BytesMut};
use protocol::{HandshakeRequest, HandshakeResponse, Message, MessageKind, Packet, PacketType, RemoteEnvelope};

use crate::state::{AppState, InboundFrame};
use crate::ws::MAX_STRIKES;

pub async fn client_packet_consumer(
    state: Arc<AppState>,
    mut inbound_rx: tokio::sync::mpsc::Receiver<InboundFrame>,
) {
    while let Some(frame) = inbound_rx.recv().await {
        let mut buf = BytesMut::from(&frame.bytes[..]);
        match Packet::decode(&mut buf) {
            Ok(Some(packet)) => dispatch_packet(&state, &frame.cid, packet).await,
            Ok(None) => {
                tracing::warn!(cid = %frame.cid, "inbound frame did not contain a full packet");
                note_strike(&state, &frame.cid);
            }
            Err(err) => {
                tracing::error!(cid = %frame.cid, ?err, "malformed frame");
                note_strike(&state, &frame.cid);
            }
        }
    }
}

fn note_strike(state: &AppState, cid: &str) {
    if let Some(conn) = state.connections.get(cid) {
        if conn.strikes.fetch_add(1, Ordering::Relaxed) + 1 >= MAX_STRIKES {
            state.connections.remove(cid);
        }
    }
}

async fn send_packet(state: &AppState, cid: &str, packet: Packet) {
    if let Some(conn) = state.connections.get(cid) {
        let _ = conn.outbound_tx.send(packet.encode()).await;
    }
}

async fn dispatch_packet(state: &Arc<AppState>, cid: &str, packet: Packet) {
    match packet.kind {
        PacketType::Handshake => {
            let _request: Option<HandshakeRequest> = if packet.body.is_empty() {
                None
            } else {
                serde_json::from_slice(&packet.body).ok()
            };
            let heartbeat_secs = super::ws::PONG_WAIT.as_secs() as u32;
            let response = HandshakeResponse::ok(heartbeat_secs);
            let body = serde_json::to_vec(&response).expect("HandshakeResponse always serializes");
            match Packet::new(PacketType::Handshake, Bytes::from(body)) {
                Ok(packet) => send_packet(state, cid, packet).await,
                Err(err) => tracing::error!(?err, "failed to build handshake response"),
            }
        }
        PacketType::HandshakeAck => {
            // No-op: the client confirms, no session transition (spec.md §4.4).
        }
        PacketType::Heartbeat => match Packet::new(PacketType::Heartbeat, Bytes::new()) {
            Ok(packet) => send_packet(state, cid, packet).await,
            Err(err) => tracing::error!(?err, "failed to build heartbeat reply"),
        },
        PacketType::Data => match Message::decode(&packet.body) {
            Ok(message) => dispatch_message(state, cid, message).await,
            Err(err) => {
                tracing::error!(cid = %cid, ?err, "malformed message");
                note_strike(state, cid);
            }
        },
        PacketType::Kick => {
            // Server-initiated only; no behavior when received from a client.
        }
    }
}

/// Routes a decoded `Data` message either to a registered local handler or
/// across the fabric to a remote worker (`spec.md` §4.4).
async fn dispatch_message(state: &Arc<AppState>, cid: &str, message: Message) {
    let Some(route) = message.route.clone() else {
        tracing::warn!(cid = %cid, "data message with no route");
        return;
    };
    let Some(server_type) = route.split('.').next().filter(|s| !s.is_empty()) else {
        tracing::warn!(cid = %cid, %route, "route missing serverType segment");
        return;
    };

    if state.own_server_type().await.as_deref() == Some(server_type) {
        dispatch_local(state, cid, server_type, &route, message).await;
        return;
    }

    let Some(conn) = state.connections.get(cid) else {
        return;
    };
    let (uid, session_snapshot) = {
        let session = conn.session.lock().await;
        (session.uid.clone(), session.snapshot())
    };
    drop(conn);

    match state.pick_worker(server_type, cid).await {
        Some(worker_id) => {
            let envelope = RemoteEnvelope::request(cid, uid, &state.server_id, worker_id.clone(), message, session_snapshot);
            match serde_json::to_vec(&envelope) {
                Ok(bytes) => {
                    if let Err(err) = state.pubsub.publish(&worker_id, Bytes::from(bytes)).await {
                        tracing::warn!(%worker_id, ?err, "publish to worker failed, dropping (best-effort)");
                    }
                }
                Err(err) => tracing::error!(?err, "failed to serialize remote envelope"),
            }
        }
        None => {
            tracing::warn!(cid = %cid, %route, "unknown route: no server configured for serverType");
        }
    }
}

/// Local handlers this gateway answers to directly (`spec.md` §4.4: "If
/// `serverType` matches a configured local connector, dispatch to the
/// registered local handler synchronously"). Empty in this workspace — no
/// route in `spec.md`'s core is ever served locally at the edge, every
/// in-game route is handled by a `room`-type worker — but the dispatch
/// path is wired so a future local connector-side handler has somewhere
/// to register.
pub type LocalHandlers = HashMap<String, ()>;

async fn dispatch_local(state: &Arc<AppState>, cid: &str, server_type: &str, route: &str, message: Message) {
    tracing::warn!(cid = %cid, %server_type, %route, "no local handler registered for route");
    if message.kind == MessageKind::Request {
        let response = Message::response(message.id, Bytes::new());
        if let Ok(packet) = Packet::new(PacketType::Data, response.encode()) {
            send_packet(state, cid, packet).await;
        }
    }
}
