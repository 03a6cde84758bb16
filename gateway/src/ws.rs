//! Per-connection accept and read/write loop pairing, grounded on the
//! teacher's `processing_module.rs` task-pairing-with-abort pattern: two
//! tasks are spawned per connection and whichever finishes first aborts
//! the other, so a dead write path doesn't leave a reader running forever
//! and vice versa.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use bytes::Bytes;
use domain::Session;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};

use crate::state::{AppState, ConnectionHandle, InboundFrame};

/// Read deadline (`spec.md` §4.4/§5).
pub const PONG_WAIT: Duration = Duration::from_secs(10);
/// Write deadline per send (`spec.md` §5).
pub const WRITE_WAIT: Duration = Duration::from_secs(10);
/// Ping interval, `0.9 * pong_wait` (`spec.md` §4.4).
pub const PING_WAIT: Duration = Duration::from_millis((PONG_WAIT.as_millis() as u64 * 9 / 10) as u64);
/// Max inbound frame body (`SPEC_FULL.md` §4.4), distinct from the Packet
/// codec's 2^24-1 ceiling on outbound Data bodies.
pub const MAX_INBOUND_BODY: usize = 1024;
/// Outbound per-connection queue depth.
const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Closing threshold for consecutive `MalformedFrame`/`MalformedMessage`
/// occurrences (`spec.md` §7).
pub const MAX_STRIKES: u8 = 3;

pub async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let cid = state.next_cid();
    let (sender, receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));
    let (outbound_tx, outbound_rx) = mpsc::channel::<Bytes>(OUTBOUND_QUEUE_CAPACITY);

    let session = Arc::new(Mutex::new(Session::new(cid.clone())));
    state.connections.insert(
        cid.clone(),
        ConnectionHandle {
            outbound_tx: outbound_tx.clone(),
            session,
            strikes: AtomicU8::new(0),
        },
    );
    tracing::info!(cid = %cid, "connection accepted");

    let mut read_task = {
        let state = state.clone();
        let cid = cid.clone();
        tokio::spawn(async move { read_loop(state, cid, receiver).await })
    };
    let mut write_task = {
        let cid = cid.clone();
        tokio::spawn(async move { write_loop(sender, outbound_rx, cid).await })
    };

    tokio::select! {
        _ = &mut read_task => { write_task.abort(); }
        _ = &mut write_task => { read_task.abort(); }
    }

    state.connections.remove(&cid);
    tracing::info!(cid = %cid, "connection closed");
}

/// Reads ws frames, enforces the inbound size limit and the binary-only
/// rule, and forwards raw bytes into the shared fan-in queue. Decoding the
/// Packet/Message framing happens in the client-packet consumer, not here
/// — this loop's only job is liveness (the `pong_wait` deadline) and
/// admission control.
async fn read_loop(state: Arc<AppState>, cid: String, mut receiver: SplitStream<WebSocket>) {
    loop {
        let next = match tokio::time::timeout(PONG_WAIT, receiver.next()).await {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(err))) => {
                tracing::debug!(cid = %cid, ?err, "read error");
                return;
            }
            Ok(None) => return,
            Err(_) => {
                tracing::info!(cid = %cid, "pong_wait elapsed, closing");
                return;
            }
        };

        match next {
            WsMessage::Binary(bytes) => {
                if bytes.len() > MAX_INBOUND_BODY {
                    tracing::warn!(cid = %cid, len = bytes.len(), "inbound frame exceeds max body size");
                    if strike(&state, &cid) {
                        return;
                    }
                    continue;
                }
                if state
                    .inbound_tx
                    .send(InboundFrame { cid: cid.clone(), bytes: Bytes::from(bytes.to_vec()) })
                    .await
                    .is_err()
                {
                    // Consumer is gone; nothing left to serve this connection.
                    return;
                }
            }
            WsMessage::Pong(_) => {
                // The next loop iteration's `timeout` is the deadline reset;
                // nothing else to do here.
            }
            WsMessage::Close(_) => return,
            WsMessage::Ping(_) | WsMessage::Text(_) => {
                tracing::warn!(cid = %cid, "rejected non-binary frame");
                if strike(&state, &cid) {
                    return;
                }
            }
        }
    }
}

/// Increments the connection's strike counter; returns `true` once the
/// three-strike threshold (`spec.md` §7) is reached.
fn strike(state: &AppState, cid: &str) -> bool {
    let Some(conn) = state.connections.get(cid) else {
        return true;
    };
    conn.strikes.fetch_add(1, Ordering::Relaxed) + 1 >= MAX_STRIKES
}

/// Drains the per-connection outbound queue, writing each entry as a
/// single binary frame, and sends a periodic Ping on `ping_wait` bounded
/// by `write_wait`.
async fn write_loop(
    sender: Arc<Mutex<SplitSink<WebSocket, WsMessage>>>,
    mut outbound_rx: mpsc::Receiver<Bytes>,
    cid: String,
) {
    let mut ping_tick = tokio::time::interval(PING_WAIT);
    ping_tick.tick().await; // first tick fires immediately; skip it.

    loop {
        tokio::select! {
            maybe_bytes = outbound_rx.recv() => {
                let Some(bytes) = maybe_bytes else { return };
                let mut guard = sender.lock().await;
                match tokio::time::timeout(WRITE_WAIT, guard.send(WsMessage::Binary(bytes.to_vec().into()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        tracing::debug!(cid = %cid, ?err, "write error, closing");
                        return;
                    }
                    Err(_) => {
                        tracing::debug!(cid = %cid, "write_wait elapsed, closing");
                        return;
                    }
                }
            }
            _ = ping_tick.tick() => {
                let mut guard = sender.lock().await;
                if tokio::time::timeout(WRITE_WAIT, guard.send(WsMessage::Ping(Vec::new().into()))).await.is_err() {
                    tracing::debug!(cid = %cid, "ping write timed out, closing");
                    return;
                }
            }
        }
    }
}
