//! Room-backed route handlers: `room.user.create`, `room.user.enter`,
//! `room.user.ready`, and `room.game.<Op>` for each game's operation names
//! (`spec.md` §4.5/§4.7).

use std::sync::Arc;

use bytes::Bytes;
use conf::ConfigHandle;
use domain::{GameRule, SessionValue};
use platform::Error;
use pubsub::PubSub;
use rooms::{PUSH_ROUTE, Room, RoomEvent, UnionManager};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc;

use crate::session::WorkerSession;

/// Reads `key` from an explicit, possibly-empty wire value first, falling
/// back to whatever the session already holds (set by an earlier
/// `room.user.enter` on the same `cid`, carried forward by the SessionSync
/// round trip since this workspace has no login flow to establish `uid`
/// independently of the game-level identity the client supplies). Resolving
/// `game_uid` also binds it onto the session, since this is the only place
/// a handler ever learns the game-level identity of its own connection.
fn resolve(session: &mut WorkerSession, explicit: &str, key: &str) -> Result<String, Error> {
    let value = if !explicit.is_empty() {
        explicit.to_string()
    } else {
        match session.get(key) {
            Some(SessionValue::String(s)) => s.clone(),
            _ => return Err(Error::InvalidUser(format!("missing {key}"))),
        }
    };
    if key == "game_uid" {
        session.set_uid(value.clone());
    }
    Ok(value)
}

/// Everything a handler needs besides the session: the room registry, the
/// pub/sub client for cross-worker push fan-out, and this process's own
/// identity (`spec.md` §4.5).
pub struct WorkerCtx {
    pub server_id: String,
    pub unions: UnionManager,
    pub pubsub: Arc<dyn PubSub>,
    pub config: ConfigHandle,
}

impl WorkerCtx {
    pub fn new(server_id: String, pubsub: Arc<dyn PubSub>, config: ConfigHandle) -> Self {
        Self { server_id, unions: UnionManager::new(), pubsub, config }
    }

    /// Fans a push out to every configured connector server so each
    /// gateway's push consumer can filter by its own connected sessions
    /// (`RemoteEnvelope::push` carries no single destination worker —
    /// every connector-type server gets a copy and discards what it
    /// doesn't own).
    pub async fn push_to_users(&self, users: Vec<String>, route: &str, data: serde_json::Value) {
        if users.is_empty() {
            return;
        }
        let body = Bytes::from(serde_json::to_vec(&data).unwrap_or_default());
        let game = self.config.game().await;
        for connector in &game.servers_conf.connector {
            let envelope = protocol::RemoteEnvelope::push(&self.server_id, route, body.clone(), users.clone());
            match serde_json::to_vec(&envelope) {
                Ok(bytes) => {
                    if let Err(err) = self.pubsub.publish(&connector.server_id, Bytes::from(bytes)).await {
                        tracing::warn!(server_id = %connector.server_id, ?err, "push publish failed, dropping (best-effort)");
                    }
                }
                Err(err) => tracing::error!(?err, "failed to serialize push envelope"),
            }
        }
    }

    /// Delivers a room's [`RoomEvent`] feed onto the push fabric, resolving
    /// `Broadcast`'s implicit "every seated user" target via
    /// `Room::member_uids`. Used both for the events a synchronous handler
    /// call returns and for the room's own background event feed (kick
    /// timeouts, result resets).
    pub async fn deliver_room_events(&self, room: &Room, events: Vec<RoomEvent>) {
        for event in events {
            match event {
                RoomEvent::Broadcast { data } => {
                    let uids = room.member_uids().await;
                    self.push_to_users(uids, PUSH_ROUTE, data).await;
                }
                RoomEvent::PushTo { uids, data } => {
                    self.push_to_users(uids, PUSH_ROUTE, data).await;
                }
                RoomEvent::Dismissed => {
                    self.unions.dismiss_room(&room.id);
                }
            }
        }
    }

    /// Publishes a SessionSync for `session` right now, if it has anything
    /// to sync, instead of waiting for the dispatcher's end-of-handler
    /// check. `enter_room` calls this right after binding `uid` so the edge
    /// learns the uid before any room-entry Push reaches the push fabric —
    /// pub/sub preserves per-subject publish order (`spec.md` §5), so
    /// publishing the sync first guarantees `push_consumer` can already
    /// filter by it. Harmless if the dispatcher's own sync fires again
    /// afterward: SessionSync is idempotent for identical payloads.
    pub async fn publish_session_sync(&self, session: &WorkerSession) {
        let Some(sync) = session.sync_envelope(&self.server_id) else {
            return;
        };
        let dst = sync.dst_worker.clone();
        match serde_json::to_vec(&sync) {
            Ok(bytes) => {
                if let Err(err) = self.pubsub.publish(&dst, Bytes::from(bytes)).await {
                    tracing::warn!(%dst, ?err, "session sync publish failed, dropping (best-effort)");
                }
            }
            Err(err) => tracing::error!(?err, "failed to serialize session sync envelope"),
        }
    }

    /// Spawns the task that drains a freshly-created room's background
    /// event feed for as long as the room exists, forwarding everything
    /// it produces onto the push fabric.
    pub fn spawn_room_event_forwarder(self: &Arc<Self>, room: Room, mut events_rx: mpsc::UnboundedReceiver<RoomEvent>) {
        let ctx = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                ctx.deliver_room_events(&room, vec![event]).await;
            }
        });
    }
}

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    tenant_id: i64,
    game_type: GameTypeWire,
    #[serde(default)]
    frame_type: u8,
    max_players: u8,
    #[serde(default)]
    min_players: u8,
    base_score: i64,
    #[serde(default)]
    add_scores: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
enum GameTypeWire {
    ThreeCard,
    Mahjong,
}

#[derive(Debug, Serialize)]
struct CreateRoomResponse {
    room_id: String,
}

pub async fn create_room(ctx: &Arc<WorkerCtx>, session: &mut WorkerSession, data: &[u8]) -> Result<serde_json::Value, Error> {
    let request: CreateRoomRequest = serde_json::from_slice(data).map_err(|e| Error::InvalidUser(e.to_string()))?;
    let rule = match request.game_type {
        GameTypeWire::ThreeCard => {
            GameRule::three_card(request.max_players, request.min_players.max(1), request.base_score, request.add_scores)
        }
        GameTypeWire::Mahjong => GameRule::mahjong(request.max_players, request.frame_type, request.base_score),
    };
    let (room, events_rx) = ctx.unions.create_room(request.tenant_id, rule);
    ctx.spawn_room_event_forwarder(room.clone(), events_rx);
    session.put("room_id", room.id.clone());
    Ok(serde_json::to_value(CreateRoomResponse { room_id: room.id }).expect("always serializes"))
}

#[derive(Debug, Deserialize, Default)]
struct EnterRoomRequest {
    #[serde(default)]
    room_id: String,
    #[serde(default)]
    uid: String,
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    gold: i64,
}

pub async fn enter_room(ctx: &Arc<WorkerCtx>, session: &mut WorkerSession, data: &[u8]) -> Result<serde_json::Value, Error> {
    let request: EnterRoomRequest = if data.is_empty() { EnterRoomRequest::default() } else {
        serde_json::from_slice(data).map_err(|e| Error::InvalidUser(e.to_string()))?
    };
    let room_id = resolve(session, &request.room_id, "room_id")?;
    let uid = resolve(session, &request.uid, "game_uid")?;
    let room = ctx.unions.find_room(&room_id)?;
    session.put("room_id", room.id.clone());
    session.put("game_uid", uid.clone());
    ctx.publish_session_sync(session).await;
    let events = room.enter(uid, request.nickname, request.avatar, request.gold).await?;
    ctx.deliver_room_events(&room, events).await;
    Ok(json!({ "room_id": room.id }))
}

#[derive(Debug, Deserialize, Default)]
struct ReadyRequest {
    #[serde(default)]
    room_id: String,
    #[serde(default)]
    uid: String,
}

pub async fn ready_room(ctx: &Arc<WorkerCtx>, session: &mut WorkerSession, data: &[u8]) -> Result<serde_json::Value, Error> {
    let request: ReadyRequest = if data.is_empty() { ReadyRequest::default() } else {
        serde_json::from_slice(data).map_err(|e| Error::InvalidUser(e.to_string()))?
    };
    let room_id = resolve(session, &request.room_id, "room_id")?;
    let uid = resolve(session, &request.uid, "game_uid")?;
    let room = ctx.unions.find_room(&room_id)?;
    let events = room.ready(&uid).await?;
    ctx.deliver_room_events(&room, events).await;
    Ok(json!({}))
}

#[derive(Debug, Deserialize, Default)]
struct GameOpRequest {
    #[serde(default)]
    room_id: String,
    #[serde(default)]
    uid: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Handles any `room.game.<Op>` route, `op` being the method segment of
/// the route (`"Qi"`, `"Peng"`, `"GangChi"`, `"GangZhi"`, `"GangBu"`,
/// `"HuChi"`, `"HuZhi"`, `"Guo"` for mahjong; `"Look"`, `"Follow"`,
/// `"Fold"`, `"Compare"` for three-card).
pub async fn game_op(ctx: &Arc<WorkerCtx>, session: &mut WorkerSession, op: &str, data: &[u8]) -> Result<serde_json::Value, Error> {
    let request: GameOpRequest = if data.is_empty() { GameOpRequest::default() } else {
        serde_json::from_slice(data).map_err(|e| Error::InvalidUser(e.to_string()))?
    };
    let room_id = resolve(session, &request.room_id, "room_id")?;
    let uid = resolve(session, &request.uid, "game_uid")?;
    let room = ctx.unions.find_room(&room_id)?;
    let events = room.handle_game_message(&uid, op, &request.payload).await?;
    ctx.deliver_room_events(&room, events).await;
    Ok(json!({}))
}

pub async fn snapshot(ctx: &Arc<WorkerCtx>, session: &mut WorkerSession, data: &[u8]) -> Result<serde_json::Value, Error> {
    #[derive(Deserialize, Default)]
    struct SnapshotRequest {
        #[serde(default)]
        room_id: String,
        #[serde(default)]
        uid: String,
    }
    let request: SnapshotRequest = if data.is_empty() { SnapshotRequest::default() } else {
        serde_json::from_slice(data).map_err(|e| Error::InvalidUser(e.to_string()))?
    };
    let room_id = resolve(session, &request.room_id, "room_id")?;
    let uid = resolve(session, &request.uid, "game_uid")?;
    let room = ctx.unions.find_room(&room_id)?;
    room.snapshot(&uid).await
}
