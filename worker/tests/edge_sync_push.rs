//! Drives a create→enter→ready sequence through the real worker handlers
//! and the real gateway remote/push consumers, wired together over a
//! shared `LocalPubSub`, the way a worker and a gateway process actually
//! talk to each other (`spec.md` §4.4/§4.5). Exercises the one path that
//! was previously broken end to end: a handler binds `uid` on its
//! `WorkerSession`, a SessionSync travels back to the edge, and the
//! edge's uid-filtered push fan-out actually reaches the entering
//! client's own socket.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;

use bytes::{Bytes, BytesMut};
use conf::ConfigHandle;
use domain::Session;
use gateway::remote::{push_consumer, remote_consumer};
use gateway::state::{AppState, ConnectionHandle, InboundFrame};
use protocol::{Message, MessageKind, Packet, RemoteEnvelope};
use pubsub::PubSub;
use pubsub::local::LocalPubSub;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use worker::handlers::{self, WorkerCtx};
use worker::session::WorkerSession;

const GATEWAY_ID: &str = "gateway-1";
const WORKER_ID: &str = "room-1";

/// `ConfigHandle` owns a filesystem watcher and isn't `Clone`, so the
/// gateway side and the worker side each load their own handle from the
/// same documents rather than sharing one.
async fn test_config() -> ConfigHandle {
    let mut app_file = tempfile::NamedTempFile::new().unwrap();
    write!(
        app_file,
        "connector:\n  ws_port: 9000\njwt:\n  secret: s\n  expiry_secs: 1\npubsub:\n  url: \"nats://x\"\n"
    )
    .unwrap();

    let mut game_file = tempfile::NamedTempFile::new().unwrap();
    write!(
        game_file,
        r#"{{"gameConfig": {{}}, "serversConf": {{"nats": "nats://x", "connector": [
            {{"serverId": "{GATEWAY_ID}", "serverType": "gate", "host": "127.0.0.1", "port": 3001}}
        ], "servers": []}}}}"#
    )
    .unwrap();

    ConfigHandle::load(app_file.path(), game_file.path()).await.unwrap()
}

/// Decodes one outbound frame as a Push `Message`, returning its
/// `pushRouter` tag and full JSON body.
fn decode_push(bytes: Bytes) -> (String, serde_json::Value) {
    let mut buf = BytesMut::from(&bytes[..]);
    let packet = Packet::decode(&mut buf).unwrap().expect("a full packet");
    assert_eq!(packet.kind, protocol::PacketType::Data);
    let message = Message::decode(&packet.body).unwrap();
    assert_eq!(message.kind, MessageKind::Push);
    assert_eq!(message.route.as_deref(), Some(rooms::PUSH_ROUTE));
    let data: serde_json::Value = serde_json::from_slice(&message.data).unwrap();
    (data["pushRouter"].as_str().unwrap().to_string(), data)
}

#[tokio::test]
async fn enter_then_ready_delivers_self_entry_and_user_ready_to_the_entering_socket() {
    let pubsub: Arc<dyn PubSub> = Arc::new(LocalPubSub::new());

    // Edge-side state: one connected client, cid "cid-1", no uid bound yet.
    let cid = "cid-1".to_string();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Bytes>(16);
    let (inbound_tx, _inbound_rx) = mpsc::channel::<InboundFrame>(8);
    let state = Arc::new(AppState::new(GATEWAY_ID.to_string(), test_config().await, pubsub.clone(), inbound_tx));
    state.connections.insert(
        cid.clone(),
        ConnectionHandle {
            outbound_tx,
            session: Arc::new(Mutex::new(Session::new(cid.clone()))),
            strikes: AtomicU8::new(0),
        },
    );

    let subscription = pubsub.subscribe(GATEWAY_ID).await.unwrap();
    let (push_tx, push_rx) = mpsc::channel(16);
    tokio::spawn(remote_consumer(state.clone(), subscription, push_tx));
    tokio::spawn(push_consumer(state.clone(), push_rx));

    // Worker-side: the session a request from `cid` arrives with, exactly
    // as `WorkerSession::from_envelope` would build it off a real
    // `RemoteEnvelope::request`.
    let ctx = Arc::new(WorkerCtx::new(WORKER_ID.to_string(), pubsub.clone(), test_config().await));
    let seed = RemoteEnvelope::request(
        cid.clone(),
        None,
        GATEWAY_ID,
        WORKER_ID,
        Message::request(1, "room.user.create", Bytes::new()),
        Default::default(),
    );
    let mut session = WorkerSession::from_envelope(&seed);

    let create_data = serde_json::to_vec(&json!({
        "tenant_id": 1,
        "game_type": "ThreeCard",
        "max_players": 4,
        "min_players": 2,
        "base_score": 10,
        "add_scores": [1]
    }))
    .unwrap();
    let created = handlers::create_room(&ctx, &mut session, &create_data).await.unwrap();
    let room_id = created["room_id"].as_str().unwrap().to_string();

    let enter_data = serde_json::to_vec(&json!({
        "room_id": room_id,
        "uid": "user-a",
        "nickname": "Nick",
        "avatar": "",
        "gold": 100
    }))
    .unwrap();
    handlers::enter_room(&ctx, &mut session, &enter_data).await.unwrap();

    // The entering client's own socket must receive its SelfEntry push —
    // this is the path that was silently dropped before uid binding was
    // fixed: no SessionSync meant `push_consumer`'s uid filter matched
    // nothing.
    let first = tokio::time::timeout(std::time::Duration::from_secs(2), outbound_rx.recv())
        .await
        .expect("a push arrived before the timeout")
        .expect("outbound channel still open");
    let (router, data) = decode_push(first);
    assert_eq!(router, "SelfEntry");
    assert_eq!(data["room_id"], json!(room_id));

    let ready_data = serde_json::to_vec(&json!({ "room_id": room_id, "uid": "user-a" })).unwrap();
    handlers::ready_room(&ctx, &mut session, &ready_data).await.unwrap();

    let second = tokio::time::timeout(std::time::Duration::from_secs(2), outbound_rx.recv())
        .await
        .expect("a push arrived before the timeout")
        .expect("outbound channel still open");
    let (router, _) = decode_push(second);
    assert_eq!(router, "UserReady");
}
