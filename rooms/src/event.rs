use serde_json::Value;

/// The Message-level route every room push travels under. The actual event
/// name rides inside `data`'s `"pushRouter"` field instead — grounded on
/// `session.Push(uids, pushMsg, "ServerMessagePush")` in the original's
/// `game/component/room/room.go`, which never varies the outer route.
pub const PUSH_ROUTE: &str = "ServerMessagePush";

/// What a room asks its owner (the worker hosting it) to deliver. Chair ids
/// have already been resolved to `uid`s here — callers never see
/// `game_engine::EngineEvent`'s chair-indexed form, whether the event came
/// from a synchronous call (`Room::enter`, `Room::handle_game_message`) or
/// from the room's own timer-driven background loop. `data` always carries
/// a `"pushRouter"` field naming the event (`SelfEntry`, `GameStatus`, ...).
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// Send `data` to every user currently seated in the room.
    Broadcast { data: Value },
    /// Send `data` to a specific set of uids.
    PushTo { uids: Vec<String>, data: Value },
    /// The room is now empty and dismissed; the owning registry should
    /// drop it from its id/union indexes.
    Dismissed,
}

impl RoomEvent {
    /// Builds a [`RoomEvent::Broadcast`], folding `route` into `data` as
    /// `"pushRouter"` so every caller gets the same tagging `translate`
    /// applies to engine-sourced events.
    pub fn broadcast(route: impl Into<String>, data: Value) -> Self {
        Self::Broadcast { data: tag_push_router(route.into(), data) }
    }

    /// Builds a [`RoomEvent::PushTo`], folding `route` into `data`.
    pub fn push_to(uids: Vec<String>, route: impl Into<String>, data: Value) -> Self {
        Self::PushTo { uids, data: tag_push_router(route.into(), data) }
    }
}

fn tag_push_router(route: String, mut data: Value) -> Value {
    if let Value::Object(map) = &mut data {
        map.insert("pushRouter".to_string(), Value::String(route));
    }
    data
}
