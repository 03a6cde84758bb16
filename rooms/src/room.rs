use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use domain::{GameRule, GameType, RoomUser, UserStatus};
use game_engine::{EngineEvent, GameEngine};
use mahjong::MahjongEngine;
use platform::Error;
use serde_json::json;
use three_card::ThreeCardEngine;
use tokio::sync::{Mutex, mpsc};

use crate::event::RoomEvent;

/// Per-user kick timer: removed if still not `Ready` when it fires
/// (`spec.md` §4.7).
pub const KICK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Lobby,
    Seated,
    Playing,
    Result,
}

/// What a fired timer tells the room's driver to do. Timer tasks never
/// re-enter the room lock directly; they post an intent here and the
/// single-consumer driver loop (`Room::spawn_driver`) is the only place
/// that acquires the lock on their behalf (`spec.md` §9 design note on
/// timers embedded in a locked struct).
#[derive(Debug)]
enum Intent {
    Kick { uid: String, generation: u64 },
    ResultReset { generation: u64 },
}

struct RoomState {
    seats: Vec<Option<RoomUser>>,
    creator: Option<String>,
    phase: Phase,
    dismissed: bool,
    kick_generation: HashMap<String, u64>,
    result_generation: u64,
    engine: Box<dyn GameEngine>,
}

impl RoomState {
    fn chair_of(&self, uid: &str) -> Option<u8> {
        self.seats.iter().enumerate().find_map(|(chair, slot)| {
            slot.as_ref().filter(|u| u.uid == uid).map(|_| chair as u8)
        })
    }

    fn present_users(&self) -> Vec<RoomUser> {
        self.seats.iter().flatten().cloned().collect()
    }

    fn other_uids(&self, exclude: &str) -> Vec<String> {
        self.present_users()
            .into_iter()
            .filter(|u| u.uid != exclude)
            .map(|u| u.uid)
            .collect()
    }

    fn all_uids(&self) -> Vec<String> {
        self.present_users().into_iter().map(|u| u.uid).collect()
    }
}

/// One table: seat assignment, kick timers, the `Lobby -> Seated ->
/// Playing -> Result -> Lobby` lifecycle, and the pluggable `GameEngine`
/// that drives in-game operations. `spec.md` §4.6/§4.7.
#[derive(Clone)]
pub struct Room {
    pub id: String,
    pub tenant_id: i64,
    pub rule: GameRule,
    state: Arc<Mutex<RoomState>>,
    intents_tx: mpsc::UnboundedSender<Intent>,
}

fn build_engine(rule: &GameRule) -> Box<dyn GameEngine> {
    match rule.game_type {
        GameType::ThreeCard => Box::new(ThreeCardEngine::new(rule)),
        GameType::Mahjong => Box::new(MahjongEngine::new(rule.max_players, rule.frame_type, rule.base_score)),
    }
}

fn translate(events: Vec<EngineEvent>, state: &mut RoomState, intents_tx: &mpsc::UnboundedSender<Intent>) -> Vec<RoomEvent> {
    let mut out = Vec::new();
    for event in events {
        match event {
            EngineEvent::Broadcast { route, data } => out.push(RoomEvent::broadcast(route, data)),
            EngineEvent::PushTo { chairs, route, data } => {
                let uids = chairs
                    .into_iter()
                    .filter_map(|c| state.seats.get(c as usize).and_then(|s| s.as_ref()).map(|u| u.uid.clone()))
                    .collect();
                out.push(RoomEvent::push_to(uids, route, data));
            }
            EngineEvent::SetTimer { id: _, after } => {
                state.result_generation += 1;
                let generation = state.result_generation;
                state.phase = Phase::Result;
                let tx = intents_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Intent::ResultReset { generation });
                });
            }
            EngineEvent::CancelTimer { .. } => {
                // Bumping the generation makes any in-flight timer stale
                // when it eventually fires.
                state.result_generation += 1;
            }
        }
    }
    out
}

impl Room {
    /// Builds the room and its driver task. The returned receiver carries
    /// every [`RoomEvent`] the room produces on its own, outside of a
    /// caller's synchronous request (`enter`/`ready`/`handle_game_message`
    /// already return their own events directly) — a fired kick timer's
    /// `OtherUserLeave` broadcast, or a fired result-reset's `GameStatus`
    /// re-announcement. The owning worker drains it for as long as the
    /// room exists.
    pub fn new(id: impl Into<String>, tenant_id: i64, rule: GameRule) -> (Self, mpsc::UnboundedReceiver<RoomEvent>) {
        let engine = build_engine(&rule);
        let seats = vec![None; rule.max_players as usize];
        let state = Arc::new(Mutex::new(RoomState {
            seats,
            creator: None,
            phase: Phase::Lobby,
            dismissed: false,
            kick_generation: HashMap::new(),
            result_generation: 0,
            engine,
        }));
        let (intents_tx, intents_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let room = Self {
            id: id.into(),
            tenant_id,
            rule,
            state,
            intents_tx,
        };
        room.spawn_driver(intents_rx, events_tx);
        (room, events_rx)
    }

    /// The single consumer of timer intents. Owns the only path by which a
    /// background timer re-enters the room lock, keeping lock acquisition
    /// order identical to a synchronous caller's. Events produced here are
    /// forwarded to `events_tx` rather than returned, since nothing is
    /// waiting on a call stack for them.
    fn spawn_driver(&self, mut intents_rx: mpsc::UnboundedReceiver<Intent>, events_tx: mpsc::UnboundedSender<RoomEvent>) {
        let state = self.state.clone();
        let intents_tx = self.intents_tx.clone();
        tokio::spawn(async move {
            while let Some(intent) = intents_rx.recv().await {
                let mut guard = state.lock().await;
                if guard.dismissed {
                    continue;
                }
                let produced = match intent {
                    Intent::Kick { uid, generation } => {
                        if guard.kick_generation.get(&uid).copied() != Some(generation) {
                            continue;
                        }
                        Self::remove_user_locked(&mut guard, &uid)
                    }
                    Intent::ResultReset { generation } => {
                        if guard.result_generation != generation {
                            continue;
                        }
                        let events = guard.engine.end_game();
                        for user in guard.seats.iter_mut().flatten() {
                            user.status = UserStatus::None;
                        }
                        guard.phase = if guard.present_users().is_empty() { Phase::Lobby } else { Phase::Seated };
                        translate(events, &mut guard, &intents_tx)
                    }
                };
                drop(guard);
                for event in produced {
                    let _ = events_tx.send(event);
                }
            }
        });
    }

    /// `generation` must be captured by the caller while still holding
    /// `state`'s lock, not re-read here: re-reading would race `ready()`
    /// bumping the generation before this task's first read, which would
    /// arm the timer against the post-ready generation and kick an
    /// already-`Ready` user.
    fn arm_kick_timer(&self, uid: String, generation: u64) {
        let intents_tx = self.intents_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(KICK_TIMEOUT).await;
            let _ = intents_tx.send(Intent::Kick { uid, generation });
        });
    }

    fn remove_user_locked(state: &mut RoomState, uid: &str) -> Vec<RoomEvent> {
        let Some(chair) = state.chair_of(uid) else {
            return Vec::new();
        };
        state.seats[chair as usize] = None;
        state.kick_generation.remove(uid);
        let mut events = vec![RoomEvent::broadcast(
            "OtherUserLeave",
            json!({ "uid": uid, "chair": chair }),
        )];
        if state.present_users().is_empty() {
            state.dismissed = true;
            events.push(RoomEvent::Dismissed);
        }
        events
    }

    /// Seats `uid` in the smallest free chair. Arms a 30s kick timer that
    /// removes the user again if they never call `ready`.
    pub async fn enter(&self, uid: String, nickname: String, avatar: String, gold: i64) -> Result<Vec<RoomEvent>, Error> {
        let mut state = self.state.lock().await;
        if state.dismissed {
            return Err(Error::RoomNotExist(self.id.clone()));
        }
        let chair = state
            .seats
            .iter()
            .position(|s| s.is_none())
            .ok_or(Error::RoomFull)? as u8;

        if state.creator.is_none() {
            state.creator = Some(uid.clone());
        }
        let user = RoomUser::new(uid.clone(), nickname, avatar, gold, chair);
        state.seats[chair as usize] = Some(user);
        state.kick_generation.insert(uid.clone(), 1);
        state.phase = Phase::Seated;

        let others = state.other_uids(&uid);
        let events = vec![
            RoomEvent::push_to(
                vec![uid.clone()],
                "SelfEntry",
                json!({ "room_id": self.id, "chair": chair }),
            ),
            RoomEvent::push_to(
                others,
                "OtherUserEntry",
                json!({ "uid": uid, "chair": chair }),
            ),
        ];
        drop(state);
        self.arm_kick_timer(uid, 1);
        Ok(events)
    }

    /// Cancels the entrant's kick timer and marks them `Ready`. If every
    /// seated user is now `Ready` and the room has at least `min_players`,
    /// transitions to `Playing` and starts the engine.
    pub async fn ready(&self, uid: &str) -> Result<Vec<RoomEvent>, Error> {
        let mut state = self.state.lock().await;
        let chair = state.chair_of(uid).ok_or(Error::NotInRoom)?;

        if let Some(gen) = state.kick_generation.get_mut(uid) {
            *gen += 1;
        }
        state.seats[chair as usize].as_mut().unwrap().status = UserStatus::Ready;

        let mut events = vec![RoomEvent::broadcast("UserReady", json!({ "chair": chair }))];

        let present = state.present_users();
        let all_ready = !present.is_empty() && present.iter().all(|u| u.status == UserStatus::Ready);
        if all_ready && present.len() >= self.rule.min_players as usize {
            for user in state.seats.iter_mut().flatten() {
                user.status = UserStatus::Playing;
            }
            state.phase = Phase::Playing;
            let mut users = state.present_users();
            users.sort_by_key(|u| u.chair_id);
            let start_events = state.engine.start_game(&users);
            let intents_tx = self.intents_tx.clone();
            events.extend(translate(start_events, &mut state, &intents_tx));
        }
        Ok(events)
    }

    /// Dispatches one in-game operation to the engine.
    pub async fn handle_game_message(&self, uid: &str, route: &str, data: &serde_json::Value) -> Result<Vec<RoomEvent>, Error> {
        let mut state = self.state.lock().await;
        let chair = state.chair_of(uid).ok_or(Error::NotInRoom)?;
        let engine_events = state
            .engine
            .handle_message(chair, route, data)
            .map_err(|e| Error::InvalidUser(e.to_string()))?;
        let intents_tx = self.intents_tx.clone();
        Ok(translate(engine_events, &mut state, &intents_tx))
    }

    /// A redacted view of the engine's state for `uid`'s own chair.
    pub async fn snapshot(&self, uid: &str) -> Result<serde_json::Value, Error> {
        let state = self.state.lock().await;
        let chair = state.chair_of(uid).ok_or(Error::NotInRoom)?;
        Ok(state.engine.get_snapshot(chair))
    }

    /// Idempotent: dismissing an already-dismissed room is a no-op.
    pub async fn dismiss(&self) -> Vec<RoomEvent> {
        let mut state = self.state.lock().await;
        if state.dismissed {
            return Vec::new();
        }
        let uids = state.all_uids();
        state.dismissed = true;
        for gen in state.kick_generation.values_mut() {
            *gen += 1;
        }
        state.seats.iter_mut().for_each(|s| *s = None);
        if uids.is_empty() {
            Vec::new()
        } else {
            vec![RoomEvent::push_to(uids, "RoomDismissed", json!({ "room_id": self.id }))]
        }
    }

    pub async fn is_dismissed(&self) -> bool {
        self.state.lock().await.dismissed
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.present_users().len()
    }

    /// Every uid currently seated, in no particular order. Used by the
    /// worker to resolve a [`RoomEvent::Broadcast`]'s implicit "every user
    /// in the room" target list when forwarding the room's background
    /// event feed (kick timeouts, result resets) onto the push fabric.
    pub async fn member_uids(&self) -> Vec<String> {
        self.state.lock().await.all_uids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(max: u8, min: u8) -> GameRule {
        GameRule::three_card(max, min, 10, vec![1])
    }

    #[tokio::test]
    async fn room_fills_to_max_then_rejects() {
        let (room, _events) = Room::new("100000", 1, rule(3, 2));
        room.enter("a".into(), "A".into(), "".into(), 0).await.unwrap();
        room.enter("b".into(), "B".into(), "".into(), 0).await.unwrap();
        room.enter("c".into(), "C".into(), "".into(), 0).await.unwrap();
        let err = room.enter("d".into(), "D".into(), "".into(), 0).await.unwrap_err();
        assert!(matches!(err, Error::RoomFull));
    }

    #[tokio::test]
    async fn chairs_are_the_smallest_free_index() {
        let (room, _events) = Room::new("100001", 1, rule(3, 2));
        room.enter("a".into(), "A".into(), "".into(), 0).await.unwrap();
        room.enter("b".into(), "B".into(), "".into(), 0).await.unwrap();
        {
            let state = room.state.lock().await;
            assert_eq!(state.chair_of("a"), Some(0));
            assert_eq!(state.chair_of("b"), Some(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn kick_timer_removes_unready_user_after_thirty_seconds() {
        let (room, mut events) = Room::new("100002", 1, rule(3, 2));
        room.enter("a".into(), "A".into(), "".into(), 0).await.unwrap();
        assert_eq!(room.user_count().await, 1);

        tokio::time::advance(KICK_TIMEOUT + Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert_eq!(room.user_count().await, 0);
        assert!(room.is_dismissed().await);

        let first = events.recv().await.unwrap();
        assert!(matches!(first, RoomEvent::Broadcast { data } if data["pushRouter"] == "OtherUserLeave"));
        let second = events.recv().await.unwrap();
        assert!(matches!(second, RoomEvent::Dismissed));
    }

    #[tokio::test]
    async fn ready_cancels_kick_timer_so_user_survives() {
        let (room, _events) = Room::new("100003", 1, rule(3, 2));
        room.enter("a".into(), "A".into(), "".into(), 0).await.unwrap();
        room.ready("a").await.unwrap();
        {
            let state = room.state.lock().await;
            assert_eq!(state.seats[0].as_ref().unwrap().status, UserStatus::Ready);
        }
    }

    #[tokio::test]
    async fn all_ready_at_min_players_starts_the_game() {
        let (room, _events) = Room::new("100004", 1, rule(3, 2));
        room.enter("a".into(), "A".into(), "".into(), 0).await.unwrap();
        room.enter("b".into(), "B".into(), "".into(), 0).await.unwrap();
        room.ready("a").await.unwrap();
        let events = room.ready("b").await.unwrap();
        assert!(events.iter().any(|e| matches!(e, RoomEvent::Broadcast { data } if data["pushRouter"] == "GameStatus")));
    }
}
