//! The pluggable game-engine contract a room's state machine drives.
//!
//! Retargeted from the teacher's client-hosted `BackEndArchitecture` trait
//! (`drain_commands` polling a `BackendCommand` queue) to a worker-hosted
//! engine that returns its effects directly from each call rather than
//! buffering them for a frontend poll loop — there is no per-frame tick
//! here, only discrete room-driver invocations under the room's write lock.

mod error;
mod event;

pub use error::EngineError;
pub use event::EngineEvent;

use domain::RoomUser;

/// Implemented once per game (`games/three-card`, `games/mahjong`). All
/// four methods run synchronously under the owning room's write lock; any
/// follow-up that must happen later (a kick, a result-to-reset delay) is
/// requested via [`EngineEvent::SetTimer`] rather than spawned directly,
/// so the room driver stays the single place that re-enters the lock.
pub trait GameEngine: Send {
    /// The room transitioned `Seated -> Playing`. `users` are seated in
    /// chair order.
    fn start_game(&mut self, users: &[RoomUser]) -> Vec<EngineEvent>;

    /// One in-game operation arrived from `chair` on the given route
    /// (e.g. `"Qi"`, `"Peng"`, `"HuChi"`). `data` is the operation's
    /// already-decoded JSON body.
    fn handle_message(
        &mut self,
        chair: u8,
        route: &str,
        data: &serde_json::Value,
    ) -> Result<Vec<EngineEvent>, EngineError>;

    /// A redacted view of the engine's state for `viewer_chair`: other
    /// chairs' hidden information is never present in the returned value.
    fn get_snapshot(&self, viewer_chair: u8) -> serde_json::Value;

    /// The room is reverting `Result -> Lobby`. The engine resets its own
    /// state and returns the events announcing the reset (new status,
    /// fresh rest-count, etc).
    fn end_game(&mut self) -> Vec<EngineEvent>;
}
