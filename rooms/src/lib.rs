//! Room/union registry and the per-table state machine (`spec.md`
//! §4.6-4.7): 6-digit room ids via rejection sampling, seat assignment,
//! kick timers run through an internal single-consumer intent queue, and
//! the `Lobby -> Seated -> Playing -> Result -> Lobby` lifecycle driving a
//! pluggable `game_engine::GameEngine`.

mod event;
mod room;
mod union;

pub use event::{PUSH_ROUTE, RoomEvent};
pub use room::{KICK_TIMEOUT, Room};
pub use union::{Union, UnionManager};
