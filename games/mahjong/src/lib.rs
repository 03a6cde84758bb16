//! Mahjong with a wild tile (`spec.md` §4.7): deck, the draw/discard/react
//! turn protocol, and the `GameEngine` implementation a room drives.

mod deck;
mod engine;
mod state;

pub use deck::{build_deck, wash_cards};
pub use engine::{MahjongEngine, RESULT_RESET_DELAY};
pub use state::{GameData, GameResult, GameStatus, Meld, MeldKind, OpType, OperateRecord};
