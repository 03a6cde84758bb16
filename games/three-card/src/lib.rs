//! Three-card poker (`spec.md` §4.7): deck, comparator, pot/settlement,
//! and the `GameEngine` implementation a room drives.

mod card;
mod category;
mod compare;
mod deck;
mod engine;
mod state;

pub use card::Card;
pub use category::{Category, categorize};
pub use compare::compare_cards;
pub use engine::{HIDDEN_CARD, RESULT_RESET_DELAY, ThreeCardEngine};
pub use state::{GameData, ThreeCardStatus};
