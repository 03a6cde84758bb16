use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::card::{Card, full_deck};

/// Fisher-Yates shuffle of a fresh 52-card deck, mirroring the mahjong
/// engine's `washCards()` (`games/mahjong/src/engine.rs`).
pub fn shuffled_deck() -> Vec<Card> {
    let mut deck = full_deck();
    deck.shuffle(&mut thread_rng());
    deck
}
