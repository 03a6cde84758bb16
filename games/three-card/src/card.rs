//! Deck of 52: high nibble = suit (0..3), low nibble = rank (1..13).
//! Ace is high for comparison (`rank_value() == 14`) except inside the
//! `{2,3,14}` special straight (`spec.md` §4.7's "A-2-3 is a straight").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card(pub u8);

pub const SUITS: u8 = 4;
pub const RANKS: u8 = 13;

impl Card {
    pub const fn new(suit: u8, rank: u8) -> Self {
        Card((suit << 4) | rank)
    }

    pub const fn suit(self) -> u8 {
        self.0 >> 4
    }

    pub const fn rank(self) -> u8 {
        self.0 & 0x0f
    }

    /// Ace (rank 1) counts as 14 everywhere except the `A-2-3` straight,
    /// which `categorize` special-cases directly on raw ranks.
    pub const fn rank_value(self) -> u8 {
        if self.rank() == 1 { 14 } else { self.rank() }
    }
}

pub fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity((SUITS * RANKS) as usize);
    for suit in 0..SUITS {
        for rank in 1..=RANKS {
            deck.push(Card::new(suit, rank));
        }
    }
    deck
}
