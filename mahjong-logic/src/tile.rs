//! Explicit tile constants and a wild-set predicate, per the design note on
//! tile numeric encoding (`spec.md` §9): never magic numbers.

/// Suits are `0 = circle, 1 = bamboo, 2 = character`; this ruleset's deck
/// (`spec.md` §4.7) only deals these three — the recognizer's fourth
/// "honor" group (index 3) is supported for algorithmic completeness
/// (`spec.md` §4.2) but never populated by this game's deck.
pub const SUIT_CIRCLE: u8 = 0;
pub const SUIT_BAMBOO: u8 = 1;
pub const SUIT_CHARACTER: u8 = 2;
pub const SUIT_HONOR: u8 = 3;

/// Sentinel meaning "hidden/unknown" when redacting another chair's hand.
pub const HIDDEN: u8 = 36;

/// Wild ("red dragon") tile id, kept well outside the 0..=35 non-wild
/// range rather than overlapping the honor suit's encoding.
pub const WILD: u8 = 40;

/// Encodes a tile as `10*suit + (rank-1)`, `rank` 1-based (1..=9).
pub const fn encode(suit: u8, rank: u8) -> u8 {
    suit * 10 + (rank - 1)
}

pub const fn is_wild(tile: u8) -> bool {
    tile == WILD
}

pub const fn suit_of(tile: u8) -> u8 {
    tile / 10
}

pub const fn rank_index_of(tile: u8) -> usize {
    (tile % 10) as usize
}
