use mahjong_logic::tile::{SUIT_BAMBOO, SUIT_CHARACTER, SUIT_CIRCLE, WILD, encode};
use rand::seq::SliceRandom;
use rand::thread_rng;

/// 9 ranks * 3 suits * 4 copies = 108 non-honor tiles, plus 4 or 8 wilds
/// depending on `frame_type` (`spec.md` §4.7 / glossary "Frame type").
pub fn build_deck(frame_type: u8) -> Vec<u8> {
    let mut deck = Vec::with_capacity(108 + 8);
    for suit in [SUIT_CIRCLE, SUIT_BAMBOO, SUIT_CHARACTER] {
        for rank in 1..=9 {
            for _ in 0..4 {
                deck.push(encode(suit, rank));
            }
        }
    }
    let wild_count = if frame_type == 0 { 4 } else { 8 };
    deck.extend(std::iter::repeat(WILD).take(wild_count));
    deck
}

/// Fisher-Yates shuffle (`washCards()` in `spec.md` §4.7).
pub fn wash_cards(frame_type: u8) -> Vec<u8> {
    let mut deck = build_deck(frame_type);
    deck.shuffle(&mut thread_rng());
    deck
}
