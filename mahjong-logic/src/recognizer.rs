use crate::table::Table;
use crate::tile;

/// Ports `mj/alg/HuLogic.go`'s `isHu`/`CheckCards`/`findTable`. Owns the
/// four dictionaries and exposes a single `can_win` entry point used by
/// both the self-mo check and opponents' reaction-window (`HuChi`) checks.
pub struct Recognizer {
    table: Table,
}

impl Recognizer {
    pub fn new() -> Self {
        Self { table: Table::new() }
    }

    /// `counts[0..3]` are the three non-honor suits (circle/bamboo/
    /// character); `counts[3]` is the honor group, always all-zero for
    /// this ruleset's deck but evaluated for algorithmic completeness.
    /// `wild_count` is the number of wild tiles set aside from `counts`.
    pub fn can_win(&self, counts: &[[u8; 9]; 4], wild_count: u8) -> bool {
        if wild_count >= 8 {
            return true;
        }
        let mut jiang = false;
        let mut remaining = wild_count;
        for (i, group) in counts.iter().enumerate() {
            let feng = i == 3;
            let mut cards: [i32; 9] = group.map(|v| v as i32);
            if !self.check_cards(&mut cards, feng, &mut remaining, &mut jiang, 0) {
                return false;
            }
        }
        if !jiang && remaining % 3 == 2 {
            return true;
        }
        if jiang && remaining % 3 == 0 {
            return true;
        }
        false
    }

    /// Counts raw tile ids (per `mahjong_logic::tile`) into suit groups and
    /// evaluates. `tiles` is normally 14 entries (13 held + 1 drawn/claimed).
    pub fn can_win_tiles(&self, tiles: &[u8]) -> bool {
        let mut counts = [[0u8; 9]; 4];
        let mut wild = 0u8;
        for &t in tiles {
            if tile::is_wild(t) {
                wild += 1;
                continue;
            }
            let suit = tile::suit_of(t) as usize;
            let rank = tile::rank_index_of(t);
            if suit < 4 && rank < 9 {
                counts[suit][rank] += 1;
            }
        }
        self.can_win(&counts, wild)
    }

    fn check_cards(
        &self,
        cards: &mut [i32; 9],
        feng: bool,
        remaining: &mut u8,
        jiang: &mut bool,
        try_count: u8,
    ) -> bool {
        let total: i32 = cards.iter().sum();
        if total == 0 {
            return true;
        }
        let key = Table::key_of(&cards.map(|v| v));
        if !self.table.find(&key, try_count, feng) {
            if try_count < *remaining {
                return self.check_cards(cards, feng, remaining, jiang, try_count + 1);
            }
            return false;
        }
        if (total + try_count as i32) % 3 == 2 {
            if !*jiang {
                *jiang = true;
            } else if try_count < *remaining {
                return self.check_cards(cards, feng, remaining, jiang, try_count + 1);
            } else {
                return false;
            }
        }
        *remaining -= try_count;
        true
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{SUIT_BAMBOO, SUIT_CIRCLE, WILD, encode};

    fn recognizer() -> Recognizer {
        Recognizer::new()
    }

    #[test]
    fn clean_hand_with_no_wilds_wins() {
        let r = recognizer();
        // 111 234 444 666 55 on the circle suit: 3+3+3+3+2 = 14 tiles.
        let mut tiles = Vec::new();
        tiles.extend([encode(SUIT_CIRCLE, 1); 3]);
        tiles.extend([encode(SUIT_CIRCLE, 2), encode(SUIT_CIRCLE, 3), encode(SUIT_CIRCLE, 4)]);
        tiles.extend([encode(SUIT_CIRCLE, 4); 2]); // completes 444 with the run's 4
        tiles.extend([encode(SUIT_CIRCLE, 6); 3]);
        tiles.extend([encode(SUIT_CIRCLE, 5); 2]);
        assert_eq!(tiles.len(), 14);
        assert!(r.can_win_tiles(&tiles));
    }

    #[test]
    fn incomplete_hand_does_not_win() {
        let r = recognizer();
        let mut tiles = vec![encode(SUIT_CIRCLE, 1), encode(SUIT_CIRCLE, 2), encode(SUIT_CIRCLE, 5)];
        tiles.extend(std::iter::repeat(encode(SUIT_CIRCLE, 9)).take(11));
        assert_eq!(tiles.len(), 14);
        assert!(!r.can_win_tiles(&tiles));
    }

    #[test]
    fn eight_or_more_wilds_always_win() {
        let r = recognizer();
        let tiles = vec![WILD; 14];
        assert!(r.can_win_tiles(&tiles));
    }

    /// Scenario 2 from `spec.md` §8: wild tiles substitute for the eye
    /// (pair) while three circle triplets and a bamboo run fill out the
    /// rest of the hand; drawing the run's last tile completes a self-mo
    /// win.
    #[test]
    fn self_mo_with_wilds_forming_the_eye() {
        let r = recognizer();
        let mut hand = Vec::new();
        hand.extend([encode(SUIT_CIRCLE, 1); 3]); // triplet
        hand.extend([encode(SUIT_CIRCLE, 4); 3]); // triplet
        hand.extend([encode(SUIT_CIRCLE, 6); 3]); // triplet
        hand.push(encode(SUIT_BAMBOO, 2));
        hand.push(encode(SUIT_BAMBOO, 3));
        hand.push(WILD);
        hand.push(WILD);
        assert_eq!(hand.len(), 13);
        hand.push(encode(SUIT_BAMBOO, 4)); // draw completes the 2-3-4 bamboo run
        assert!(r.can_win_tiles(&hand));
    }
}
