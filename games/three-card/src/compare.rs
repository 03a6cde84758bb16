use std::cmp::Ordering;

use crate::card::Card;
use crate::category::{categorize, compare_same_category};

/// `CompareCards`: total order over three-card hands. Category strength
/// decides first; same-category hands fall through to
/// `compare_same_category`. Does not itself apply the "tie counts as a
/// loss for the initiator" rule — that's a property of a player-initiated
/// showdown, not of comparing two hands in the abstract, so it lives in
/// the engine's `Compare` handler instead.
pub fn compare_cards(a: [Card; 3], b: [Card; 3]) -> Ordering {
    let ha = categorize(a);
    let hb = categorize(b);
    match ha.category.cmp(&hb.category) {
        Ordering::Equal => compare_same_category(&ha, &hb),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario 1 from `spec.md` §8: `[0x01,0x02,0x03]` (A-2-3 straight
    /// flush, suit 0) vs `[0x02,0x12,0x22]` (triplet of 2s across suits)
    /// — the comparator returns positive for the latter, `BaoZi > ShunJin`.
    #[test]
    fn straight_flush_loses_to_triplet_of_twos() {
        let a = [Card(0x01), Card(0x02), Card(0x03)];
        let b = [Card(0x02), Card(0x12), Card(0x22)];
        assert_eq!(compare_cards(a, b), Ordering::Less);
    }

    #[test]
    fn comparator_is_reflexive_and_antisymmetric() {
        let a = [Card(0x01), Card(0x05), Card(0x09)];
        let b = [Card(0x32), Card(0x36), Card(0x3a)];
        assert_eq!(compare_cards(a, a), Ordering::Equal);
        assert_eq!(compare_cards(a, b), compare_cards(b, a).reverse());
    }
}
