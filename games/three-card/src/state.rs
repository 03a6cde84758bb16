use serde::{Deserialize, Serialize};

use crate::card::Card;

/// Per-bureau in-hand status. Distinct from `domain::RoomUser::status`
/// (which only tracks Lobby-level readiness) — this tracks where a
/// seated chair stands within the current three-card hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreeCardStatus {
    NotSeated,
    Waiting,
    Looked,
    Folded,
    Lost,
    Won,
}

impl ThreeCardStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Waiting | Self::Looked)
    }
}

/// `spec.md`'s Three-card `GameData` (`SPEC_FULL.md` §3), sized to
/// `rule.max_players` at room creation; chairs with no seated user stay
/// `NotSeated` for the life of the room.
pub struct GameData {
    pub pour_scores: Vec<Vec<i64>>,
    pub hand_cards: Vec<Vec<Card>>,
    pub look_cards: Vec<bool>,
    pub cur_scores: Vec<i64>,
    pub user_status: Vec<ThreeCardStatus>,
    pub user_trust: [bool; 10],
    pub losers: Vec<usize>,
    pub revealed: bool,
}

impl GameData {
    pub fn new(max_players: usize) -> Self {
        Self {
            pour_scores: vec![Vec::new(); max_players],
            hand_cards: vec![Vec::new(); max_players],
            look_cards: vec![false; max_players],
            cur_scores: vec![0; max_players],
            user_status: vec![ThreeCardStatus::NotSeated; max_players],
            user_trust: [false; 10],
            losers: Vec::new(),
            revealed: false,
        }
    }

    pub fn active_chairs(&self) -> Vec<usize> {
        self.user_status
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_active())
            .map(|(i, _)| i)
            .collect()
    }
}
