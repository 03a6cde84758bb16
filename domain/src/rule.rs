use serde::{Deserialize, Serialize};

/// Which game a room's engine implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameType {
    ThreeCard,
    Mahjong,
}

/// Per-room rule set, negotiated at room creation. `frame_type` selects
/// the mahjong wild-tile count (4 vs 8); it's meaningless for three-card
/// rooms and left at its default there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRule {
    pub game_type: GameType,
    pub frame_type: u8,
    pub max_players: u8,
    pub min_players: u8,
    pub base_score: i64,
    pub add_scores: Vec<i64>,
    pub union_id: i64,
    pub room_id: String,
}

impl GameRule {
    pub fn three_card(max_players: u8, min_players: u8, base_score: i64, add_scores: Vec<i64>) -> Self {
        Self {
            game_type: GameType::ThreeCard,
            frame_type: 0,
            max_players,
            min_players,
            base_score,
            add_scores,
            union_id: 0,
            room_id: String::new(),
        }
    }

    pub fn mahjong(max_players: u8, frame_type: u8, base_score: i64) -> Self {
        Self {
            game_type: GameType::Mahjong,
            frame_type,
            max_players,
            min_players: max_players,
            base_score,
            add_scores: Vec::new(),
            union_id: 0,
            room_id: String::new(),
        }
    }
}
