use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    None,
    Dices,
    SendCards,
    Playing,
    Result,
}

/// Operations a chair may have open at any moment. `spec.md` §4.7 step 1-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    Qi,
    Peng,
    GangChi,
    GangZhi,
    GangBu,
    HuChi,
    HuZhi,
    Guo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OperateRecord {
    pub chair: u8,
    pub tile: u8,
    pub op: OpType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeldKind {
    Peng,
    GangChi,
    GangZhi,
    GangBu,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Meld {
    pub kind: MeldKind,
    pub tile: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub winners: Vec<u8>,
    pub scores: Vec<i64>,
    pub hu_type: Option<OpType>,
}

/// `spec.md` §3's mahjong `GameData`. `wall` is the face-down draw pile
/// (`rest_count == wall.len()`); `hand_cards` holds only concealed tiles,
/// melded triplets/kans live in `melds` and are folded back into a full
/// 14-tile count whenever the recognizer needs to evaluate a hand
/// (`MahjongEngine::full_counts`).
pub struct GameData {
    pub banker_chair: u8,
    pub chair_count: u8,
    pub bureau: u32,
    pub status: GameStatus,
    pub hand_cards: Vec<Vec<u8>>,
    pub melds: Vec<Vec<Meld>>,
    pub operate_arrays: Vec<Vec<OpType>>,
    pub operate_record: Vec<OperateRecord>,
    pub wall: Vec<u8>,
    pub result: Option<GameResult>,
    pub turn_chair: u8,
    pub pending_reactors: Vec<u8>,
    pub last_discard: Option<(u8, u8)>,
    /// Running per-chair score for the bureau. Gang payments post here
    /// immediately when recorded; the win bonus posts at `end_round`.
    pub scores: Vec<i64>,
}

impl GameData {
    pub fn new(chair_count: u8, banker_chair: u8, bureau: u32) -> Self {
        let n = chair_count as usize;
        Self {
            banker_chair,
            chair_count,
            bureau,
            status: GameStatus::None,
            hand_cards: vec![Vec::new(); n],
            melds: vec![Vec::new(); n],
            operate_arrays: vec![Vec::new(); n],
            operate_record: Vec::new(),
            wall: Vec::new(),
            result: None,
            turn_chair: banker_chair,
            pending_reactors: Vec::new(),
            last_discard: None,
            scores: vec![0; n],
        }
    }

    pub fn rest_count(&self) -> usize {
        self.wall.len()
    }
}
