use std::time::Duration;

use domain::RoomUser;
use game_engine::{EngineError, EngineEvent, GameEngine};
use mahjong_logic::{recognizer, tile};
use serde::Deserialize;
use serde_json::json;

use crate::deck::wash_cards;
use crate::state::{GameData, GameResult, GameStatus, Meld, MeldKind, OpType, OperateRecord};

pub const RESULT_RESET_DELAY: Duration = Duration::from_secs(3);
const RESULT_TIMER_ID: &str = "mahjong.result_reset";
const HAND_SIZE: usize = 13;

#[derive(Debug, Deserialize)]
struct TileRequest {
    #[serde(default)]
    tile: u8,
}

/// Mahjong engine: deal, the `setTurn`/`Qi`/`Peng`/`GangChi`/`GangZhi`/
/// `GangBu`/`HuChi`/`HuZhi`/`Guo` turn protocol, result emission,
/// redaction. `spec.md` §4.7.
pub struct MahjongEngine {
    frame_type: u8,
    base_score: i64,
    data: GameData,
}

impl MahjongEngine {
    pub fn new(chair_count: u8, frame_type: u8, base_score: i64) -> Self {
        Self {
            frame_type,
            base_score,
            data: GameData::new(chair_count, 0, 0),
        }
    }

    fn remove_from_hand(&mut self, chair: usize, tile_id: u8) -> bool {
        let hand = &mut self.data.hand_cards[chair];
        if let Some(pos) = hand.iter().position(|&t| t == tile_id) {
            hand.remove(pos);
            true
        } else {
            false
        }
    }

    fn remove_n_from_hand(&mut self, chair: usize, tile_id: u8, n: usize) -> bool {
        let count = self.data.hand_cards[chair].iter().filter(|&&t| t == tile_id).count();
        if count < n {
            return false;
        }
        for _ in 0..n {
            self.remove_from_hand(chair, tile_id);
        }
        true
    }

    fn count_in_hand(&self, chair: usize, tile_id: u8) -> usize {
        self.data.hand_cards[chair].iter().filter(|&&t| t == tile_id).count()
    }

    fn has_peng(&self, chair: usize, tile_id: u8) -> bool {
        self.data.melds[chair].iter().any(|m| m.kind == MeldKind::Peng && m.tile == tile_id)
    }

    /// Folds a chair's concealed hand plus melded triplets/kans (each kan
    /// contributes only 3 tiles toward the win shape, mirroring real
    /// mahjong's "one tile of the kan is a bonus, not part of the 14")
    /// into the flat tile list the recognizer expects, optionally
    /// appending one more tile under consideration.
    fn full_tiles(&self, chair: usize, extra: Option<u8>) -> Vec<u8> {
        let mut tiles = self.data.hand_cards[chair].clone();
        for meld in &self.data.melds[chair] {
            tiles.extend([meld.tile; 3]);
        }
        tiles.extend(extra);
        tiles
    }

    fn can_win(&self, chair: usize, extra: Option<u8>) -> bool {
        recognizer().can_win_tiles(&self.full_tiles(chair, extra))
    }

    fn reaction_ops(&self, chair: usize, discarded: u8) -> Vec<OpType> {
        let mut ops = Vec::new();
        if self.can_win(chair, Some(discarded)) {
            ops.push(OpType::HuChi);
        }
        if self.count_in_hand(chair, discarded) >= 2 {
            ops.push(OpType::Peng);
        }
        if self.count_in_hand(chair, discarded) >= 3 {
            ops.push(OpType::GangChi);
        }
        if self.has_peng(chair, discarded) {
            ops.push(OpType::GangBu);
        }
        ops
    }

    fn redact(&self, tile_id: u8, owner: u8, viewer: u8) -> u8 {
        if owner == viewer { tile_id } else { tile::HIDDEN }
    }

    /// `setTurn`: draws one tile for `chair`, builds its operate array,
    /// and pushes the (owner-visible / others-hidden) turn notification.
    fn set_turn(&mut self, chair: u8) -> Vec<EngineEvent> {
        if self.data.wall.is_empty() {
            return self.end_round(None, None);
        }
        let chair_idx = chair as usize;
        let drawn = self.data.wall.pop().expect("checked non-empty");
        self.data.hand_cards[chair_idx].push(drawn);
        self.data.turn_chair = chair;

        let mut ops = vec![OpType::Qi];
        if self.can_win(chair_idx, None) {
            ops.push(OpType::HuZhi);
        }
        if self.count_in_hand(chair_idx, drawn) == 4 {
            ops.push(OpType::GangZhi);
        }
        if self.has_peng(chair_idx, drawn) {
            ops.push(OpType::GangBu);
        }
        self.data.operate_arrays[chair_idx] = ops.clone();

        let others: Vec<u8> = (0..self.data.chair_count).filter(|&c| c != chair).collect();
        vec![
            EngineEvent::PushTo {
                chairs: vec![chair],
                route: "GameTurn".into(),
                data: json!({ "chair": chair, "tile": drawn, "operate_array": ops, "rest_count": self.data.rest_count() }),
            },
            EngineEvent::PushTo {
                chairs: others,
                route: "GameTurn".into(),
                data: json!({ "chair": chair, "tile": tile::HIDDEN, "operate_array": Vec::<OpType>::new(), "rest_count": self.data.rest_count() }),
            },
        ]
    }

    fn close_reaction_window(&mut self) {
        for &c in &self.data.pending_reactors.clone() {
            self.data.operate_arrays[c as usize].clear();
        }
        self.data.pending_reactors.clear();
        self.data.last_discard = None;
    }

    /// Posts an immediate `base_score` transfer from every other chair to
    /// `ganger` onto the running `scores` tally. Gang payments are not
    /// deferred to settlement (mahjong convention; `spec.md` §9 decision).
    fn post_gang_payment(&mut self, ganger: u8) {
        for c in 0..self.data.chair_count {
            if c != ganger {
                self.data.scores[c as usize] -= self.base_score;
                self.data.scores[ganger as usize] += self.base_score;
            }
        }
    }

    fn end_round(&mut self, winner: Option<u8>, hu_type: Option<OpType>) -> Vec<EngineEvent> {
        let n = self.data.chair_count as usize;
        if let Some(w) = winner {
            for c in 0..n {
                if c != w as usize {
                    self.data.scores[c] -= self.base_score;
                    self.data.scores[w as usize] += self.base_score;
                }
            }
            self.data.banker_chair = w;
        }
        let scores = self.data.scores.clone();
        self.data.status = GameStatus::Result;
        self.data.result = Some(GameResult {
            winners: winner.into_iter().collect(),
            scores: scores.clone(),
            hu_type,
        });

        vec![
            EngineEvent::Broadcast {
                route: "GameResult".into(),
                data: json!({
                    "scores": scores,
                    "hand_cards": self.data.hand_cards,
                    "winners": winner.into_iter().collect::<Vec<_>>(),
                    "rest_count": self.data.rest_count(),
                    "hu_type": hu_type,
                }),
            },
            EngineEvent::SetTimer { id: RESULT_TIMER_ID.into(), after: RESULT_RESET_DELAY },
        ]
    }
}

impl GameEngine for MahjongEngine {
    fn start_game(&mut self, users: &[RoomUser]) -> Vec<EngineEvent> {
        let chair_count = users.len() as u8;
        let banker_chair = self.data.banker_chair;
        let bureau = self.data.bureau + 1;
        self.data = GameData::new(chair_count, banker_chair, bureau);
        self.data.wall = wash_cards(self.frame_type);
        self.data.status = GameStatus::Playing;

        for user in users {
            let chair = user.chair_id as usize;
            for _ in 0..HAND_SIZE {
                if let Some(t) = self.data.wall.pop() {
                    self.data.hand_cards[chair].push(t);
                }
            }
        }

        let mut events = vec![EngineEvent::Broadcast {
            route: "GameStatus".into(),
            data: json!({ "status": GameStatus::Playing, "banker_chair": banker_chair, "bureau": bureau }),
        }];
        events.extend(self.set_turn(banker_chair));
        events
    }

    fn handle_message(
        &mut self,
        chair: u8,
        route: &str,
        data: &serde_json::Value,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let chair_idx = chair as usize;
        let req: TileRequest = serde_json::from_value(data.clone()).unwrap_or(TileRequest { tile: 0 });

        match route {
            "Qi" => {
                if chair != self.data.turn_chair {
                    return Err(EngineError::NotYourTurn { expected: self.data.turn_chair, got: chair });
                }
                if !self.remove_from_hand(chair_idx, req.tile) {
                    return Err(EngineError::InvalidOperation(format!("tile {} not held", req.tile)));
                }
                self.data.operate_record.push(OperateRecord { chair, tile: req.tile, op: OpType::Qi });
                self.data.operate_arrays[chair_idx].clear();

                let mut reactors = Vec::new();
                for c in 0..self.data.chair_count {
                    if c == chair {
                        continue;
                    }
                    let ops = self.reaction_ops(c as usize, req.tile);
                    if !ops.is_empty() {
                        self.data.operate_arrays[c as usize] = ops;
                        reactors.push(c);
                    }
                }

                let mut events = vec![EngineEvent::Broadcast {
                    route: "Discard".into(),
                    data: json!({ "chair": chair, "tile": req.tile }),
                }];

                if reactors.is_empty() {
                    self.data.last_discard = None;
                    events.extend(self.set_turn((chair + 1) % self.data.chair_count));
                } else {
                    self.data.last_discard = Some((chair, req.tile));
                    self.data.pending_reactors = reactors.clone();
                    for &r in &reactors {
                        events.push(EngineEvent::PushTo {
                            chairs: vec![r],
                            route: "GameTurn".into(),
                            data: json!({ "chair": r, "tile": req.tile, "operate_array": self.data.operate_arrays[r as usize] }),
                        });
                    }
                }
                Ok(events)
            }
            "Peng" => {
                if !self.data.pending_reactors.contains(&chair) {
                    return Err(EngineError::InvalidOperation("no reaction window open".into()));
                }
                let (discarder, tile_id) = self.data.last_discard.ok_or_else(|| {
                    EngineError::InvalidOperation("no pending discard".into())
                })?;
                if !self.remove_n_from_hand(chair_idx, tile_id, 2) {
                    return Err(EngineError::InvalidOperation("not enough tiles to peng".into()));
                }
                self.data.melds[chair_idx].push(Meld { kind: MeldKind::Peng, tile: tile_id });
                self.data.operate_record.push(OperateRecord { chair, tile: tile_id, op: OpType::Peng });
                self.close_reaction_window();
                self.data.operate_arrays[chair_idx] = vec![OpType::Qi];
                self.data.turn_chair = chair;
                let _ = discarder;

                Ok(vec![
                    EngineEvent::Broadcast {
                        route: "UserPeng".into(),
                        data: json!({ "chair": chair, "tile": tile_id }),
                    },
                    EngineEvent::PushTo {
                        chairs: vec![chair],
                        route: "GameTurn".into(),
                        data: json!({ "chair": chair, "tile": 0, "operate_array": [OpType::Qi] }),
                    },
                ])
            }
            "GangChi" => {
                if !self.data.pending_reactors.contains(&chair) {
                    return Err(EngineError::InvalidOperation("no reaction window open".into()));
                }
                let (_, tile_id) = self.data.last_discard.ok_or_else(|| {
                    EngineError::InvalidOperation("no pending discard".into())
                })?;
                if !self.remove_n_from_hand(chair_idx, tile_id, 3) {
                    return Err(EngineError::InvalidOperation("not enough tiles to gang".into()));
                }
                self.data.melds[chair_idx].push(Meld { kind: MeldKind::GangChi, tile: tile_id });
                self.data.operate_record.push(OperateRecord { chair, tile: tile_id, op: OpType::GangChi });
                self.post_gang_payment(chair);
                self.close_reaction_window();
                let mut events = vec![EngineEvent::Broadcast {
                    route: "UserGang".into(),
                    data: json!({ "chair": chair, "tile": tile_id }),
                }];
                events.extend(self.set_turn(chair));
                Ok(events)
            }
            "GangZhi" => {
                if chair != self.data.turn_chair || !self.data.operate_arrays[chair_idx].contains(&OpType::GangZhi) {
                    return Err(EngineError::InvalidOperation("gangzhi not available".into()));
                }
                if !self.remove_n_from_hand(chair_idx, req.tile, 4) {
                    return Err(EngineError::InvalidOperation("not enough tiles to gangzhi".into()));
                }
                self.data.melds[chair_idx].push(Meld { kind: MeldKind::GangZhi, tile: req.tile });
                self.data.operate_record.push(OperateRecord { chair, tile: req.tile, op: OpType::GangZhi });
                self.post_gang_payment(chair);
                let others: Vec<u8> = (0..self.data.chair_count).filter(|&c| c != chair).collect();
                let mut events = vec![
                    EngineEvent::PushTo {
                        chairs: vec![chair],
                        route: "UserGang".into(),
                        data: json!({ "chair": chair, "tile": req.tile }),
                    },
                    EngineEvent::PushTo {
                        chairs: others,
                        route: "UserGang".into(),
                        data: json!({ "chair": chair, "tile": 0 }),
                    },
                ];
                events.extend(self.set_turn(chair));
                Ok(events)
            }
            "GangBu" => {
                let self_draw = chair == self.data.turn_chair && !self.data.pending_reactors.contains(&chair);
                let tile_id = if self_draw {
                    req.tile
                } else if self.data.pending_reactors.contains(&chair) {
                    self.data.last_discard.map(|(_, t)| t).unwrap_or(req.tile)
                } else {
                    return Err(EngineError::InvalidOperation("gangbu not available".into()));
                };
                if !self.has_peng(chair_idx, tile_id) {
                    return Err(EngineError::InvalidOperation("no existing peng to upgrade".into()));
                }
                if self_draw && !self.remove_from_hand(chair_idx, tile_id) {
                    return Err(EngineError::InvalidOperation("tile not held".into()));
                }
                for meld in self.data.melds[chair_idx].iter_mut() {
                    if meld.kind == MeldKind::Peng && meld.tile == tile_id {
                        meld.kind = MeldKind::GangBu;
                        break;
                    }
                }
                self.data.operate_record.push(OperateRecord { chair, tile: tile_id, op: OpType::GangBu });
                self.post_gang_payment(chair);
                if !self_draw {
                    self.close_reaction_window();
                }
                let others: Vec<u8> = (0..self.data.chair_count).filter(|&c| c != chair).collect();
                let mut events = vec![EngineEvent::PushTo {
                    chairs: others,
                    route: "UserGang".into(),
                    data: json!({ "chair": chair, "tile": tile::HIDDEN }),
                }];
                events.extend(self.set_turn(chair));
                Ok(events)
            }
            "HuChi" => {
                if !self.data.pending_reactors.contains(&chair) {
                    return Err(EngineError::InvalidOperation("no reaction window open".into()));
                }
                let (_, tile_id) = self.data.last_discard.ok_or_else(|| {
                    EngineError::InvalidOperation("no pending discard".into())
                })?;
                self.data.hand_cards[chair_idx].push(tile_id);
                self.data.operate_record.push(OperateRecord { chair, tile: tile_id, op: OpType::HuChi });
                self.close_reaction_window();
                Ok(self.end_round(Some(chair), Some(OpType::HuChi)))
            }
            "HuZhi" => {
                if chair != self.data.turn_chair || !self.data.operate_arrays[chair_idx].contains(&OpType::HuZhi) {
                    return Err(EngineError::InvalidOperation("huzhi not available".into()));
                }
                self.data.operate_record.push(OperateRecord { chair, tile: req.tile, op: OpType::HuZhi });
                Ok(self.end_round(Some(chair), Some(OpType::HuZhi)))
            }
            "Guo" => {
                if !self.data.pending_reactors.contains(&chair) {
                    return Err(EngineError::InvalidOperation("nothing to pass on".into()));
                }
                let discarder = self.data.last_discard.map(|(c, _)| c);
                self.data.operate_record.push(OperateRecord {
                    chair,
                    tile: self.data.last_discard.map(|(_, t)| t).unwrap_or(0),
                    op: OpType::Guo,
                });
                self.data.pending_reactors.retain(|&c| c != chair);
                self.data.operate_arrays[chair_idx].clear();
                if self.data.pending_reactors.is_empty() {
                    let next = discarder.map(|d| (d + 1) % self.data.chair_count).unwrap_or(self.data.turn_chair);
                    self.data.last_discard = None;
                    Ok(self.set_turn(next))
                } else {
                    Ok(Vec::new())
                }
            }
            other => Err(EngineError::UnknownOperation(other.to_string())),
        }
    }

    fn get_snapshot(&self, viewer_chair: u8) -> serde_json::Value {
        let rest_count = if self.data.status == GameStatus::None {
            self.data.wall.len().max(108 + if self.frame_type == 0 { 4 } else { 8 })
        } else {
            self.data.rest_count()
        };
        json!({
            "banker_chair": self.data.banker_chair,
            "bureau": self.data.bureau,
            "status": self.data.status,
            "rest_count": rest_count,
            "hand_cards": (0..self.data.chair_count).map(|c| {
                self.data.hand_cards[c as usize].iter().map(|&t| self.redact(t, c, viewer_chair)).collect::<Vec<u8>>()
            }).collect::<Vec<_>>(),
            "melds": self.data.melds,
        })
    }

    fn end_game(&mut self) -> Vec<EngineEvent> {
        self.data.status = GameStatus::None;
        let wall_len = build_deck_len(self.frame_type);
        vec![EngineEvent::Broadcast {
            route: "GameStatus".into(),
            data: json!({ "status": GameStatus::None, "rest_count": wall_len }),
        }]
    }
}

fn build_deck_len(frame_type: u8) -> usize {
    108 + if frame_type == 0 { 4 } else { 8 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::UserStatus;
    use mahjong_logic::tile::{SUIT_BAMBOO, SUIT_CIRCLE, WILD, encode};

    fn users(n: u8) -> Vec<RoomUser> {
        (0..n)
            .map(|c| RoomUser {
                uid: format!("u{c}"),
                nickname: format!("n{c}"),
                avatar: String::new(),
                gold: 0,
                chair_id: c,
                status: UserStatus::Playing,
            })
            .collect()
    }

    #[test]
    fn deals_thirteen_concealed_tiles_per_chair() {
        let mut engine = MahjongEngine::new(4, 0, 10);
        engine.start_game(&users(4));
        for c in 0..4usize {
            let expected = if c == 0 { HAND_SIZE + 1 } else { HAND_SIZE };
            assert_eq!(engine.data.hand_cards[c].len(), expected);
        }
    }

    #[test]
    fn self_mo_win_ends_the_round_with_a_winner() {
        let mut engine = MahjongEngine::new(2, 0, 10);
        engine.start_game(&users(2));
        // Rig chair 0's hand into a complete winning shape plus a drawn tile.
        let mut hand = Vec::new();
        hand.extend([encode(SUIT_CIRCLE, 1); 3]);
        hand.extend([encode(SUIT_CIRCLE, 4); 3]);
        hand.extend([encode(SUIT_CIRCLE, 6); 3]);
        hand.push(encode(SUIT_BAMBOO, 2));
        hand.push(encode(SUIT_BAMBOO, 3));
        hand.push(WILD);
        hand.push(WILD);
        hand.push(encode(SUIT_BAMBOO, 4));
        engine.data.hand_cards[0] = hand;
        engine.data.turn_chair = 0;
        engine.data.operate_arrays[0] = vec![OpType::Qi, OpType::HuZhi];

        let events = engine.handle_message(0, "HuZhi", &json!({})).unwrap();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Broadcast { route, .. } if route == "GameResult")));
        assert_eq!(engine.data.status, GameStatus::Result);
        assert_eq!(engine.data.banker_chair, 0);
    }

    #[test]
    fn discard_with_no_reaction_advances_to_next_chair() {
        let mut engine = MahjongEngine::new(2, 0, 10);
        engine.start_game(&users(2));
        let tile_to_discard = engine.data.hand_cards[0][0];
        // Make sure chair 1 can't react to whatever gets discarded.
        engine.data.hand_cards[1].clear();
        engine.handle_message(0, "Qi", &json!({ "tile": tile_to_discard })).unwrap();
        assert_eq!(engine.data.turn_chair, 1);
    }
}
