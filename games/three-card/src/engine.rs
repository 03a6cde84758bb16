use std::time::Duration;

use domain::{GameRule, RoomUser};
use game_engine::{EngineError, EngineEvent, GameEngine};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::card::Card;
use crate::compare::compare_cards;
use crate::deck::shuffled_deck;
use crate::state::{GameData, ThreeCardStatus};

/// Marks another chair's hole cards hidden in a redacted snapshot, the
/// three-card analog of `mahjong_logic::tile::HIDDEN`.
pub const HIDDEN_CARD: u8 = 0xff;

pub const RESULT_RESET_DELAY: Duration = Duration::from_secs(3);
const RESULT_TIMER_ID: &str = "three_card.result_reset";

#[derive(Debug, Deserialize)]
struct CompareRequest {
    target: u8,
}

/// Three-card poker engine. Persists `banker_chair` across bureaus (the
/// one piece of state `spec.md` §4.7 says survives a `GameData` reset);
/// everything else lives in `GameData` and is rebuilt by `start_game`.
pub struct ThreeCardEngine {
    max_players: usize,
    base_score: i64,
    ante_multiplier: i64,
    banker_chair: u8,
    data: GameData,
}

impl ThreeCardEngine {
    pub fn new(rule: &GameRule) -> Self {
        let max_players = rule.max_players as usize;
        Self {
            max_players,
            base_score: rule.base_score,
            ante_multiplier: rule.add_scores.first().copied().unwrap_or(1),
            banker_chair: 0,
            data: GameData::new(max_players),
        }
    }

    fn ante(&self) -> i64 {
        self.base_score * self.ante_multiplier
    }

    fn hand_snapshot(&self, chair: usize, viewer_chair: u8) -> serde_json::Value {
        let reveal = self.data.revealed || chair == viewer_chair as usize;
        if reveal {
            json!(self.data.hand_cards[chair].iter().map(|c| c.0).collect::<Vec<u8>>())
        } else if self.data.hand_cards[chair].is_empty() {
            json!([])
        } else {
            json!([HIDDEN_CARD, HIDDEN_CARD, HIDDEN_CARD])
        }
    }

    /// Settles the hand once exactly one active chair remains: losers pay
    /// their accumulated pour, the sole winner splits their sum
    /// (`spec.md` §4.7's distribution rule), and the next bureau's banker
    /// is the first chair (ascending) left with a positive score.
    fn settle(&mut self) -> Vec<EngineEvent> {
        let winners = self.data.active_chairs();
        let losers: Vec<usize> = (0..self.max_players)
            .filter(|&c| {
                matches!(self.data.user_status[c], ThreeCardStatus::Folded | ThreeCardStatus::Lost)
            })
            .collect();

        let total_from_losers: i64 = losers.iter().map(|&c| self.data.pour_scores[c].iter().sum::<i64>()).sum();
        for &c in &losers {
            self.data.cur_scores[c] = -self.data.pour_scores[c].iter().sum::<i64>();
        }
        if !winners.is_empty() {
            let share = total_from_losers / winners.len() as i64;
            for &w in &winners {
                self.data.cur_scores[w] += share;
                self.data.user_status[w] = ThreeCardStatus::Won;
            }
        }
        self.data.losers = losers;
        self.data.revealed = true;

        if let Some(next_banker) = (0..self.max_players as u8).find(|&c| self.data.cur_scores[c as usize] > 0) {
            self.banker_chair = next_banker;
        }

        vec![
            EngineEvent::Broadcast {
                route: "GameResult".into(),
                data: json!({
                    "scores": self.data.cur_scores,
                    "losers": self.data.losers,
                    "winners": winners,
                    "hand_cards": (0..self.max_players)
                        .map(|c| self.data.hand_cards[c].iter().map(|card| card.0).collect::<Vec<u8>>())
                        .collect::<Vec<_>>(),
                }),
            },
            EngineEvent::SetTimer { id: RESULT_TIMER_ID.into(), after: RESULT_RESET_DELAY },
        ]
    }

    fn maybe_settle(&mut self) -> Vec<EngineEvent> {
        if self.data.active_chairs().len() <= 1 {
            self.settle()
        } else {
            Vec::new()
        }
    }
}

impl GameEngine for ThreeCardEngine {
    fn start_game(&mut self, users: &[RoomUser]) -> Vec<EngineEvent> {
        self.data = GameData::new(self.max_players);

        let mut deck = shuffled_deck();
        for user in users {
            let chair = user.chair_id as usize;
            self.data.user_status[chair] = ThreeCardStatus::Waiting;
            let hand: Vec<Card> = deck.split_off(deck.len() - 3);
            self.data.hand_cards[chair] = hand;
            self.data.pour_scores[chair].push(self.ante());
        }

        let mut events = vec![EngineEvent::Broadcast {
            route: "GameStatus".into(),
            data: json!({ "status": "Playing", "banker_chair": self.banker_chair }),
        }];
        for user in users {
            let chair = user.chair_id;
            events.push(EngineEvent::PushTo {
                chairs: vec![chair],
                route: "DealHand".into(),
                data: self.hand_snapshot(chair as usize, chair),
            });
        }
        events
    }

    fn handle_message(
        &mut self,
        chair: u8,
        route: &str,
        data: &serde_json::Value,
    ) -> Result<Vec<EngineEvent>, EngineError> {
        let chair_idx = chair as usize;
        if chair_idx >= self.max_players || !self.data.user_status[chair_idx].is_active() {
            return Err(EngineError::InvalidOperation(format!("chair {chair} is not active")));
        }

        match route {
            "Look" => {
                self.data.look_cards[chair_idx] = true;
                self.data.user_status[chair_idx] = ThreeCardStatus::Looked;
                Ok(vec![EngineEvent::PushTo {
                    chairs: vec![chair],
                    route: "LookAck".into(),
                    data: self.hand_snapshot(chair_idx, chair),
                }])
            }
            "Follow" => {
                self.data.pour_scores[chair_idx].push(self.ante());
                Ok(vec![EngineEvent::Broadcast {
                    route: "UserFollow".into(),
                    data: json!({ "chair": chair }),
                }])
            }
            "Fold" => {
                self.data.user_status[chair_idx] = ThreeCardStatus::Folded;
                let mut events = vec![EngineEvent::Broadcast {
                    route: "UserFold".into(),
                    data: json!({ "chair": chair }),
                }];
                events.extend(self.maybe_settle());
                Ok(events)
            }
            "Compare" => {
                let req: CompareRequest = serde_json::from_value(data.clone())
                    .map_err(|e| EngineError::InvalidOperation(e.to_string()))?;
                let target_idx = req.target as usize;
                if target_idx >= self.max_players || !self.data.user_status[target_idx].is_active() {
                    return Err(EngineError::InvalidOperation(format!("chair {} is not active", req.target)));
                }
                let mine: [Card; 3] = self.data.hand_cards[chair_idx]
                    .clone()
                    .try_into()
                    .map_err(|_| EngineError::InvalidOperation("hand not dealt".into()))?;
                let theirs: [Card; 3] = self.data.hand_cards[target_idx]
                    .clone()
                    .try_into()
                    .map_err(|_| EngineError::InvalidOperation("hand not dealt".into()))?;

                // A tie on a player-initiated showdown counts as a loss
                // for the initiator (`spec.md` §4.7).
                let loser_idx = match compare_cards(mine, theirs) {
                    std::cmp::Ordering::Greater => target_idx,
                    std::cmp::Ordering::Less | std::cmp::Ordering::Equal => chair_idx,
                };
                self.data.user_status[loser_idx] = ThreeCardStatus::Lost;

                let mut events = vec![EngineEvent::Broadcast {
                    route: "UserCompare".into(),
                    data: json!({ "initiator": chair, "target": req.target, "lost": loser_idx }),
                }];
                events.extend(self.maybe_settle());
                Ok(events)
            }
            other => Err(EngineError::UnknownOperation(other.to_string())),
        }
    }

    fn get_snapshot(&self, viewer_chair: u8) -> serde_json::Value {
        json!({
            "banker_chair": self.banker_chair,
            "status": (0..self.max_players).map(|c| format!("{:?}", self.data.user_status[c])).collect::<Vec<_>>(),
            "pour_scores": self.data.pour_scores,
            "hand_cards": (0..self.max_players)
                .map(|c| self.hand_snapshot(c, viewer_chair))
                .collect::<Vec<_>>(),
        })
    }

    fn end_game(&mut self) -> Vec<EngineEvent> {
        self.data = GameData::new(self.max_players);
        vec![EngineEvent::Broadcast {
            route: "GameStatus".into(),
            data: json!({ "status": "None", "banker_chair": self.banker_chair }),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::UserStatus;

    fn rule() -> GameRule {
        GameRule::three_card(3, 2, 10, vec![1])
    }

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
    fn fold_down_to_one_settles_and_pays_the_winner() {
        let mut engine = ThreeCardEngine::new(&rule());
        engine.start_game(&users(3));
        engine.handle_message(0, "Fold", &json!({})).unwrap();
        let events = engine.handle_message(1, "Fold", &json!({})).unwrap();
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Broadcast { route, .. } if route == "GameResult")));
        assert_eq!(engine.data.cur_scores[2], 20); // two folded antes of 10 each
        assert_eq!(engine.data.cur_scores[0], -10);
    }

    /// Scenario 6 from `spec.md` §8: chair 2 has positive `WinScores`, so
    /// the next bureau's banker is chair 2.
    #[test]
    fn banker_carries_to_next_bureau() {
        let mut engine = ThreeCardEngine::new(&rule());
        engine.start_game(&users(3));
        engine.handle_message(0, "Fold", &json!({})).unwrap();
        engine.handle_message(1, "Fold", &json!({})).unwrap();
        assert_eq!(engine.banker_chair, 2);

        engine.end_game();
        engine.start_game(&users(3));
        assert_eq!(engine.banker_chair, 2);
    }

    #[test]
    fn tie_on_a_showdown_is_a_loss_for_the_initiator() {
        let mut engine = ThreeCardEngine::new(&rule());
        engine.start_game(&users(2));
        // Force an identical-strength tie by overwriting both hands directly.
        engine.data.hand_cards[0] = vec![Card(0x01), Card(0x02), Card(0x03)];
        engine.data.hand_cards[1] = vec![Card(0x11), Card(0x12), Card(0x13)];
        let events = engine.handle_message(0, "Compare", &json!({ "target": 1 })).unwrap();
        assert_eq!(engine.data.user_status[0], ThreeCardStatus::Lost);
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Broadcast { route, .. } if route == "GameResult")));
    }
}
