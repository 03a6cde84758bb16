use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    None,
    Ready,
    Playing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUser {
    pub uid: String,
    pub nickname: String,
    pub avatar: String,
    pub gold: i64,
    pub chair_id: u8,
    pub status: UserStatus,
}

impl RoomUser {
    pub fn new(uid: impl Into<String>, nickname: impl Into<String>, avatar: impl Into<String>, gold: i64, chair_id: u8) -> Self {
        Self {
            uid: uid.into(),
            nickname: nickname.into(),
            avatar: avatar.into(),
            gold,
            chair_id,
            status: UserStatus::None,
        }
    }
}
