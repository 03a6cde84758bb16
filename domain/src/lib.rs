mod room_user;
mod rule;
mod session;
mod session_value;

pub use room_user::{RoomUser, UserStatus};
pub use rule::{GameRule, GameType};
pub use session::Session;
pub use session_value::SessionValue;
