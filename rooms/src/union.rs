use dashmap::DashMap;
use domain::GameRule;
use platform::Error;
use rand::Rng;
use tokio::sync::mpsc;

use crate::event::RoomEvent;
use crate::room::Room;

const ROOM_ID_MIN: u32 = 100_000;
const ROOM_ID_MAX: u32 = 999_999;

/// A tenant's own room map. Lookups and dismissal go through the owning
/// `Union` so the write lock granularity matches `spec.md` §4.6 ("Union.rooms
/// ... per-container write lock" — `DashMap` gives us that per-shard rather
/// than a single `RwLock<HashMap<..>>`, which is the idiomatic Rust
/// equivalent the pack's other concurrent-map users reach for).
#[derive(Default)]
pub struct Union {
    rooms: DashMap<String, Room>,
}

impl Union {
    pub fn room(&self, id: &str) -> Option<Room> {
        self.rooms.get(id).map(|r| r.clone())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Owns `{tenant_id -> Union}` and allocates globally-unique 6-digit room
/// ids by rejection sampling (`spec.md` §4.6). Room id uniqueness is
/// checked across every tenant, not just the one creating the room —
/// "retry until no union holds that id".
#[derive(Default)]
pub struct UnionManager {
    unions: DashMap<i64, Union>,
}

impl UnionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.unions.iter().any(|u| u.rooms.contains_key(id))
    }

    fn allocate_room_id(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = rng.gen_range(ROOM_ID_MIN..=ROOM_ID_MAX).to_string();
            if !self.id_in_use(&candidate) {
                return candidate;
            }
        }
    }

    /// Creates a room under `tenant_id` with a fresh globally-unique id,
    /// creating the tenant's `Union` entry on first use. The returned
    /// receiver is the room's background event feed (kick timeouts, result
    /// resets) — the caller is expected to drain it for the room's whole
    /// lifetime, same as it would the events returned by a direct call to
    /// `enter`/`ready`/`handle_game_message`.
    pub fn create_room(&self, tenant_id: i64, rule: GameRule) -> (Room, mpsc::UnboundedReceiver<RoomEvent>) {
        let id = self.allocate_room_id();
        let (room, events_rx) = Room::new(id.clone(), tenant_id, rule);
        self.unions.entry(tenant_id).or_default().rooms.insert(id, room.clone());
        (room, events_rx)
    }

    /// Scans every tenant's union for `room_id` (`spec.md` §4.6: "lookups
    /// by room id scan the union set").
    pub fn find_room(&self, room_id: &str) -> Result<Room, Error> {
        self.unions
            .iter()
            .find_map(|u| u.room(room_id))
            .ok_or_else(|| Error::RoomNotExist(room_id.to_string()))
    }

    /// Removes a room from its owning union. Idempotent: dismissing an id
    /// that's already gone (or never existed) leaves the same observable
    /// state.
    pub fn dismiss_room(&self, room_id: &str) {
        for union in self.unions.iter() {
            if union.rooms.remove(room_id).is_some() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> GameRule {
        GameRule::three_card(3, 2, 10, vec![1])
    }

    #[tokio::test]
    async fn room_ids_are_six_digits_and_unique() {
        let manager = UnionManager::new();
        let (a, _) = manager.create_room(1, rule());
        let (b, _) = manager.create_room(1, rule());
        assert_eq!(a.id.len(), 6);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn dismiss_is_idempotent() {
        let manager = UnionManager::new();
        let (room, _) = manager.create_room(1, rule());
        manager.dismiss_room(&room.id);
        manager.dismiss_room(&room.id);
        assert!(manager.find_room(&room.id).is_err());
    }

    #[tokio::test]
    async fn find_room_scans_across_tenants() {
        let manager = UnionManager::new();
        let (room, _) = manager.create_room(42, rule());
        assert_eq!(manager.find_room(&room.id).unwrap().tenant_id, 42);
    }
}
