use std::time::Duration;

/// What an engine call asks the room driver to do afterward. Kept as data
/// rather than performed directly so the driver (which owns the room's
/// write lock and its connection to the push fabric) stays the only place
/// that touches either.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Send `route`/`data` to every user currently in the room.
    Broadcast { route: String, data: serde_json::Value },
    /// Send `route`/`data` to a specific set of chairs (one entry, for
    /// per-chair redacted turns; several, for results).
    PushTo { chairs: Vec<u8>, route: String, data: serde_json::Value },
    /// Arm a named timer; when it fires the driver posts an intent for
    /// this engine's owning room to re-enter the lock and call back in.
    SetTimer { id: String, after: Duration },
    /// Cancel a previously armed timer, if still pending.
    CancelTimer { id: String },
}
