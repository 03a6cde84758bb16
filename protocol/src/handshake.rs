use serde::{Deserialize, Serialize};

/// Body of a Handshake request: `{"sys":{"heartbeat":N}}`. Parsed
/// permissively — the gateway doesn't require a particular advertised
/// interval from the client, only that the body (if present) is valid
/// JSON shaped like this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    pub sys: HandshakeSys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeSys {
    pub heartbeat: u32,
}

/// Body of a Handshake response: `{"code":200,"sys":{"heartbeat":N}}`,
/// `N` the server's configured ping interval in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeResponse {
    pub code: u32,
    pub sys: HandshakeSys,
}

impl HandshakeResponse {
    pub fn ok(heartbeat_secs: u32) -> Self {
        Self {
            code: 200,
            sys: HandshakeSys {
                heartbeat: heartbeat_secs,
            },
        }
    }
}
