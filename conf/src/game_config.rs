use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The secondary JSON tree from `spec.md` §6:
/// `{gameConfig, serversConf:{nats, connector[], servers[]}}`. `servers[]`
/// is re-indexed into `serverType -> [ServerEntry]` at load time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub game_config: serde_json::Value,
    pub servers_conf: ServersConfRaw,
    /// Populated by [`GameConfig::load`], not present on the wire.
    #[serde(skip)]
    pub by_server_type: HashMap<String, Vec<ServerEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersConfRaw {
    pub nats: String,
    #[serde(default)]
    pub connector: Vec<ServerEntry>,
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    pub server_id: String,
    pub server_type: String,
    pub host: String,
    pub port: u16,
}

impl GameConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let mut cfg: GameConfig = serde_json::from_str(raw)?;
        cfg.reindex();
        Ok(cfg)
    }

    fn reindex(&mut self) {
        let mut by_server_type: HashMap<String, Vec<ServerEntry>> = HashMap::new();
        for entry in self
            .servers_conf
            .connector
            .iter()
            .chain(self.servers_conf.servers.iter())
        {
            by_server_type
                .entry(entry.server_type.clone())
                .or_default()
                .push(entry.clone());
        }
        self.by_server_type = by_server_type;
    }

    /// Servers of a given `serverType`, e.g. the ones a gateway can route
    /// `Data` messages to.
    pub fn servers_for(&self, server_type: &str) -> &[ServerEntry] {
        self.by_server_type
            .get(server_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reindexes_servers_by_type() {
        let raw = r#"{
            "gameConfig": {"maxBureau": 8},
            "serversConf": {
                "nats": "nats://127.0.0.1:4222",
                "connector": [
                    {"serverId": "gate-1", "serverType": "gate", "host": "127.0.0.1", "port": 3001}
                ],
                "servers": [
                    {"serverId": "room-1", "serverType": "room", "host": "127.0.0.1", "port": 4001},
                    {"serverId": "room-2", "serverType": "room", "host": "127.0.0.1", "port": 4002}
                ]
            }
        }"#;
        let cfg = GameConfig::from_json_str(raw).unwrap();
        assert_eq!(cfg.servers_for("room").len(), 2);
        assert_eq!(cfg.servers_for("gate").len(), 1);
        assert!(cfg.servers_for("missing").is_empty());
    }
}
