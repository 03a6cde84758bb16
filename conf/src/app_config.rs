use serde::{Deserialize, Serialize};

/// The YAML-ish document from `spec.md` §6: log level, connector ports,
/// JWT secret + expiry, pub/sub URL, per-service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub connector: ConnectorConfig,
    pub jwt: JwtConfig,
    pub pubsub: PubSubConfig,
    #[serde(default)]
    pub services: Vec<ServiceEndpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub ws_port: u16,
    #[serde(default = "default_pong_wait_secs")]
    pub pong_wait_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub name: String,
    pub host: String,
    pub port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_pong_wait_secs() -> u64 {
    10
}

impl AppConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let raw = r#"
connector:
  ws_port: 9000
jwt:
  secret: "dev-secret"
  expiry_secs: 3600
pubsub:
  url: "nats://127.0.0.1:4222"
"#;
        let cfg = AppConfig::from_yaml_str(raw).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.connector.pong_wait_secs, 10);
        assert_eq!(cfg.connector.ws_port, 9000);
    }
}
