use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

/// Service-discovery lookup gating the pre-login registration path
/// (`spec.md` §5: "not on the hot in-game path"). No networked
/// implementation lives here.
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    async fn resolve(&self, service_name: &str) -> Result<Option<Endpoint>, Error>;
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryDiscovery {
        endpoints: Mutex<HashMap<String, Endpoint>>,
    }

    impl InMemoryDiscovery {
        pub fn register(&self, service_name: impl Into<String>, endpoint: Endpoint) {
            self.endpoints.lock().unwrap().insert(service_name.into(), endpoint);
        }
    }

    #[async_trait]
    impl ServiceDiscovery for InMemoryDiscovery {
        async fn resolve(&self, service_name: &str) -> Result<Option<Endpoint>, Error> {
            Ok(self.endpoints.lock().unwrap().get(service_name).cloned())
        }
    }

    #[tokio::test]
    async fn resolves_registered_service() {
        let discovery = InMemoryDiscovery::default();
        discovery.register("connector", Endpoint { host: "127.0.0.1".into(), port: 9000 });
        let found = discovery.resolve("connector").await.unwrap().unwrap();
        assert_eq!(found.port, 9000);
        assert!(discovery.resolve("missing").await.unwrap().is_none());
    }
}
