use async_nats::Client;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tracing::error;

use crate::{PubSub, PubSubError, Subscription};

/// Connects once at startup (`async_nats::connect`, mirroring `nats.Connect`
/// in the original) and hands out one live `async_nats::Subscriber` per
/// `subscribe` call.
pub struct NatsPubSub {
    client: Client,
}

impl NatsPubSub {
    pub async fn connect(url: &str) -> Result<Self, PubSubError> {
        let client = async_nats::connect(url).await.map_err(|e| PubSubError::Connect(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PubSub for NatsPubSub {
    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, PubSubError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| PubSubError::Subscribe(e.to_string()))?;
        Ok(Box::new(NatsSubscription { subscriber }))
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), PubSubError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| PubSubError::Publish(e.to_string()))
    }

    async fn close(&self) -> Result<(), PubSubError> {
        if let Err(e) = self.client.flush().await {
            error!(error = %e, "nats flush on close failed");
        }
        Ok(())
    }
}

struct NatsSubscription {
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl Subscription for NatsSubscription {
    async fn next(&mut self) -> Option<Bytes> {
        self.subscriber.next().await.map(|msg| msg.payload)
    }
}
