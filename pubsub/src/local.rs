//! In-process stand-in for [`crate::nats::NatsPubSub`], used by integration
//! tests that need multiple simulated workers talking to each other without
//! a NATS server.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::broadcast;

use crate::{PubSub, PubSubError, Subscription};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Default)]
pub struct LocalPubSub {
    buses: Mutex<HashMap<String, broadcast::Sender<Bytes>>>,
}

impl LocalPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    fn bus_for(&self, subject: &str) -> broadcast::Sender<Bytes> {
        let mut buses = self.buses.lock().expect("local pubsub mutex poisoned");
        buses
            .entry(subject.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl PubSub for LocalPubSub {
    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, PubSubError> {
        let receiver = self.bus_for(subject).subscribe();
        Ok(Box::new(LocalSubscription { receiver }))
    }

    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), PubSubError> {
        // Mirrors NATS semantics: publishing to a subject with no current
        // subscriber is not an error, the message is simply dropped.
        let _ = self.bus_for(subject).send(payload);
        Ok(())
    }

    async fn close(&self) -> Result<(), PubSubError> {
        Ok(())
    }
}

struct LocalSubscription {
    receiver: broadcast::Receiver<Bytes>,
}

#[async_trait]
impl Subscription for LocalSubscription {
    async fn next(&mut self) -> Option<Bytes> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_a_live_subscriber() {
        let bus = LocalPubSub::new();
        let mut sub = bus.subscribe("server-1").await.unwrap();
        bus.publish("server-1", Bytes::from_static(b"hello")).await.unwrap();
        let received = sub.next().await.unwrap();
        assert_eq!(received, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn two_subscribers_both_see_the_same_message() {
        let bus = LocalPubSub::new();
        let mut a = bus.subscribe("room-broadcast").await.unwrap();
        let mut b = bus.subscribe("room-broadcast").await.unwrap();
        bus.publish("room-broadcast", Bytes::from_static(b"push")).await.unwrap();
        assert_eq!(a.next().await.unwrap(), Bytes::from_static(b"push"));
        assert_eq!(b.next().await.unwrap(), Bytes::from_static(b"push"));
    }

    #[tokio::test]
    async fn distinct_subjects_do_not_cross_talk() {
        let bus = LocalPubSub::new();
        let mut sub = bus.subscribe("server-a").await.unwrap();
        bus.publish("server-b", Bytes::from_static(b"not for you")).await.unwrap();
        bus.publish("server-a", Bytes::from_static(b"for you")).await.unwrap();
        assert_eq!(sub.next().await.unwrap(), Bytes::from_static(b"for you"));
    }
}
