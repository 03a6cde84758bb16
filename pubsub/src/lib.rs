//! Cross-worker message transport, ported from the original's
//! `framework/remote/nats.go`: a single subject per `serverId`, publish to a
//! peer's subject, read everything that arrives on your own.
//!
//! `local` backs integration tests with an in-process broadcast bus so the
//! worker/room/gateway stack can be exercised without a running NATS server.

mod error;
pub mod local;
pub mod nats;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::PubSubError;

/// A live subscription to a single subject. Mirrors the original's
/// `readChan`: callers pull frames one at a time.
#[async_trait]
pub trait Subscription: Send {
    async fn next(&mut self) -> Option<Bytes>;
}

/// Transport abstraction over NATS (production) and an in-process bus
/// (tests). `subscribe` is called once per `serverId` at worker startup;
/// `publish` sends to a peer's subject by name.
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, PubSubError>;
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), PubSubError>;
    async fn close(&self) -> Result<(), PubSubError>;
}
