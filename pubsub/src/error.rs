#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    #[error("pubsub connect failed: {0}")]
    Connect(String),
    #[error("pubsub publish failed: {0}")]
    Publish(String),
    #[error("pubsub subscribe failed: {0}")]
    Subscribe(String),
}
