#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("not chair {expected}'s turn (got {got})")]
    NotYourTurn { expected: u8, got: u8 },
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}
