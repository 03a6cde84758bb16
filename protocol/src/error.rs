use thiserror::Error;

/// Errors the codec layer can produce. Never carries a backtrace to a
/// connection-level error on its own — callers decide whether a
/// `MalformedFrame`/`MalformedMessage` closes the connection (see the
/// three-strike rule in the gateway).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed frame")]
    MalformedFrame,
    #[error("malformed message")]
    MalformedMessage,
}
