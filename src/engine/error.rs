use std::time::Duration;

use thiserror::Error;

use crate::protocol::uci_codec::ProtocolError;

/// Failures of the external engine process.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Spawn or handshake failed. The supervisor does not retry this itself.
    #[error("engine initialization failed: {0}")]
    Initialization(String),
    /// The process exited, or the handle was not ready when asked for a move.
    #[error("engine terminated: {0}")]
    Terminated(String),
    /// No reply within the think-time budget (plus grace); the process was killed.
    #[error("engine did not reply within {0:?}")]
    Timeout(Duration),
    #[error("engine protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
}

impl EngineError {
    /// Whether a respawn-and-retry can reasonably recover from this failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EngineError::Initialization(_))
    }
}
