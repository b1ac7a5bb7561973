use thiserror::Error;

use crate::board::chess_move::MoveParseError;
use crate::board::game_rules::GameResult;
use crate::board::move_apply::IllegalMoveError;
use crate::engine::error::EngineError;

/// Everything a match request can fail with. Each kind is distinct so a
/// presentation layer can map it to its own status codes.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    InvalidMoveFormat(#[from] MoveParseError),
    #[error(transparent)]
    IllegalMove(#[from] IllegalMoveError),
    #[error("game is over ({0})")]
    GameOver(GameResult),
    #[error("chess engine failed to start: {0}")]
    EngineInitialization(#[source] EngineError),
    #[error("failed to restart chess engine: {0}")]
    EngineUnavailable(#[source] EngineError),
    #[error("failed to get opponent move after {attempts} attempts: {last_error}")]
    OpponentMoveUnavailable {
        attempts: u32,
        #[source]
        last_error: EngineError,
    },
}

impl MatchError {
    /// Stable machine-readable name of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            MatchError::InvalidMoveFormat(_) => "invalid_move_format",
            MatchError::IllegalMove(_) => "illegal_move",
            MatchError::GameOver(_) => "game_over",
            MatchError::EngineInitialization(_) => "engine_initialization",
            MatchError::EngineUnavailable(_) => "engine_unavailable",
            MatchError::OpponentMoveUnavailable { .. } => "opponent_move_unavailable",
        }
    }
}
