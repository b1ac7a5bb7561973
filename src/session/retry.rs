//! Bounded respawn-and-retry around opponent move requests.

use std::time::Duration;

use log::{error, info, warn};

use crate::board::chess_move::Move;
use crate::board::move_apply::apply;
use crate::board::position::Position;
use crate::engine::error::EngineError;
use crate::engine::supervisor::OpponentEngine;
use crate::protocol::uci_codec::ProtocolError;
use crate::session::error::MatchError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How hard to try for an opponent move.
///
/// Every retryable failure (crash, hang, bad reply) is followed by a respawn
/// when `respawn_on_failure` is set. A failed respawn aborts at once with
/// [`MatchError::EngineUnavailable`] instead of burning the remaining attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub respawn_on_failure: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            respawn_on_failure: true,
        }
    }
}

/// A legal opponent move and what it took to get it.
#[derive(Debug, Clone)]
pub struct OpponentReply {
    pub mv: Move,
    pub position_after: Position,
    pub attempts: u32,
    pub respawns: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn acquire_move<E: OpponentEngine + ?Sized>(
        &self,
        engine: &mut E,
        position: &Position,
        think_time: Duration,
    ) -> Result<OpponentReply, MatchError> {
        let max_attempts = self.max_attempts.max(1);
        let mut respawns = 0u32;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let failure = match engine.request_move(position, think_time) {
                Ok(mv) => match apply(position, mv) {
                    Ok(position_after) => {
                        return Ok(OpponentReply {
                            mv,
                            position_after,
                            attempts: attempt,
                            respawns,
                        });
                    }
                    Err(illegal) => {
                        // Treat as a broken handle; only a fresh process is trusted again.
                        engine.shutdown();
                        EngineError::Protocol(ProtocolError::IllegalMove(illegal))
                    }
                },
                Err(err) if err.is_retryable() => err,
                Err(err) => {
                    error!("opponent engine failed permanently: {err}");
                    return Err(MatchError::EngineUnavailable(err));
                }
            };

            warn!("opponent move attempt {attempt}/{max_attempts} failed: {failure}");
            last_error = Some(failure);

            if self.respawn_on_failure {
                if let Err(err) = engine.respawn() {
                    error!("engine respawn failed, giving up: {err}");
                    return Err(MatchError::EngineUnavailable(err));
                }
                respawns += 1;
                info!("engine respawned ({respawns} this request)");
            }
        }

        let last_error = last_error.unwrap_or_else(|| {
            EngineError::Terminated("no attempt was made".to_owned())
        });
        error!("no opponent move after {max_attempts} attempts: {last_error}");
        Err(MatchError::OpponentMoveUnavailable {
            attempts: max_attempts,
            last_error,
        })
    }
}
