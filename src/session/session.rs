//! Mutable state of one match: the live position, its history and the
//! opponent engine serving it.

use std::time::Duration;

use crate::board::chess_move::Move;
use crate::board::game_rules::{game_result, GameResult};
use crate::board::history::PositionHistory;
use crate::board::move_apply::{apply, IllegalMoveError};
use crate::board::position::Position;
use crate::engine::supervisor::OpponentEngine;
use crate::session::error::MatchError;
use crate::session::retry::{OpponentReply, RetryPolicy};

pub struct Session {
    position: Position,
    history: PositionHistory,
    moves: Vec<Move>,
    result: GameResult,
    engine: Box<dyn OpponentEngine + Send>,
}

impl Session {
    pub fn new(engine: Box<dyn OpponentEngine + Send>) -> Self {
        let position = Position::new_game();
        Self {
            history: PositionHistory::starting_from(&position),
            position,
            moves: Vec::new(),
            result: GameResult::Ongoing,
            engine,
        }
    }

    #[inline]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[inline]
    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    #[inline]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    #[inline]
    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn engine_mut(&mut self) -> &mut (dyn OpponentEngine + Send) {
        self.engine.as_mut()
    }

    /// Validate and play `mv`, then reclassify the game.
    pub fn play(&mut self, mv: Move) -> Result<GameResult, IllegalMoveError> {
        let next = apply(&self.position, mv)?;
        Ok(self.commit(mv, next))
    }

    /// Ask the engine for a reply to the current position under `policy`.
    pub fn request_reply(
        &mut self,
        policy: &RetryPolicy,
        think_time: Duration,
    ) -> Result<OpponentReply, MatchError> {
        policy.acquire_move(self.engine.as_mut(), &self.position, think_time)
    }

    /// Record an already validated move and its successor position.
    pub fn commit(&mut self, mv: Move, next: Position) -> GameResult {
        self.position = next;
        self.history.push(&self.position);
        self.moves.push(mv);
        self.result = game_result(&self.position, &self.history);
        self.result
    }

    /// Back to the initial position with empty history. The engine is untouched.
    pub fn reset_board(&mut self) {
        self.position = Position::new_game();
        self.history = PositionHistory::starting_from(&self.position);
        self.moves.clear();
        self.result = GameResult::Ongoing;
    }
}
