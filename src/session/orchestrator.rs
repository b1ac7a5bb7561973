//! Match session orchestration.
//!
//! `MatchOrchestrator` serializes every mutating request (player move, reset,
//! engine start/stop) behind one `Mutex<Session>`, held for the whole request
//! including any opponent-move retries. After each applied move it publishes
//! an immutable snapshot under an `RwLock`, which read-only queries use so they
//! never wait on an engine and never see a half-applied move.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use log::{debug, info, warn};

use crate::board::chess_move::Move;
use crate::board::chess_types::Color;
use crate::board::game_rules::GameResult;
use crate::board::position::Position;
use crate::engine::supervisor::OpponentEngine;
use crate::session::error::MatchError;
use crate::session::retry::RetryPolicy;
use crate::session::session::Session;
use crate::utils::pgn::write_pgn;

pub const DEFAULT_THINK_TIME: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    /// Per-move budget handed to the engine.
    pub think_time: Duration,
    pub retry: RetryPolicy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            think_time: DEFAULT_THINK_TIME,
            retry: RetryPolicy::default(),
        }
    }
}

/// Response to an accepted player move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub player_move: Move,
    /// Absent when the player's move ended the game.
    pub opponent_move: Option<Move>,
    pub terminal: bool,
    pub result: GameResult,
    pub winner: Option<Color>,
    /// Engine respawns performed while serving this request.
    pub engine_restarts: u32,
    pub fen: String,
}

#[derive(Debug, Clone)]
struct Snapshot {
    position: Position,
    moves: Vec<Move>,
    result: GameResult,
}

impl Snapshot {
    fn of(session: &Session) -> Self {
        Self {
            position: session.position().clone(),
            moves: session.moves().to_vec(),
            result: session.result(),
        }
    }
}

pub struct MatchOrchestrator {
    config: MatchConfig,
    session: Mutex<Session>,
    snapshot: RwLock<Snapshot>,
}

impl MatchOrchestrator {
    /// Build a session around `engine` without starting it.
    pub fn new(engine: Box<dyn OpponentEngine + Send>, config: MatchConfig) -> Self {
        let session = Session::new(engine);
        let snapshot = Snapshot::of(&session);
        Self {
            config,
            session: Mutex::new(session),
            snapshot: RwLock::new(snapshot),
        }
    }

    #[inline]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Start the engine for the first time.
    ///
    /// On failure the orchestrator stays usable for position queries; move
    /// submissions will keep trying to respawn under the retry policy.
    pub fn initialize(&self) -> Result<(), MatchError> {
        let mut session = self.lock_session();
        session
            .engine_mut()
            .respawn()
            .map_err(MatchError::EngineInitialization)?;
        info!("match engine initialized");
        Ok(())
    }

    pub fn submit_player_move(&self, move_text: &str) -> Result<MatchOutcome, MatchError> {
        let mut session = self.lock_session();

        if session.result().is_terminal() {
            return Err(MatchError::GameOver(session.result()));
        }

        let player_move = Move::parse(move_text)?;
        let mut result = session.play(player_move)?;
        debug!("player move {player_move} accepted, result {result}");
        self.publish(&session);

        let mut opponent_move = None;
        let mut engine_restarts = 0;

        if !result.is_terminal() {
            // The player's move stays applied whatever happens below.
            let reply = session.request_reply(&self.config.retry, self.config.think_time)?;
            engine_restarts = reply.respawns;
            result = session.commit(reply.mv, reply.position_after);
            opponent_move = Some(reply.mv);
            debug!(
                "opponent move {} after {} attempt(s), result {result}",
                reply.mv, reply.attempts
            );
            self.publish(&session);
        }

        if result.is_terminal() {
            info!("game over: {result}");
        }

        Ok(MatchOutcome {
            player_move,
            opponent_move,
            terminal: result.is_terminal(),
            result,
            winner: result.winner(),
            engine_restarts,
            fen: session.position().to_fen(),
        })
    }

    /// New game: initial position, empty history and a freshly spawned engine.
    ///
    /// The board is reset even when the respawn fails.
    pub fn reset(&self) -> Result<(), MatchError> {
        let mut session = self.lock_session();
        session.reset_board();
        self.publish(&session);
        info!("session reset");

        session.engine_mut().respawn().map_err(|err| {
            warn!("engine respawn on reset failed: {err}");
            MatchError::EngineUnavailable(err)
        })
    }

    pub fn is_engine_available(&self) -> bool {
        self.lock_session().engine_mut().is_available()
    }

    /// Stop the engine process. Idempotent.
    pub fn shutdown(&self) {
        self.lock_session().engine_mut().shutdown();
    }

    pub fn current_position(&self) -> Position {
        self.read_snapshot(|snapshot| snapshot.position.clone())
    }

    pub fn current_fen(&self) -> String {
        self.read_snapshot(|snapshot| snapshot.position.to_fen())
    }

    pub fn move_history(&self) -> Vec<Move> {
        self.read_snapshot(|snapshot| snapshot.moves.clone())
    }

    pub fn result(&self) -> GameResult {
        self.read_snapshot(|snapshot| snapshot.result)
    }

    pub fn export_pgn(&self, white: &str, black: &str) -> String {
        self.read_snapshot(|snapshot| write_pgn(&snapshot.moves, snapshot.result, white, black))
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, session: &Session) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *snapshot = Snapshot::of(session);
    }

    fn read_snapshot<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        f(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::board::move_apply::apply;
    use crate::session::scripted_engine::{Script, ScriptedEngine, Step};

    fn orchestrator(steps: Vec<Step>) -> (MatchOrchestrator, Arc<Mutex<Script>>) {
        let (engine, script) = ScriptedEngine::new(steps);
        (
            MatchOrchestrator::new(Box::new(engine), MatchConfig::default()),
            script,
        )
    }

    #[test]
    fn player_move_gets_one_reply() {
        let (orchestrator, script) = orchestrator(vec![Step::Play("e7e5")]);
        let outcome = orchestrator.submit_player_move("e2e4").expect("move should be accepted");

        assert_eq!(outcome.player_move, Move::new(12, 28));
        assert_eq!(outcome.opponent_move, Some(Move::new(52, 36)));
        assert!(!outcome.terminal);
        assert_eq!(outcome.result, GameResult::Ongoing);
        assert_eq!(outcome.engine_restarts, 0);
        assert_eq!(script.lock().expect("script").requests, 1);
        assert_eq!(
            orchestrator.current_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2"
        );
        assert_eq!(orchestrator.move_history().len(), 2);
    }

    #[test]
    fn player_checkmate_skips_engine() {
        // 1. e4 f6 2. d4 g5 3. Qh5#
        let (orchestrator, script) = orchestrator(vec![Step::Play("f7f6"), Step::Play("g7g5")]);
        orchestrator.submit_player_move("e2e4").expect("accepted");
        orchestrator.submit_player_move("d2d4").expect("accepted");
        let outcome = orchestrator.submit_player_move("d1h5").expect("accepted");

        assert!(outcome.terminal);
        assert_eq!(outcome.result, GameResult::Checkmate { winner: Color::White });
        assert_eq!(outcome.winner, Some(Color::White));
        assert_eq!(outcome.opponent_move, None);
        assert_eq!(script.lock().expect("script").requests, 2);

        let err = orchestrator.submit_player_move("a2a3").expect_err("game is over");
        assert!(matches!(err, MatchError::GameOver(GameResult::Checkmate { .. })));
        assert_eq!(orchestrator.result(), GameResult::Checkmate { winner: Color::White });
    }

    #[test]
    fn engine_delivered_checkmate_is_reported() {
        // Fool's mate with the engine playing black.
        let (orchestrator, _) = orchestrator(vec![Step::Play("e7e5"), Step::Play("d8h4")]);
        orchestrator.submit_player_move("f2f3").expect("accepted");
        let outcome = orchestrator.submit_player_move("g2g4").expect("accepted");
        assert!(outcome.terminal);
        assert_eq!(outcome.opponent_move, Some(Move::parse("d8h4").expect("parses")));
        assert_eq!(outcome.winner, Some(Color::Black));
        assert!(orchestrator.export_pgn("Player", "Engine").contains("2. g2g4 d8h4 0-1"));
    }

    #[test]
    fn bad_format_leaves_position_unchanged() {
        let (orchestrator, script) = orchestrator(vec![]);
        let before = orchestrator.current_position();
        let err = orchestrator.submit_player_move("z9z9").expect_err("bad format");
        assert!(matches!(err, MatchError::InvalidMoveFormat(_)), "{err}");
        assert_eq!(err.code(), "invalid_move_format");
        assert_eq!(orchestrator.current_position(), before);
        assert_eq!(script.lock().expect("script").requests, 0);
    }

    #[test]
    fn pinned_piece_move_is_illegal() {
        // 1. e4 e5 2. d3 Bb4+ 3. Nc3 a6: the knight on c3 is pinned to e1.
        let (orchestrator, _) = orchestrator(vec![
            Step::Play("e7e5"),
            Step::Play("f8b4"),
            Step::Play("a7a6"),
        ]);
        for text in ["e2e4", "d2d3", "b1c3"] {
            orchestrator.submit_player_move(text).expect("accepted");
        }
        let before = orchestrator.current_position();
        let history_len = orchestrator.move_history().len();

        let err = orchestrator.submit_player_move("c3d5").expect_err("pinned knight");
        assert!(matches!(err, MatchError::IllegalMove(_)), "{err}");
        assert_eq!(err.code(), "illegal_move");
        assert_eq!(orchestrator.current_position(), before);
        assert_eq!(orchestrator.move_history().len(), history_len);
    }

    #[test]
    fn two_crashes_then_success() {
        let (orchestrator, script) =
            orchestrator(vec![Step::Crash, Step::Crash, Step::Play("e7e5")]);
        let outcome = orchestrator.submit_player_move("e2e4").expect("third attempt succeeds");

        assert_eq!(outcome.opponent_move, Some(Move::new(52, 36)));
        assert_eq!(outcome.engine_restarts, 2);
        let script = script.lock().expect("script");
        assert_eq!(script.requests, 3);
        assert_eq!(script.respawn_calls, 2);
    }

    #[test]
    fn failed_respawn_keeps_player_move() {
        let (engine, script) = ScriptedEngine::new([Step::Crash]);
        let engine = engine.failing_respawns([false]);
        let orchestrator = MatchOrchestrator::new(Box::new(engine), MatchConfig::default());

        let err = orchestrator.submit_player_move("e2e4").expect_err("respawn fails");
        assert!(matches!(err, MatchError::EngineUnavailable(_)), "{err}");
        assert_eq!(orchestrator.move_history(), vec![Move::new(12, 28)]);
        assert_eq!(
            orchestrator.current_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        let script = script.lock().expect("script");
        assert_eq!(script.requests, 1);
        assert_eq!(script.respawn_calls, 1);
    }

    #[test]
    fn exhausted_attempts_report_opponent_move_unavailable() {
        let (orchestrator, script) =
            orchestrator(vec![Step::Hang, Step::Garbage, Step::Crash]);
        let err = orchestrator.submit_player_move("e2e4").expect_err("all attempts fail");
        assert!(
            matches!(err, MatchError::OpponentMoveUnavailable { attempts: 3, .. }),
            "{err}"
        );
        assert_eq!(orchestrator.move_history().len(), 1);
        let script = script.lock().expect("script");
        assert_eq!(script.requests, 3);
        assert_eq!(script.respawn_calls, 3);
    }

    #[test]
    fn illegal_engine_reply_counts_as_failed_attempt() {
        let (orchestrator, script) = orchestrator(vec![Step::Play("e7e4"), Step::Play("d7d5")]);
        let outcome = orchestrator.submit_player_move("e2e4").expect("retry succeeds");
        assert_eq!(outcome.opponent_move, Some(Move::parse("d7d5").expect("parses")));
        assert_eq!(outcome.engine_restarts, 1);
        let script = script.lock().expect("script");
        assert_eq!(script.shutdowns, 1);
        assert_eq!(script.respawn_calls, 1);
    }

    #[test]
    fn reset_restores_start_and_always_respawns() {
        let (orchestrator, script) = orchestrator(vec![]);
        orchestrator.submit_player_move("d2d4").expect("accepted");
        orchestrator.reset().expect("reset succeeds");

        assert_eq!(orchestrator.current_position(), Position::new_game());
        assert!(orchestrator.move_history().is_empty());
        assert_eq!(orchestrator.result(), GameResult::Ongoing);
        assert_eq!(script.lock().expect("script").respawn_calls, 1);
    }

    #[test]
    fn reset_reports_unavailable_engine_but_clears_board() {
        let (engine, _) = ScriptedEngine::new([]);
        let orchestrator =
            MatchOrchestrator::new(Box::new(engine.failing_respawns([false])), MatchConfig::default());
        orchestrator.submit_player_move("d2d4").expect("accepted");

        let err = orchestrator.reset().expect_err("respawn fails");
        assert!(matches!(err, MatchError::EngineUnavailable(_)));
        assert_eq!(orchestrator.current_position(), Position::new_game());
        assert!(!orchestrator.is_engine_available());
    }

    #[test]
    fn initialize_surfaces_engine_initialization_error() {
        let (engine, _) = ScriptedEngine::new([]);
        let orchestrator =
            MatchOrchestrator::new(Box::new(engine.failing_respawns([false])), MatchConfig::default());
        let err = orchestrator.initialize().expect_err("spawn fails");
        assert!(matches!(err, MatchError::EngineInitialization(_)));
        assert_eq!(orchestrator.current_fen(), Position::new_game().to_fen());
    }

    #[test]
    fn concurrent_submissions_are_serialized() {
        let (orchestrator, _) = orchestrator(vec![]);
        let orchestrator = Arc::new(orchestrator);

        let handles: Vec<_> = ["e2e4", "d2d4", "c2c4", "g1f3"]
            .into_iter()
            .map(|text| {
                let orchestrator = Arc::clone(&orchestrator);
                thread::spawn(move || orchestrator.submit_player_move(text))
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.join().expect("thread should not panic").is_ok() {
                accepted += 1;
            }
        }

        // Every accepted submission contributed exactly two plies, and the
        // published position replays from the recorded moves.
        let moves = orchestrator.move_history();
        assert!(accepted >= 1);
        assert_eq!(moves.len(), accepted * 2);
        let replayed = moves.iter().try_fold(Position::new_game(), |position, mv| {
            apply(&position, *mv)
        });
        assert_eq!(
            replayed.expect("recorded moves replay"),
            orchestrator.current_position()
        );
    }
}
