//! In-process opponent driven by a script, for exercising the session and
//! retry logic without a subprocess.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::board::chess_move::Move;
use crate::board::move_generator::legal_moves;
use crate::board::position::Position;
use crate::engine::error::EngineError;
use crate::engine::supervisor::OpponentEngine;
use crate::protocol::uci_codec::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// First legal move in text order.
    FirstLegal,
    /// This exact move text, legal or not.
    Play(&'static str),
    Crash,
    Hang,
    Garbage,
}

#[derive(Debug, Default)]
pub struct Script {
    pub steps: VecDeque<Step>,
    /// Outcome of successive respawn calls; missing entries succeed.
    pub respawn_plan: VecDeque<bool>,
    pub available: bool,
    pub requests: u32,
    pub respawn_calls: u32,
    pub shutdowns: u32,
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    script: Arc<Mutex<Script>>,
}

impl ScriptedEngine {
    /// A ready engine plus a handle for inspecting and steering it.
    pub fn new(steps: impl IntoIterator<Item = Step>) -> (Self, Arc<Mutex<Script>>) {
        let script = Arc::new(Mutex::new(Script {
            steps: steps.into_iter().collect(),
            available: true,
            ..Script::default()
        }));
        (
            Self {
                script: Arc::clone(&script),
            },
            script,
        )
    }

    pub fn failing_respawns(self, plan: impl IntoIterator<Item = bool>) -> Self {
        self.script
            .lock()
            .expect("script lock")
            .respawn_plan
            .extend(plan);
        self
    }
}

impl OpponentEngine for ScriptedEngine {
    fn request_move(
        &mut self,
        position: &Position,
        think_time: Duration,
    ) -> Result<Move, EngineError> {
        let mut script = self.script.lock().expect("script lock");
        script.requests += 1;
        if !script.available {
            return Err(EngineError::Terminated("engine is not ready".to_owned()));
        }

        let step = script.steps.pop_front().unwrap_or(Step::FirstLegal);
        let result: Result<Move, EngineError> = match step {
            Step::FirstLegal => {
                let mut moves = legal_moves(position);
                moves.sort_by_key(|mv| mv.to_string());
                moves
                    .first()
                    .copied()
                    .ok_or_else(|| ProtocolError::NoMove("bestmove (none)".to_owned()).into())
            }
            Step::Play(text) => Move::parse(text).map_err(|source| {
                ProtocolError::BadMove {
                    line: format!("bestmove {text}"),
                    source,
                }
                .into()
            }),
            Step::Crash => Err(EngineError::Terminated("scripted crash".to_owned())),
            Step::Hang => Err(EngineError::Timeout(think_time)),
            Step::Garbage => Err(ProtocolError::UnexpectedReply("garbage".to_owned()).into()),
        };
        if result.is_err() {
            script.available = false;
        }
        result
    }

    fn respawn(&mut self) -> Result<(), EngineError> {
        let mut script = self.script.lock().expect("script lock");
        script.respawn_calls += 1;
        let succeeds = script.respawn_plan.pop_front().unwrap_or(true);
        script.available = succeeds;
        if succeeds {
            Ok(())
        } else {
            Err(EngineError::Initialization("scripted respawn failure".to_owned()))
        }
    }

    fn is_available(&self) -> bool {
        self.script.lock().expect("script lock").available
    }

    fn shutdown(&mut self) {
        let mut script = self.script.lock().expect("script lock");
        script.shutdowns += 1;
        script.available = false;
    }
}
