//! Engine process supervision.
//!
//! `EngineSupervisor` owns at most one live engine process and tracks its
//! protocol state:
//!
//! ```text
//! Uninitialized -> Handshaking -> Ready <-> Busy
//!                       |                    |
//!                       +---> Terminated <---+
//! ```
//!
//! Spawn and handshake failures surface as [`EngineError::Initialization`].
//! A crash, hang or malformed reply during a search terminates the process
//! (killed and reaped) and leaves the supervisor in `Terminated` until the
//! next [`respawn`](EngineSupervisor::respawn). Retrying is the caller's job.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::board::chess_move::Move;
use crate::board::position::Position;
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::process::EngineProcess;
use crate::protocol::uci_codec::*;

/// Source of opponent moves as seen by the match session.
pub trait OpponentEngine {
    /// Ask for a move in `position`, bounded by `think_time`.
    fn request_move(&mut self, position: &Position, think_time: Duration)
        -> Result<Move, EngineError>;

    /// Replace any current engine instance with a fresh, handshaken one.
    fn respawn(&mut self) -> Result<(), EngineError>;

    fn is_available(&self) -> bool;

    /// Terminate the engine. Calling it again is a no-op.
    fn shutdown(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleState {
    Uninitialized,
    Handshaking,
    Ready,
    Busy,
    Terminated,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleState::Uninitialized => "uninitialized",
            HandleState::Handshaking => "handshaking",
            HandleState::Ready => "ready",
            HandleState::Busy => "busy",
            HandleState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

pub struct EngineSupervisor {
    config: EngineConfig,
    process: Option<EngineProcess>,
    state: HandleState,
    option_names: HashSet<String>,
    spawned_once: bool,
    restarts: u32,
}

impl EngineSupervisor {
    /// Supervisor with no process yet; call [`respawn`](Self::respawn) to start one.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            process: None,
            state: HandleState::Uninitialized,
            option_names: HashSet::new(),
            spawned_once: false,
            restarts: 0,
        }
    }

    /// Create a supervisor and bring its first engine to `Ready`.
    pub fn spawn(config: EngineConfig) -> Result<Self, EngineError> {
        let mut supervisor = Self::new(config);
        supervisor.respawn()?;
        Ok(supervisor)
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> HandleState {
        self.state
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        self.state == HandleState::Ready
    }

    /// Successful spawns after the first one.
    #[inline]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Options the current engine advertised during its handshake.
    pub fn advertised_options(&self) -> &HashSet<String> {
        &self.option_names
    }

    pub fn respawn(&mut self) -> Result<(), EngineError> {
        self.terminate_process();
        self.state = HandleState::Handshaking;
        self.option_names.clear();

        match self.start_process() {
            Ok(process) => {
                info!("{}: engine ready", process.label());
                self.process = Some(process);
                self.state = HandleState::Ready;
                if self.spawned_once {
                    self.restarts += 1;
                }
                self.spawned_once = true;
                Ok(())
            }
            Err(err) => {
                warn!("{}: {err}", self.config.label());
                self.state = HandleState::Terminated;
                Err(err)
            }
        }
    }

    fn start_process(&mut self) -> Result<EngineProcess, EngineError> {
        let label = self.config.label();

        if let Some(weights) = &self.config.weights {
            File::open(weights).map_err(|err| {
                EngineError::Initialization(format!(
                    "weights file {} is not readable: {err}",
                    weights.display()
                ))
            })?;
        }

        info!("{label}: spawning {}", self.config.program.display());
        let mut process = EngineProcess::spawn(
            &self.config.program,
            &self.config.command_args(),
            label,
            self.config.quit_timeout,
        )
        .map_err(|err| {
            EngineError::Initialization(format!(
                "failed to spawn {}: {err}",
                self.config.program.display()
            ))
        })?;

        // A failed handshake drops `process`, which kills and reaps it.
        self.handshake(&mut process)?;
        Ok(process)
    }

    fn handshake(&mut self, process: &mut EngineProcess) -> Result<(), EngineError> {
        let deadline = Instant::now() + self.config.handshake_timeout;

        send(process, UCI).map_err(EngineError::Initialization)?;
        loop {
            let line = process
                .recv_line_until(deadline)
                .map_err(|err| handshake_failure(process, UCI_OK, err))?;
            if line.starts_with("option ") {
                if let Some(name) = parse_option_name(&line) {
                    self.option_names.insert(name);
                }
            } else if line == UCI_OK {
                break;
            }
        }

        for (name, value) in &self.config.uci_options {
            if self.option_names.contains(name) {
                send(process, &encode_set_option(name, value)).map_err(EngineError::Initialization)?;
            } else {
                warn!("{}: engine does not advertise option '{name}', skipping", process.label());
            }
        }

        send(process, UCI_NEW_GAME).map_err(EngineError::Initialization)?;
        send(process, IS_READY).map_err(EngineError::Initialization)?;
        wait_for_ready(process, deadline).map_err(|err| handshake_failure(process, READY_OK, err))
    }

    /// Start a new game on the current engine without restarting it.
    pub fn new_game(&mut self) -> Result<(), EngineError> {
        self.ensure_ready()?;
        let timeout = self.config.handshake_timeout;
        let result = match self.process.as_mut() {
            Some(process) => start_new_game(process, timeout),
            None => Err(EngineError::Terminated("no engine process".to_owned())),
        };
        if let Err(err) = &result {
            warn!("{}: new game failed: {err}", self.config.label());
            self.terminate_process();
        }
        result
    }

    pub fn request_move(
        &mut self,
        position: &Position,
        think_time: Duration,
    ) -> Result<Move, EngineError> {
        self.ensure_ready()?;
        self.state = HandleState::Busy;

        let result = self.search(position, think_time);
        match &result {
            Ok(mv) => {
                debug!("{}: bestmove {mv}", self.config.label());
                self.state = HandleState::Ready;
            }
            Err(err) => {
                warn!("{}: move request failed: {err}", self.config.label());
                self.terminate_process();
            }
        }
        result
    }

    fn search(&mut self, position: &Position, think_time: Duration) -> Result<Move, EngineError> {
        let reply_grace = self.config.reply_grace;
        let stop_grace = self.config.stop_grace;
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| EngineError::Terminated("no engine process".to_owned()))?;

        let millis = u64::try_from(think_time.as_millis()).unwrap_or(u64::MAX);
        send(process, &encode_position(position)).map_err(EngineError::Terminated)?;
        send(process, &encode_go_command(millis)).map_err(EngineError::Terminated)?;

        let mut deadline = Instant::now() + think_time + reply_grace;
        let mut stop_sent = false;

        loop {
            match process.recv_line_until(deadline) {
                Ok(line) => {
                    if is_best_move_line(&line) {
                        return Ok(decode_best_move(&line)?);
                    }
                    // `info` and anything else unsolicited.
                }
                Err(RecvTimeoutError::Timeout) if !stop_sent => {
                    warn!("{}: no reply within {think_time:?}, sending stop", process.label());
                    stop_sent = true;
                    deadline = Instant::now() + stop_grace;
                    if send(process, STOP).is_err() {
                        return Err(EngineError::Timeout(think_time));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(EngineError::Timeout(think_time));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let status = process
                        .exit_status()
                        .unwrap_or_else(|| "output closed".to_owned());
                    return Err(EngineError::Terminated(format!(
                        "engine exited during search ({status})"
                    )));
                }
            }
        }
    }

    fn ensure_ready(&self) -> Result<(), EngineError> {
        if self.state == HandleState::Ready && self.process.is_some() {
            Ok(())
        } else {
            Err(EngineError::Terminated(format!(
                "engine is not ready (state: {})",
                self.state
            )))
        }
    }

    /// Kill and reap the current process if any. The handle becomes `Terminated`
    /// unless no process was ever started.
    fn terminate_process(&mut self) {
        if let Some(mut process) = self.process.take() {
            process.kill();
            self.state = HandleState::Terminated;
        }
    }

    /// Send `quit`, wait briefly, then kill. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(mut process) = self.process.take() {
            info!("{}: shutting down engine", process.label());
            process.shutdown();
        }
        if self.state != HandleState::Uninitialized {
            self.state = HandleState::Terminated;
        }
    }
}

impl OpponentEngine for EngineSupervisor {
    fn request_move(
        &mut self,
        position: &Position,
        think_time: Duration,
    ) -> Result<Move, EngineError> {
        EngineSupervisor::request_move(self, position, think_time)
    }

    fn respawn(&mut self) -> Result<(), EngineError> {
        EngineSupervisor::respawn(self)
    }

    fn is_available(&self) -> bool {
        EngineSupervisor::is_available(self)
    }

    fn shutdown(&mut self) {
        EngineSupervisor::shutdown(self)
    }
}

impl Drop for EngineSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn send(process: &mut EngineProcess, line: &str) -> Result<(), String> {
    process
        .write_line(line)
        .map_err(|err| format!("failed to write '{line}': {err}"))
}

fn start_new_game(process: &mut EngineProcess, timeout: Duration) -> Result<(), EngineError> {
    let deadline = Instant::now() + timeout;
    send(process, UCI_NEW_GAME).map_err(EngineError::Terminated)?;
    send(process, IS_READY).map_err(EngineError::Terminated)?;
    wait_for_ready(process, deadline).map_err(|err| match err {
        RecvTimeoutError::Timeout => EngineError::Timeout(timeout),
        RecvTimeoutError::Disconnected => EngineError::Terminated("engine exited".to_owned()),
    })
}

fn wait_for_ready(process: &EngineProcess, deadline: Instant) -> Result<(), RecvTimeoutError> {
    loop {
        if process.recv_line_until(deadline)? == READY_OK {
            return Ok(());
        }
    }
}

fn handshake_failure(process: &mut EngineProcess, expected: &str, err: RecvTimeoutError) -> EngineError {
    let reason = match err {
        RecvTimeoutError::Timeout => format!("timed out waiting for '{expected}'"),
        RecvTimeoutError::Disconnected => {
            let status = process
                .exit_status()
                .unwrap_or_else(|| "output closed".to_owned());
            format!("engine exited before '{expected}' ({status})")
        }
    };
    EngineError::Initialization(reason)
}
