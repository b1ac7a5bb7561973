//! Line-oriented front end: play a game against an external UCI engine.
//!
//! Each stdin line is a command (`e2e4`, `reset`, `fen`, `board`, `pgn`,
//! `quit`); each answer goes to stdout. Logs go to stderr.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use engine_match::board::render::render_position;
use engine_match::engine::config::{EngineConfig, DEFAULT_ENGINE_PROGRAM};
use engine_match::engine::supervisor::EngineSupervisor;
use engine_match::session::orchestrator::{MatchConfig, MatchOrchestrator, MatchOutcome};
use engine_match::session::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Engine executable speaking UCI
    #[arg(long, default_value = DEFAULT_ENGINE_PROGRAM)]
    engine: PathBuf,

    /// Weights file passed to the engine as --weights=<path>
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Think time per engine move, in milliseconds
    #[arg(long, default_value_t = 100)]
    think_ms: u64,

    /// Attempts per opponent move before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Enable debug logging (protocol traffic included)
    #[arg(short, long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .target(env_logger::Target::Stderr)
    .init();

    if let Err(e) = run(args) {
        log::error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut engine_config = EngineConfig::new(&args.engine);
    if let Some(weights) = &args.weights {
        engine_config = engine_config.with_weights(weights);
    }
    let engine_name = engine_config.label();

    let match_config = MatchConfig {
        think_time: Duration::from_millis(args.think_ms),
        retry: RetryPolicy::new(args.max_attempts),
    };
    let orchestrator =
        MatchOrchestrator::new(Box::new(EngineSupervisor::new(engine_config)), match_config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    match orchestrator.initialize() {
        Ok(()) => info!("playing against {engine_name}"),
        Err(err) => {
            // Keep serving position queries; moves will retry the spawn.
            warn!("{err}");
            writeln!(stdout, "error {}: {err}", err.code())?;
        }
    }
    writeln!(stdout, "ready {}", orchestrator.current_fen())?;
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        match command {
            "quit" => break,
            "reset" => match orchestrator.reset() {
                Ok(()) => writeln!(stdout, "ok reset")?,
                Err(err) => writeln!(stdout, "error {}: {err}", err.code())?,
            },
            "fen" => writeln!(stdout, "{}", orchestrator.current_fen())?,
            "board" => writeln!(stdout, "{}", render_position(&orchestrator.current_position()))?,
            "pgn" => write!(stdout, "{}", orchestrator.export_pgn("Player", &engine_name))?,
            text => match orchestrator.submit_player_move(text) {
                Ok(outcome) => writeln!(stdout, "{}", format_outcome(&outcome))?,
                Err(err) => writeln!(stdout, "error {}: {err}", err.code())?,
            },
        }
        stdout.flush()?;
    }

    orchestrator.shutdown();
    Ok(())
}

fn format_outcome(outcome: &MatchOutcome) -> String {
    let opponent = outcome
        .opponent_move
        .map(|mv| mv.to_string())
        .unwrap_or_else(|| "-".to_owned());
    let mut line = format!(
        "ok move {} reply {opponent} result {} terminal {}",
        outcome.player_move, outcome.result, outcome.terminal
    );
    if let Some(winner) = outcome.winner {
        line.push_str(&format!(" winner {winner}"));
    }
    if outcome.engine_restarts > 0 {
        line.push_str(&format!(" restarts {}", outcome.engine_restarts));
    }
    line.push_str(&format!(" fen {}", outcome.fen));
    line
}
