//! Minimal UCI engine that plays uniformly random legal moves.
//!
//! Stands in for the external engine during tests and demos. It takes a
//! `--weights=<path>` argument like the real engine (the file only has to be
//! readable) and can be told to misbehave on `go` or during the handshake.
//!
//! Run with:
//! `cargo run --bin random-uci-engine -- --weights=/path/to/any/file`

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use rand::prelude::IndexedRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;

use engine_match::board::move_generator::legal_moves;
use engine_match::board::position::Position;
use engine_match::protocol::uci_codec::*;

const ENGINE_NAME: &str = "Random UCI Engine";
const ENGINE_AUTHOR: &str = "engine_match";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Weights file; must exist and be readable
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Seed for move selection (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Exit with status 3 when asked to search
    #[arg(long)]
    exit_on_go: bool,

    /// Never answer `go` and ignore `stop`
    #[arg(long)]
    hang_on_go: bool,

    /// Answer `go` with a malformed bestmove
    #[arg(long)]
    garbage_on_go: bool,

    /// Exit with status 2 right after receiving `uci`
    #[arg(long)]
    exit_during_handshake: bool,

    /// Enable debug logging
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
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if let Some(weights) = &args.weights {
        std::fs::File::open(weights)
            .with_context(|| format!("cannot read weights file {}", weights.display()))?;
        info!("loaded weights from {}", weights.display());
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut position = Position::new_game();

    for line in stdin.lock().lines() {
        let line = line?;
        let command = line.trim();
        debug!("<< {command}");

        match command.split_whitespace().next().unwrap_or_default() {
            "uci" => {
                if args.exit_during_handshake {
                    process::exit(2);
                }
                writeln!(stdout, "id name {ENGINE_NAME}")?;
                writeln!(stdout, "id author {ENGINE_AUTHOR}")?;
                writeln!(stdout, "option name Threads type spin default 1 min 1 max 128")?;
                writeln!(stdout, "option name Move Overhead type spin default 10 min 0 max 5000")?;
                writeln!(stdout, "{UCI_OK}")?;
            }
            "isready" => writeln!(stdout, "{READY_OK}")?,
            "ucinewgame" => position = Position::new_game(),
            "setoption" => debug!("ignoring {command}"),
            "position" => match decode_position(command) {
                Ok(decoded) => position = decoded,
                Err(err) => warn!("{err}"),
            },
            "go" => {
                if args.exit_on_go {
                    process::exit(3);
                }
                if args.hang_on_go {
                    continue;
                }
                if args.garbage_on_go {
                    writeln!(stdout, "info string this is not a move")?;
                    writeln!(stdout, "{BEST_MOVE} zz99")?;
                } else {
                    if let Some(movetime) = decode_go_movetime(command) {
                        debug!("movetime {movetime} ms");
                    }
                    let moves = legal_moves(&position);
                    writeln!(stdout, "info string legal_moves {}", moves.len())?;
                    match moves.choose(&mut rng) {
                        Some(mv) => writeln!(stdout, "{}", encode_best_move(*mv, None))?,
                        None => writeln!(stdout, "{BEST_MOVE} (none)")?,
                    }
                }
            }
            "stop" => {}
            "quit" => break,
            "" => {}
            other => warn!("unknown command '{other}'"),
        }
        stdout.flush()?;
    }

    Ok(())
}
