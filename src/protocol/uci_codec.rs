//! UCI line codec.
//!
//! Pure string transforms between board values and the UCI text protocol.
//! The controller side encodes `position`/`go` requests and decodes the
//! engine's `bestmove` reply; the engine side (used by the bundled test
//! engine) does the reverse. No I/O happens here.

use thiserror::Error;

use crate::board::chess_move::{Move, MoveParseError};
use crate::board::move_apply::{apply, IllegalMoveError};
use crate::board::position::Position;

pub const UCI: &str = "uci";
pub const UCI_OK: &str = "uciok";
pub const IS_READY: &str = "isready";
pub const READY_OK: &str = "readyok";
pub const UCI_NEW_GAME: &str = "ucinewgame";
pub const STOP: &str = "stop";
pub const QUIT: &str = "quit";

pub const BEST_MOVE: &str = "bestmove";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unexpected reply '{0}', expected 'bestmove <move>'")]
    UnexpectedReply(String),
    #[error("reply '{0}' carries no move")]
    MissingMove(String),
    #[error("engine reported no legal move: '{0}'")]
    NoMove(String),
    #[error("undecodable move in reply '{line}': {source}")]
    BadMove {
        line: String,
        #[source]
        source: MoveParseError,
    },
    #[error("engine replied with an illegal move: {0}")]
    IllegalMove(IllegalMoveError),
    #[error("invalid position command '{line}': {reason}")]
    BadPosition { line: String, reason: String },
}

/// `position fen <FEN>`
pub fn encode_position(position: &Position) -> String {
    format!("position fen {}", position.to_fen())
}

/// `go movetime <ms>`
pub fn encode_go_command(time_budget_millis: u64) -> String {
    format!("go movetime {time_budget_millis}")
}

pub fn encode_set_option(name: &str, value: &str) -> String {
    format!("setoption name {name} value {value}")
}

/// Engine-side reply, `bestmove <move> [ponder <move>]`.
pub fn encode_best_move(mv: Move, ponder: Option<Move>) -> String {
    match ponder {
        Some(ponder) => format!("{BEST_MOVE} {mv} ponder {ponder}"),
        None => format!("{BEST_MOVE} {mv}"),
    }
}

/// Decode `bestmove <move> [ponder <move>]`, returning the best move.
///
/// Anything after the move token is ignored.
pub fn decode_best_move(line: &str) -> Result<Move, ProtocolError> {
    let mut tokens = line.split_whitespace();
    if tokens.next() != Some(BEST_MOVE) {
        return Err(ProtocolError::UnexpectedReply(line.to_owned()));
    }

    let text = tokens
        .next()
        .ok_or_else(|| ProtocolError::MissingMove(line.to_owned()))?;
    if text == "(none)" || text == "0000" {
        return Err(ProtocolError::NoMove(line.to_owned()));
    }

    Move::parse(text).map_err(|source| ProtocolError::BadMove {
        line: line.to_owned(),
        source,
    })
}

#[inline]
pub fn is_best_move_line(line: &str) -> bool {
    line.split_whitespace().next() == Some(BEST_MOVE)
}

/// Option name from an `option name <name...> type ...` advertisement.
pub fn parse_option_name(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace().skip_while(|tok| *tok != "name");
    tokens.next()?;
    let parts: Vec<&str> = tokens.take_while(|tok| *tok != "type").collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// `movetime` argument of a `go` command, if present and numeric.
pub fn decode_go_movetime(line: &str) -> Option<u64> {
    let mut tokens = line.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok == "movetime" {
            return tokens.next().and_then(|value| value.parse::<u64>().ok());
        }
    }
    None
}

/// Engine-side `position (startpos | fen <FEN>) [moves <m1> <m2> ...]`.
pub fn decode_position(line: &str) -> Result<Position, ProtocolError> {
    let bad = |reason: String| ProtocolError::BadPosition {
        line: line.to_owned(),
        reason,
    };

    let mut tokens = line.split_whitespace().peekable();
    if tokens.next() != Some("position") {
        return Err(bad("not a position command".to_owned()));
    }

    let mut position = match tokens.next() {
        Some("startpos") => Position::new_game(),
        Some("fen") => {
            let mut fen_parts = Vec::<&str>::new();
            while let Some(part) = tokens.next_if(|tok| *tok != "moves") {
                fen_parts.push(part);
            }
            if fen_parts.is_empty() {
                return Err(bad("missing FEN after 'position fen'".to_owned()));
            }
            Position::from_fen(&fen_parts.join(" ")).map_err(|e| bad(e.to_string()))?
        }
        Some(other) => return Err(bad(format!("unsupported position token '{other}'"))),
        None => return Err(bad("incomplete position command".to_owned())),
    };

    if tokens.next_if_eq(&"moves").is_some() {
        for text in tokens {
            let mv = Move::parse(text).map_err(|e| bad(e.to_string()))?;
            position = apply(&position, mv).map_err(|e| bad(e.to_string()))?;
        }
    }

    Ok(position)
}
