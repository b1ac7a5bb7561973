//! PGN export of a finished or in-progress match.
//!
//! Movetext uses coordinate notation (`1. e2e4 e7e5`), which PGN readers
//! that accept long algebraic input can replay.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};

use crate::board::chess_move::Move;
use crate::board::game_rules::GameResult;

pub const EVENT_NAME: &str = "Engine Match";

/// `YYYY.MM.DD`, the PGN date format.
pub fn pgn_date(date: NaiveDate) -> String {
    date.format("%Y.%m.%d").to_string()
}

/// Seven-tag roster for a game played today.
pub fn default_headers(white: &str, black: &str, result: GameResult) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::<String, String>::new();
    headers.insert("Event".to_owned(), EVENT_NAME.to_owned());
    headers.insert("Site".to_owned(), "Local".to_owned());
    headers.insert("Date".to_owned(), pgn_date(Local::now().date_naive()));
    headers.insert("Round".to_owned(), "-".to_owned());
    headers.insert("White".to_owned(), white.to_owned());
    headers.insert("Black".to_owned(), black.to_owned());
    headers.insert("Result".to_owned(), result.score().to_owned());
    if result.is_terminal() {
        headers.insert("Termination".to_owned(), result.to_string());
    }
    headers
}

pub fn write_pgn(moves: &[Move], result: GameResult, white: &str, black: &str) -> String {
    write_pgn_with_headers(moves, result, &default_headers(white, black, result))
}

pub fn write_pgn_with_headers(
    moves: &[Move],
    result: GameResult,
    headers: &BTreeMap<String, String>,
) -> String {
    let mut out = String::new();

    for (key, value) in headers {
        out.push_str(&format!("[{key} \"{}\"]\n", escape_pgn_value(value)));
    }
    out.push('\n');

    let mut movetext = Vec::<String>::with_capacity(moves.len() + 1);
    for (ply, mv) in moves.iter().enumerate() {
        if ply % 2 == 0 {
            movetext.push(format!("{}. {mv}", ply / 2 + 1));
        } else {
            movetext.push(mv.to_string());
        }
    }
    movetext.push(result.score().to_owned());

    out.push_str(&movetext.join(" "));
    out.push('\n');
    out
}

fn escape_pgn_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::chess_types::Color;

    fn moves(texts: &[&str]) -> Vec<Move> {
        texts
            .iter()
            .map(|t| Move::parse(t).expect("move should parse"))
            .collect()
    }

    #[test]
    fn formats_pgn_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).expect("valid date");
        assert_eq!(pgn_date(date), "2024.03.07");
    }

    #[test]
    fn writes_numbered_movetext_and_result() {
        let played = moves(&["f2f3", "e7e5", "g2g4", "d8h4"]);
        let result = GameResult::Checkmate {
            winner: Color::Black,
        };
        let pgn = write_pgn(&played, result, "Player", "lc0");
        assert!(pgn.contains("[Result \"0-1\"]"));
        assert!(pgn.contains("[White \"Player\"]"));
        assert!(pgn.contains("[Termination \"checkmate\"]"));
        assert!(pgn.ends_with("1. f2f3 e7e5 2. g2g4 d8h4 0-1\n"));
    }

    #[test]
    fn ongoing_game_uses_asterisk_and_escapes_headers() {
        let mut headers = BTreeMap::new();
        headers.insert("Event".to_owned(), "Say \"hi\"".to_owned());
        let pgn = write_pgn_with_headers(&moves(&["e2e4"]), GameResult::Ongoing, &headers);
        assert_eq!(pgn, "[Event \"Say \\\"hi\\\"\"]\n\n1. e2e4 *\n");
    }
}
