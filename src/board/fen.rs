//! Forsyth-Edwards Notation parsing and generation.
//!
//! The parser builds a fully populated `Position` (bitboards, rights, clocks
//! and occupancy caches) and rejects boards that do not carry exactly one king
//! per side, since no other component is prepared to handle them.

use thiserror::Error;

use crate::board::algebraic::{algebraic_to_square, square_to_algebraic};
use crate::board::chess_types::*;
use crate::board::position::Position;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid FEN: {0}")]
pub struct FenError(pub String);

impl From<String> for FenError {
    fn from(msg: String) -> Self {
        FenError(msg)
    }
}

impl From<&str> for FenError {
    fn from(msg: &str) -> Self {
        FenError(msg.to_owned())
    }
}

pub fn parse_fen(fen: &str) -> Result<Position, FenError> {
    let mut parts = fen.split_whitespace();

    let board_part = parts.next().ok_or("missing board layout")?;
    let side_part = parts.next().ok_or("missing side-to-move")?;
    let castling_part = parts.next().ok_or("missing castling rights")?;
    let en_passant_part = parts.next().ok_or("missing en-passant square")?;
    let halfmove_part = parts.next().ok_or("missing halfmove clock")?;
    let fullmove_part = parts.next().ok_or("missing fullmove number")?;

    if parts.next().is_some() {
        return Err("extra trailing fields".into());
    }

    let mut position = Position::new_empty();

    parse_board(board_part, &mut position)?;
    position.side_to_move = parse_side_to_move(side_part)?;
    position.castling_rights = parse_castling_rights(castling_part)?;
    position.en_passant_square = parse_en_passant_square(en_passant_part, position.side_to_move)?;
    position.halfmove_clock = halfmove_part
        .parse::<u16>()
        .map_err(|_| format!("invalid halfmove clock: {halfmove_part}"))?;
    position.fullmove_number = fullmove_part
        .parse::<u16>()
        .map_err(|_| format!("invalid fullmove number: {fullmove_part}"))?;

    position.recalc_occupancy();

    for color in Color::ALL {
        let kings = position.pieces(color, PieceKind::King).count_ones();
        if kings != 1 {
            return Err(format!("{color} must have exactly one king, found {kings}").into());
        }
    }

    Ok(position)
}

fn parse_board(board_part: &str, position: &mut Position) -> Result<(), FenError> {
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return Err("board layout must contain 8 ranks".into());
    }

    for (fen_rank_idx, rank_str) in ranks.iter().enumerate() {
        let board_rank = 7 - fen_rank_idx as u8;
        let mut file = 0u8;

        for ch in rank_str.chars() {
            if let Some(empty_count) = ch.to_digit(10) {
                if !(1..=8).contains(&empty_count) {
                    return Err(format!("invalid empty-square count '{ch}'").into());
                }
                file += empty_count as u8;
                if file > 8 {
                    return Err("board rank has too many files".into());
                }
                continue;
            }

            let kind = PieceKind::from_char(ch)
                .ok_or_else(|| format!("invalid piece character '{ch}' in board layout"))?;
            let color = if ch.is_ascii_uppercase() {
                Color::White
            } else {
                Color::Black
            };

            if file >= 8 {
                return Err("board rank has too many files".into());
            }

            position.put_piece(color, kind, make_square(file, board_rank));
            file += 1;
        }

        if file != 8 {
            return Err("board rank does not sum to 8 files".into());
        }
    }

    Ok(())
}

fn parse_side_to_move(side_part: &str) -> Result<Color, FenError> {
    match side_part {
        "w" => Ok(Color::White),
        "b" => Ok(Color::Black),
        _ => Err(format!("invalid side-to-move field: {side_part}").into()),
    }
}

fn parse_castling_rights(castling_part: &str) -> Result<CastlingRights, FenError> {
    if castling_part == "-" {
        return Ok(CastlingRights::NONE);
    }

    let mut rights = CastlingRights::NONE;
    for ch in castling_part.chars() {
        match ch {
            'K' => rights.insert(CastlingRights::WHITE_KINGSIDE),
            'Q' => rights.insert(CastlingRights::WHITE_QUEENSIDE),
            'k' => rights.insert(CastlingRights::BLACK_KINGSIDE),
            'q' => rights.insert(CastlingRights::BLACK_QUEENSIDE),
            _ => return Err(format!("invalid castling rights character: {ch}").into()),
        }
    }

    Ok(rights)
}

fn parse_en_passant_square(
    en_passant_part: &str,
    side_to_move: Color,
) -> Result<Option<Square>, FenError> {
    if en_passant_part == "-" {
        return Ok(None);
    }

    let square = algebraic_to_square(en_passant_part)?;
    // The square lies behind a pawn of the side that just moved.
    let (expected_rank, rank_name) = match side_to_move {
        Color::White => (5, 6),
        Color::Black => (2, 3),
    };
    if square_rank(square) != expected_rank {
        return Err(format!(
            "en-passant square must be on rank {rank_name} when {side_to_move} is to move: {en_passant_part}"
        )
        .into());
    }
    Ok(Some(square))
}

pub fn generate_fen(position: &Position) -> String {
    let side_to_move = match position.side_to_move {
        Color::White => "w",
        Color::Black => "b",
    };

    format!(
        "{} {} {} {} {} {}",
        generate_board_field(position),
        side_to_move,
        generate_castling_field(position.castling_rights),
        generate_en_passant_field(position.en_passant_square),
        position.halfmove_clock,
        position.fullmove_number
    )
}

fn generate_board_field(position: &Position) -> String {
    let mut out = String::with_capacity(72);

    for rank in (0..8u8).rev() {
        let mut empty_count = 0u8;

        for file in 0..8u8 {
            match position.piece_at(make_square(file, rank)) {
                Some((color, kind)) => {
                    if empty_count > 0 {
                        out.push(char::from(b'0' + empty_count));
                        empty_count = 0;
                    }
                    out.push(piece_to_fen_char(color, kind));
                }
                None => empty_count += 1,
            }
        }

        if empty_count > 0 {
            out.push(char::from(b'0' + empty_count));
        }
        if rank > 0 {
            out.push('/');
        }
    }

    out
}

fn piece_to_fen_char(color: Color, kind: PieceKind) -> char {
    match color {
        Color::White => kind.to_char().to_ascii_uppercase(),
        Color::Black => kind.to_char(),
    }
}

fn generate_castling_field(rights: CastlingRights) -> String {
    let mut out = String::new();

    if rights.has(CastlingRights::WHITE_KINGSIDE) {
        out.push('K');
    }
    if rights.has(CastlingRights::WHITE_QUEENSIDE) {
        out.push('Q');
    }
    if rights.has(CastlingRights::BLACK_KINGSIDE) {
        out.push('k');
    }
    if rights.has(CastlingRights::BLACK_QUEENSIDE) {
        out.push('q');
    }
    if out.is_empty() {
        out.push('-');
    }

    out
}

fn generate_en_passant_field(square: Option<Square>) -> String {
    square
        .and_then(|sq| square_to_algebraic(sq).ok())
        .unwrap_or_else(|| "-".to_owned())
}
