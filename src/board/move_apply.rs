use thiserror::Error;

use crate::board::chess_move::Move;
use crate::board::chess_types::*;
use crate::board::move_generator::generate_legal_moves;
use crate::board::position::Position;

/// A well-formed move that the rules do not allow in the given position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal move {mv} in position {fen}")]
pub struct IllegalMoveError {
    pub mv: Move,
    pub fen: String,
}

/// Play `mv` if it is legal, returning the successor position.
///
/// The input position is left untouched.
pub fn apply(position: &Position, mv: Move) -> Result<Position, IllegalMoveError> {
    generate_legal_moves(position)
        .into_iter()
        .find(|generated| generated.mv == mv)
        .map(|generated| generated.position_after)
        .ok_or_else(|| IllegalMoveError {
            mv,
            fen: position.to_fen(),
        })
}

/// Play a pseudo-legal move without checking king safety.
///
/// Castling, en passant and double pushes are recognised from the board:
/// a king moving two files castles, a pawn stepping diagonally onto the
/// en-passant target captures the pawn behind it. Returns `None` when the
/// origin square does not hold a piece of the side to move.
pub(crate) fn apply_unchecked(position: &Position, mv: Move) -> Option<Position> {
    let mover = position.side_to_move;
    let enemy = mover.opposite();
    let moved = position.piece_kind_at(mover, mv.from)?;

    let mut next = position.clone();

    next.pieces[mover.index()][moved.index()] &= !square_bit(mv.from);

    let mut captured = next.take_piece(mv.to).is_some();

    let is_en_passant = moved == PieceKind::Pawn
        && Some(mv.to) == position.en_passant_square
        && square_file(mv.from) != square_file(mv.to)
        && !captured;
    if is_en_passant {
        let victim = match mover {
            Color::White => mv.to - 8,
            Color::Black => mv.to + 8,
        };
        next.pieces[enemy.index()][PieceKind::Pawn.index()] &= !square_bit(victim);
        captured = true;
    }

    next.put_piece(mover, mv.promotion.unwrap_or(moved), mv.to);

    if moved == PieceKind::King && square_file(mv.from).abs_diff(square_file(mv.to)) == 2 {
        let rank = square_rank(mv.from);
        let (rook_from, rook_to) = if square_file(mv.to) == 6 {
            (make_square(7, rank), make_square(5, rank))
        } else {
            (make_square(0, rank), make_square(3, rank))
        };
        move_rook(&mut next, mover, rook_from, rook_to);
    }

    if moved == PieceKind::King {
        next.castling_rights.clear_color(mover);
    }
    next.castling_rights.clear_rook_square(mv.from);
    // Capturing a rook on its home square also removes the right.
    next.castling_rights.clear_rook_square(mv.to);

    next.en_passant_square =
        if moved == PieceKind::Pawn && square_rank(mv.from).abs_diff(square_rank(mv.to)) == 2 {
            Some((mv.from + mv.to) / 2)
        } else {
            None
        };

    if moved == PieceKind::Pawn || captured {
        next.halfmove_clock = 0;
    } else {
        next.halfmove_clock = next.halfmove_clock.saturating_add(1);
    }
    if mover == Color::Black {
        next.fullmove_number = next.fullmove_number.saturating_add(1);
    }

    next.side_to_move = enemy;
    next.recalc_occupancy();

    Some(next)
}

fn move_rook(position: &mut Position, color: Color, from: Square, to: Square) {
    position.pieces[color.index()][PieceKind::Rook.index()] &= !square_bit(from);
    position.pieces[color.index()][PieceKind::Rook.index()] |= square_bit(to);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(position: &Position, text: &str) -> Position {
        let mv = Move::parse(text).expect("move should parse");
        apply(position, mv).expect("move should be legal")
    }

    #[test]
    fn double_push_sets_en_passant_target_and_clocks() {
        let after = play(&Position::new_game(), "e2e4");
        assert_eq!(
            after.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        let after = play(&after, "g8f6");
        assert_eq!(after.en_passant_square(), None);
        assert_eq!(after.halfmove_clock(), 1);
        assert_eq!(after.fullmove_number(), 2);
    }

    #[test]
    fn apply_leaves_input_untouched() {
        let start = Position::new_game();
        let snapshot = start.clone();
        let _ = play(&start, "d2d4");
        assert_eq!(start, snapshot);
    }

    #[test]
    fn king_side_castle_moves_rook_and_drops_rights() {
        let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 3 10")
            .expect("FEN should parse");
        let after = play(&position, "e1g1");
        assert_eq!(after.to_fen(), "r3k2r/8/8/8/8/8/8/R4RK1 b kq - 4 10");
    }

    #[test]
    fn queen_side_castle_for_black() {
        let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 10")
            .expect("FEN should parse");
        let after = play(&position, "e8c8");
        assert_eq!(after.to_fen(), "2kr3r/8/8/8/8/8/8/R3K2R w KQ - 1 11");
    }

    #[test]
    fn capturing_rook_on_home_square_removes_opponent_right() {
        let position = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1")
            .expect("FEN should parse");
        let after = play(&position, "a1a8");
        assert_eq!(after.castling_rights(), CastlingRights::from_bits(
            CastlingRights::WHITE_KINGSIDE | CastlingRights::BLACK_KINGSIDE,
        ));
        assert_eq!(after.halfmove_clock(), 0);
    }

    #[test]
    fn piece_capture_resets_halfmove_clock() {
        let position = Position::from_fen("4k3/8/8/3r4/8/8/8/3RK3 w - - 57 40")
            .expect("FEN should parse");
        assert_eq!(play(&position, "d1d2").halfmove_clock(), 58);

        let after = play(&position, "d1d5");
        assert_eq!(after.halfmove_clock(), 0);
        assert_eq!(after.to_fen(), "4k3/8/8/3R4/8/8/8/4K3 b - - 0 40");
    }

    #[test]
    fn en_passant_removes_passed_pawn() {
        let position = Position::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2")
            .expect("FEN should parse");
        let after = play(&position, "e5d6");
        assert_eq!(after.to_fen(), "4k3/8/3P4/8/8/8/8/4K3 b - - 0 2");
    }

    #[test]
    fn promotion_replaces_pawn() {
        let position = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 5 40")
            .expect("FEN should parse");
        let after = play(&position, "a7a8n");
        assert_eq!(after.piece_at(56), Some((Color::White, PieceKind::Knight)));
        assert_eq!(after.pieces(Color::White, PieceKind::Pawn), 0);
        assert_eq!(after.halfmove_clock(), 0);
    }

    #[test]
    fn illegal_moves_are_rejected_with_context() {
        let start = Position::new_game();
        let err = apply(&start, Move::parse("e2e5").expect("parses")).expect_err("illegal");
        assert_eq!(err.fen, start.to_fen());
        assert_eq!(err.to_string(), format!("illegal move e2e5 in position {}", start.to_fen()));
        // Empty origin square.
        assert!(apply(&start, Move::parse("e4e5").expect("parses")).is_err());
        // Opponent piece.
        assert!(apply(&start, Move::parse("e7e5").expect("parses")).is_err());
        // Promotion suffix on a non-promoting move.
        assert!(apply(&start, Move::parse("e2e4q").expect("parses")).is_err());
    }
}
