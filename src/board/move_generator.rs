//! Legal move generation.
//!
//! Pieces emit pseudo-legal moves first; each candidate is then played on a
//! copy of the position and discarded if it leaves the mover's king attacked.
//! That single filter covers pins, moving into check, evading check and the
//! en-passant discovered-check corner case. Castling additionally checks the
//! king's start and transit squares before the filter runs.

use crate::board::attacks::*;
use crate::board::chess_move::Move;
use crate::board::chess_types::*;
use crate::board::move_apply::apply_unchecked;
use crate::board::position::Position;

/// A legal move together with the position it produces.
#[derive(Debug, Clone)]
pub struct GeneratedMove {
    pub mv: Move,
    pub position_after: Position,
}

/// All legal moves for the side to move.
pub fn legal_moves(position: &Position) -> Vec<Move> {
    generate_legal_moves(position)
        .into_iter()
        .map(|generated| generated.mv)
        .collect()
}

/// Legal moves paired with their resulting positions.
pub fn generate_legal_moves(position: &Position) -> Vec<GeneratedMove> {
    let mut pseudo = Vec::<Move>::with_capacity(64);
    generate_pseudo_legal_moves(position, &mut pseudo);

    let mover = position.side_to_move();
    let mut legal = Vec::with_capacity(pseudo.len());
    for mv in pseudo {
        let Some(next) = apply_unchecked(position, mv) else {
            continue;
        };
        // Illegal if own king is in check after move.
        if is_king_in_check(&next, mover) {
            continue;
        }
        legal.push(GeneratedMove {
            mv,
            position_after: next,
        });
    }

    legal
}

#[inline]
pub fn has_legal_moves(position: &Position) -> bool {
    !generate_legal_moves(position).is_empty()
}

pub fn generate_pseudo_legal_moves(position: &Position, out: &mut Vec<Move>) {
    let side = position.side_to_move();
    // Capturing a king is never a move; such positions are already illegal.
    let targets = !position.occupancy(side) & !position.pieces(side.opposite(), PieceKind::King);

    generate_pawn_moves(position, targets, out);
    for kind in [
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ] {
        let mut pieces = position.pieces(side, kind);
        while pieces != 0 {
            let from = pieces.trailing_zeros() as Square;
            let mut attacks = piece_attacks(kind, side, from, position.occupancy_all()) & targets;
            while attacks != 0 {
                let to = attacks.trailing_zeros() as Square;
                out.push(Move::new(from, to));
                attacks &= attacks - 1;
            }
            pieces &= pieces - 1;
        }
    }
    generate_castling_moves(position, out);
}

fn piece_attacks(kind: PieceKind, color: Color, square: Square, occupancy: u64) -> u64 {
    match kind {
        PieceKind::Pawn => pawn_attacks(color, square),
        PieceKind::Knight => knight_attacks(square),
        PieceKind::Bishop => bishop_attacks(square, occupancy),
        PieceKind::Rook => rook_attacks(square, occupancy),
        PieceKind::Queen => queen_attacks(square, occupancy),
        PieceKind::King => king_attacks(square),
    }
}

fn generate_pawn_moves(position: &Position, targets: u64, out: &mut Vec<Move>) {
    let side = position.side_to_move();
    let empty = !position.occupancy_all();
    let enemy_occ = position.occupancy(side.opposite()) & targets;
    let promotion_rank = side.promotion_rank();
    let start_rank = match side {
        Color::White => 1,
        Color::Black => 6,
    };

    let en_passant_target = capturable_en_passant_target(position);

    let mut pawns = position.pieces(side, PieceKind::Pawn);
    while pawns != 0 {
        let from = pawns.trailing_zeros() as Square;
        pawns &= pawns - 1;

        let one_step = match side {
            Color::White => from.checked_add(8).filter(|sq| *sq < 64),
            Color::Black => from.checked_sub(8),
        };

        if let Some(to) = one_step {
            if square_bit(to) & empty != 0 {
                push_pawn_move(from, to, promotion_rank, out);

                if square_rank(from) == start_rank {
                    let two_step = match side {
                        Color::White => to + 8,
                        Color::Black => to - 8,
                    };
                    if square_bit(two_step) & empty != 0 {
                        out.push(Move::new(from, two_step));
                    }
                }
            }
        }

        let attacks = pawn_attacks(side, from);
        let mut captures = attacks & enemy_occ;
        while captures != 0 {
            let to = captures.trailing_zeros() as Square;
            push_pawn_move(from, to, promotion_rank, out);
            captures &= captures - 1;
        }

        if let Some(ep) = en_passant_target {
            if attacks & square_bit(ep) != 0 {
                out.push(Move::new(from, ep));
            }
        }
    }
}

/// The en-passant square, if a pawn that just double-stepped stands behind it.
fn capturable_en_passant_target(position: &Position) -> Option<Square> {
    let ep = position.en_passant_square()?;
    let side = position.side_to_move();
    let (expected_rank, victim, origin) = match side {
        Color::White => (5, ep.checked_sub(8)?, ep.checked_add(8)?),
        Color::Black => (2, ep.checked_add(8)?, ep.checked_sub(8)?),
    };
    let empty = !position.occupancy_all();
    let victim_is_pawn = position.pieces(side.opposite(), PieceKind::Pawn) & square_bit(victim) != 0;
    (square_rank(ep) == expected_rank
        && victim_is_pawn
        && square_bit(ep) & empty != 0
        && square_bit(origin) & empty != 0)
        .then_some(ep)
}

fn push_pawn_move(from: Square, to: Square, promotion_rank: u8, out: &mut Vec<Move>) {
    if square_rank(to) == promotion_rank {
        for promotion in PieceKind::PROMOTIONS {
            out.push(Move::with_promotion(from, to, promotion));
        }
    } else {
        out.push(Move::new(from, to));
    }
}

fn generate_castling_moves(position: &Position, out: &mut Vec<Move>) {
    let side = position.side_to_move();
    let enemy = side.opposite();
    let rights = position.castling_rights();
    let back_rank = match side {
        Color::White => 0,
        Color::Black => 7,
    };
    let king_from = make_square(4, back_rank);

    if position.pieces(side, PieceKind::King) & square_bit(king_from) == 0 {
        return;
    }
    // Cannot castle out of check.
    if is_square_attacked(position, king_from, enemy) {
        return;
    }

    let rooks = position.pieces(side, PieceKind::Rook);
    let occupied = position.occupancy_all();

    if rights.kingside(side) && rooks & square_bit(make_square(7, back_rank)) != 0 {
        let f = make_square(5, back_rank);
        let g = make_square(6, back_rank);
        if occupied & (square_bit(f) | square_bit(g)) == 0
            && !is_square_attacked(position, f, enemy)
            && !is_square_attacked(position, g, enemy)
        {
            out.push(Move::new(king_from, g));
        }
    }

    if rights.queenside(side) && rooks & square_bit(make_square(0, back_rank)) != 0 {
        let b = make_square(1, back_rank);
        let c = make_square(2, back_rank);
        let d = make_square(3, back_rank);
        if occupied & (square_bit(b) | square_bit(c) | square_bit(d)) == 0
            && !is_square_attacked(position, d, enemy)
            && !is_square_attacked(position, c, enemy)
        {
            out.push(Move::new(king_from, c));
        }
    }
}

pub fn is_square_attacked(position: &Position, square: Square, attacker: Color) -> bool {
    let occupancy = position.occupancy_all();

    // A pawn of `attacker` hits `square` iff a pawn of the other color on
    // `square` would hit the pawn's square.
    if pawn_attacks(attacker.opposite(), square) & position.pieces(attacker, PieceKind::Pawn) != 0 {
        return true;
    }
    if knight_attacks(square) & position.pieces(attacker, PieceKind::Knight) != 0 {
        return true;
    }
    if king_attacks(square) & position.pieces(attacker, PieceKind::King) != 0 {
        return true;
    }

    let queens = position.pieces(attacker, PieceKind::Queen);
    let bishops_queens = position.pieces(attacker, PieceKind::Bishop) | queens;
    if bishop_attacks(square, occupancy) & bishops_queens != 0 {
        return true;
    }
    let rooks_queens = position.pieces(attacker, PieceKind::Rook) | queens;
    rook_attacks(square, occupancy) & rooks_queens != 0
}

#[inline]
pub fn is_king_in_check(position: &Position, color: Color) -> bool {
    let Some(king_sq) = position.king_square(color) else {
        return false;
    };
    is_square_attacked(position, king_sq, color.opposite())
}
