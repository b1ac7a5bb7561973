//! Move-path enumeration used to validate move generation against
//! published node counts.

use crate::board::chess_move::Move;
use crate::board::move_generator::generate_legal_moves;
use crate::board::position::Position;

/// Number of leaf positions reachable in exactly `depth` plies.
pub fn perft(position: &Position, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = generate_legal_moves(position);
    if depth == 1 {
        return moves.len() as u64;
    }

    moves
        .iter()
        .map(|generated| perft(&generated.position_after, depth - 1))
        .sum()
}

/// Per-root-move breakdown of [`perft`], sorted by move text.
pub fn perft_divide(position: &Position, depth: u8) -> Vec<(Move, u64)> {
    let mut split: Vec<(Move, u64)> = generate_legal_moves(position)
        .into_iter()
        .map(|generated| {
            let nodes = perft(&generated.position_after, depth.saturating_sub(1));
            (generated.mv, nodes)
        })
        .collect();
    split.sort_by_key(|(mv, _)| mv.to_string());
    split
}
