//! Position history for repetition detection.

use crate::board::chess_types::{CastlingRights, Color, PieceKind, Square};
use crate::board::move_generator::legal_moves;
use crate::board::position::Position;

/// Everything that makes two positions "the same" for repetition purposes.
///
/// Move clocks are excluded. The en-passant square only counts when a capture
/// onto it is actually legal, so the target left behind by every double push
/// does not make otherwise identical positions differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepetitionKey {
    pieces: [[u64; 6]; 2],
    side_to_move: Color,
    castling_rights: CastlingRights,
    en_passant_square: Option<Square>,
}

impl RepetitionKey {
    pub fn of(position: &Position) -> Self {
        Self {
            pieces: position.pieces,
            side_to_move: position.side_to_move(),
            castling_rights: position.castling_rights(),
            en_passant_square: capturable_en_passant_square(position),
        }
    }
}

fn capturable_en_passant_square(position: &Position) -> Option<Square> {
    let ep = position.en_passant_square()?;
    let side = position.side_to_move();
    legal_moves(position)
        .into_iter()
        .any(|mv| mv.to == ep && position.piece_kind_at(side, mv.from) == Some(PieceKind::Pawn))
        .then_some(ep)
}

/// Repetition keys of every position reached in the current game, oldest first.
///
/// The session pushes the initial position and each position after a move, so
/// the last entry is always the current position.
#[derive(Debug, Clone, Default)]
pub struct PositionHistory {
    keys: Vec<RepetitionKey>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History seeded with a starting position.
    pub fn starting_from(position: &Position) -> Self {
        let mut history = Self::new();
        history.push(position);
        history
    }

    pub fn push(&mut self, position: &Position) {
        self.keys.push(RepetitionKey::of(position));
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn occurrences(&self, key: &RepetitionKey) -> usize {
        self.keys.iter().filter(|k| *k == key).count()
    }

    /// How often `position` appears, counting the entry for itself if present.
    pub fn repetitions_of(&self, position: &Position) -> usize {
        self.occurrences(&RepetitionKey::of(position))
    }
}
