//! Board position model.
//!
//! `Position` stores one bitboard per `(color, piece kind)` plus occupancy
//! caches, side to move, castling rights, en-passant target and the two move
//! clocks. It is a plain value: applying a move clones it, so a caller never
//! observes aliasing between the position before and after a move.

use std::fmt;

use crate::board::chess_types::*;
use crate::board::fen::{generate_fen, parse_fen, FenError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    // [color][piece_kind]
    pub(crate) pieces: [[u64; 6]; 2],

    pub(crate) occupancy_by_color: [u64; 2],
    pub(crate) occupancy_all: u64,

    pub(crate) side_to_move: Color,
    pub(crate) castling_rights: CastlingRights,
    pub(crate) en_passant_square: Option<Square>,

    pub(crate) halfmove_clock: u16,
    pub(crate) fullmove_number: u16,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            pieces: [[0; 6]; 2],
            occupancy_by_color: [0; 2],
            occupancy_all: 0,
            side_to_move: Color::White,
            castling_rights: CastlingRights::NONE,
            en_passant_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }
}

impl Position {
    /// Board with no pieces, white to move. Used as a building block by the FEN parser.
    #[inline]
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Standard initial position.
    pub fn new_game() -> Self {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut position = Self::new_empty();
        for (file, kind) in (0u8..).zip(BACK_RANK) {
            position.put_piece(Color::White, kind, make_square(file, 0));
            position.put_piece(Color::White, PieceKind::Pawn, make_square(file, 1));
            position.put_piece(Color::Black, PieceKind::Pawn, make_square(file, 6));
            position.put_piece(Color::Black, kind, make_square(file, 7));
        }
        position.castling_rights = CastlingRights::ALL;
        position.recalc_occupancy();
        position
    }

    #[inline]
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        parse_fen(fen)
    }

    #[inline]
    pub fn to_fen(&self) -> String {
        generate_fen(self)
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }

    #[inline]
    pub fn en_passant_square(&self) -> Option<Square> {
        self.en_passant_square
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    #[inline]
    pub fn pieces(&self, color: Color, kind: PieceKind) -> u64 {
        self.pieces[color.index()][kind.index()]
    }

    #[inline]
    pub fn occupancy(&self, color: Color) -> u64 {
        self.occupancy_by_color[color.index()]
    }

    #[inline]
    pub fn occupancy_all(&self) -> u64 {
        self.occupancy_all
    }

    pub fn piece_at(&self, square: Square) -> Option<(Color, PieceKind)> {
        let mask = square_bit(square);
        if self.occupancy_all & mask == 0 {
            return None;
        }
        for color in Color::ALL {
            if let Some(kind) = self.piece_kind_at(color, square) {
                return Some((color, kind));
            }
        }
        None
    }

    pub fn piece_kind_at(&self, color: Color, square: Square) -> Option<PieceKind> {
        let mask = square_bit(square);
        PieceKind::ALL
            .into_iter()
            .find(|kind| self.pieces[color.index()][kind.index()] & mask != 0)
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        let kings = self.pieces[color.index()][PieceKind::King.index()];
        if kings == 0 {
            None
        } else {
            Some(kings.trailing_zeros() as Square)
        }
    }

    pub(crate) fn put_piece(&mut self, color: Color, kind: PieceKind, square: Square) {
        self.pieces[color.index()][kind.index()] |= square_bit(square);
    }

    /// Remove whatever stands on `square` and return it.
    pub(crate) fn take_piece(&mut self, square: Square) -> Option<(Color, PieceKind)> {
        let found = self.piece_at(square)?;
        self.pieces[found.0.index()][found.1.index()] &= !square_bit(square);
        Some(found)
    }

    pub(crate) fn recalc_occupancy(&mut self) {
        for color in Color::ALL {
            self.occupancy_by_color[color.index()] = self.pieces[color.index()]
                .iter()
                .copied()
                .fold(0u64, |acc, bb| acc | bb);
        }
        self.occupancy_all = self.occupancy_by_color[Color::White.index()]
            | self.occupancy_by_color[Color::Black.index()];
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

#[cfg(test)]
mod tests {
    use super::Position;
    use crate::board::chess_rules::STARTING_POSITION_FEN;
    use crate::board::chess_types::{Color, PieceKind};

    #[test]
    fn new_game_matches_starting_fen() {
        let position = Position::new_game();
        assert_eq!(position.to_fen(), STARTING_POSITION_FEN);
        assert_eq!(
            Position::from_fen(STARTING_POSITION_FEN).expect("starting FEN should parse"),
            position
        );
        assert_eq!(position.occupancy_all().count_ones(), 32);
        assert_eq!(position.king_square(Color::White), Some(4));
        assert_eq!(position.king_square(Color::Black), Some(60));
    }

    #[test]
    fn piece_at_reports_color_and_kind() {
        let position = Position::new_game();
        assert_eq!(position.piece_at(3), Some((Color::White, PieceKind::Queen)));
        assert_eq!(position.piece_at(57), Some((Color::Black, PieceKind::Knight)));
        assert_eq!(position.piece_at(28), None);
    }

    #[test]
    fn take_piece_clears_square() {
        let mut position = Position::new_game();
        let taken = position.take_piece(12);
        position.recalc_occupancy();
        assert_eq!(taken, Some((Color::White, PieceKind::Pawn)));
        assert_eq!(position.piece_at(12), None);
        assert_eq!(position.occupancy_all().count_ones(), 31);
    }
}
