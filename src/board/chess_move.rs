//! Move value type and its coordinate-notation text form (`e2e4`, `e7e8q`).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::board::algebraic::{algebraic_to_square, square_to_algebraic};
use crate::board::chess_types::{PieceKind, Square};

/// Move text that does not follow coordinate notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid move format '{text}': {reason}")]
pub struct MoveParseError {
    pub text: String,
    pub reason: String,
}

impl MoveParseError {
    fn new(text: &str, reason: impl Into<String>) -> Self {
        Self {
            text: text.to_owned(),
            reason: reason.into(),
        }
    }
}

/// A move as a plain value: origin, destination, optional promotion piece.
///
/// Castling is expressed as the king's two-square move and en passant as the
/// pawn's diagonal step; the position supplies the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceKind>,
}

impl Move {
    #[inline]
    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    #[inline]
    pub const fn with_promotion(from: Square, to: Square, promotion: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }

    /// Parse coordinate notation.
    pub fn parse(text: &str) -> Result<Self, MoveParseError> {
        let text = text.trim();
        if !text.is_ascii() {
            return Err(MoveParseError::new(text, "non-ASCII characters"));
        }
        if text.len() != 4 && text.len() != 5 {
            return Err(MoveParseError::new(text, "expected 4 or 5 characters"));
        }

        let from = algebraic_to_square(&text[0..2]).map_err(|e| MoveParseError::new(text, e))?;
        let to = algebraic_to_square(&text[2..4]).map_err(|e| MoveParseError::new(text, e))?;
        if from == to {
            return Err(MoveParseError::new(text, "origin and destination are the same"));
        }

        let promotion = match text[4..].chars().next() {
            None => None,
            Some(ch) => match PieceKind::from_char(ch) {
                Some(kind) if PieceKind::PROMOTIONS.contains(&kind) => Some(kind),
                _ => {
                    return Err(MoveParseError::new(
                        text,
                        format!("invalid promotion piece '{ch}'"),
                    ))
                }
            },
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::parse(s)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let from = square_to_algebraic(self.from).map_err(|_| fmt::Error)?;
        let to = square_to_algebraic(self.to).map_err(|_| fmt::Error)?;
        write!(f, "{from}{to}")?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion.to_char())?;
        }
        Ok(())
    }
}
