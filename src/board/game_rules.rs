//! Check, mate, stalemate and draw classification.
//!
//! All queries are pure functions of the position; repetition additionally
//! takes the game's history as an explicit argument.

use std::fmt;

use crate::board::chess_rules::{FIFTY_MOVE_HALFMOVES, REPETITION_LIMIT};
use crate::board::chess_types::*;
use crate::board::history::PositionHistory;
use crate::board::move_generator::{has_legal_moves, is_king_in_check};
use crate::board::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawReason {
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

/// Classification of a position at the end of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameResult {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl GameResult {
    pub fn is_terminal(self) -> bool {
        self != GameResult::Ongoing
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameResult::Checkmate { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn is_draw(self) -> bool {
        matches!(
            self,
            GameResult::Stalemate
                | GameResult::InsufficientMaterial
                | GameResult::FiftyMoveRule
                | GameResult::ThreefoldRepetition
        )
    }

    /// PGN result token.
    pub fn score(self) -> &'static str {
        match self {
            GameResult::Checkmate {
                winner: Color::White,
            } => "1-0",
            GameResult::Checkmate {
                winner: Color::Black,
            } => "0-1",
            GameResult::Ongoing => "*",
            _ => "1/2-1/2",
        }
    }
}

impl From<DrawReason> for GameResult {
    fn from(reason: DrawReason) -> Self {
        match reason {
            DrawReason::InsufficientMaterial => GameResult::InsufficientMaterial,
            DrawReason::FiftyMoveRule => GameResult::FiftyMoveRule,
            DrawReason::ThreefoldRepetition => GameResult::ThreefoldRepetition,
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameResult::Ongoing => "none",
            GameResult::Checkmate { .. } => "checkmate",
            GameResult::Stalemate => "stalemate",
            GameResult::InsufficientMaterial => "insufficient_material",
            GameResult::FiftyMoveRule => "fifty_move_rule",
            GameResult::ThreefoldRepetition => "threefold_repetition",
        };
        f.write_str(name)
    }
}

#[inline]
pub fn is_check(position: &Position) -> bool {
    is_king_in_check(position, position.side_to_move())
}

pub fn is_checkmate(position: &Position) -> bool {
    is_check(position) && !has_legal_moves(position)
}

pub fn is_stalemate(position: &Position) -> bool {
    !is_check(position) && !has_legal_moves(position)
}

/// Neither side can possibly deliver mate.
pub fn is_insufficient_material(position: &Position) -> bool {
    Color::ALL
        .into_iter()
        .all(|color| has_insufficient_material(position, color))
}

/// `color` has no sequence of moves that could ever mate the opponent.
pub fn has_insufficient_material(position: &Position, color: Color) -> bool {
    let own = |kind| position.pieces(color, kind);
    let both = |kind| position.pieces(Color::White, kind) | position.pieces(Color::Black, kind);

    if own(PieceKind::Pawn) | own(PieceKind::Rook) | own(PieceKind::Queen) != 0 {
        return false;
    }

    if own(PieceKind::Knight) != 0 {
        // A lone knight mates only with help from enemy pawns, minors or rooks.
        let enemy = color.opposite();
        let enemy_helpers = position.occupancy(enemy)
            & !position.pieces(enemy, PieceKind::King)
            & !position.pieces(enemy, PieceKind::Queen);
        return position.occupancy(color).count_ones() <= 2 && enemy_helpers == 0;
    }

    if own(PieceKind::Bishop) != 0 {
        let bishops = both(PieceKind::Bishop);
        let same_color = bishops & DARK_SQUARES == 0 || bishops & LIGHT_SQUARES == 0;
        return same_color && both(PieceKind::Pawn) == 0 && both(PieceKind::Knight) == 0;
    }

    true
}

#[inline]
pub fn is_fifty_move_rule(position: &Position) -> bool {
    position.halfmove_clock() >= FIFTY_MOVE_HALFMOVES
}

/// Current position seen at least three times, itself included.
#[inline]
pub fn is_threefold_repetition(position: &Position, history: &PositionHistory) -> bool {
    history.repetitions_of(position) >= REPETITION_LIMIT
}

/// First draw condition that holds, in the order material, clock, repetition.
pub fn classify_draw(position: &Position, history: &PositionHistory) -> Option<DrawReason> {
    if is_insufficient_material(position) {
        Some(DrawReason::InsufficientMaterial)
    } else if is_fifty_move_rule(position) {
        Some(DrawReason::FiftyMoveRule)
    } else if is_threefold_repetition(position, history) {
        Some(DrawReason::ThreefoldRepetition)
    } else {
        None
    }
}

/// Full classification; checkmate and stalemate win over any draw condition.
pub fn game_result(position: &Position, history: &PositionHistory) -> GameResult {
    if !has_legal_moves(position) {
        return if is_check(position) {
            GameResult::Checkmate {
                winner: position.side_to_move().opposite(),
            }
        } else {
            GameResult::Stalemate
        };
    }

    classify_draw(position, history)
        .map(GameResult::from)
        .unwrap_or(GameResult::Ongoing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::chess_move::Move;
    use crate::board::move_apply::apply;

    fn position(fen: &str) -> Position {
        Position::from_fen(fen).expect("FEN should parse")
    }

    fn play_all(start: &Position, moves: &[&str], history: &mut PositionHistory) -> Position {
        moves.iter().fold(start.clone(), |current, text| {
            let mv = Move::parse(text).expect("move should parse");
            let next = apply(&current, mv).expect("move should be legal");
            history.push(&next);
            next
        })
    }

    #[test]
    fn fools_mate_is_checkmate_for_black() {
        let start = Position::new_game();
        let mut history = PositionHistory::starting_from(&start);
        let end = play_all(&start, &["f2f3", "e7e5", "g2g4", "d8h4"], &mut history);
        assert!(is_check(&end));
        assert!(is_checkmate(&end));
        assert!(!is_stalemate(&end));
        let result = game_result(&end, &history);
        assert_eq!(result, GameResult::Checkmate { winner: Color::Black });
        assert_eq!(result.winner(), Some(Color::Black));
        assert_eq!(result.score(), "0-1");
    }

    #[test]
    fn stalemate_is_not_checkmate() {
        let end = position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert!(is_stalemate(&end));
        assert!(!is_checkmate(&end));
        let history = PositionHistory::starting_from(&end);
        assert_eq!(game_result(&end, &history), GameResult::Stalemate);
    }

    #[test]
    fn checkmate_takes_priority_over_fifty_move_rule() {
        // Back-rank mate delivered with the clock already at 100.
        let mated = position("R5k1/5ppp/8/8/8/8/8/6K1 b - - 100 60");
        assert!(is_fifty_move_rule(&mated));
        let history = PositionHistory::starting_from(&mated);
        assert_eq!(
            game_result(&mated, &history),
            GameResult::Checkmate { winner: Color::White }
        );
    }

    #[test]
    fn insufficient_material_cases() {
        assert!(is_insufficient_material(&position("4k3/8/8/8/8/8/8/4K3 w - - 0 1")));
        assert!(is_insufficient_material(&position("4k3/8/8/8/8/8/8/4KN2 w - - 0 1")));
        assert!(is_insufficient_material(&position("4k3/8/8/8/8/8/8/4KB2 w - - 0 1")));
        // Bishops on the same square color, one per side.
        assert!(is_insufficient_material(&position("4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1")));
        // Opposite-colored bishops can mate in corner constructions.
        assert!(!is_insufficient_material(&position("4k1b1/8/8/8/8/8/8/2B1K3 w - - 0 1")));
        assert!(!is_insufficient_material(&position("4k3/8/8/8/8/8/8/3NKN2 w - - 0 1")));
        assert!(!is_insufficient_material(&position("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1")));
        assert!(!is_insufficient_material(&position("4k3/8/8/8/8/8/8/R3K3 w - - 0 1")));
        // Knight versus a pawn: the knight side could still mate.
        assert!(!is_insufficient_material(&position("4k3/4p3/8/8/8/8/8/4KN2 w - - 0 1")));
    }

    #[test]
    fn fifty_move_rule_triggers_exactly_at_one_hundred() {
        let history = PositionHistory::new();
        let at_99 = position("4k3/8/8/8/8/8/8/R3K3 w - - 99 80");
        assert_eq!(classify_draw(&at_99, &history), None);
        let at_100 = position("4k3/8/8/8/8/8/8/R3K3 b - - 100 80");
        assert_eq!(classify_draw(&at_100, &history), Some(DrawReason::FiftyMoveRule));
    }

    #[test]
    fn halfmove_clock_resets_on_capture_and_pawn_move() {
        let start = position("4k3/8/8/3p4/8/8/4P3/R3K3 w - - 99 80");
        let after_pawn = apply(&start, Move::parse("e2e4").expect("parses")).expect("legal");
        assert_eq!(after_pawn.halfmove_clock(), 0);
        let quiet = apply(&start, Move::parse("a1a2").expect("parses")).expect("legal");
        assert_eq!(quiet.halfmove_clock(), 100);
        assert_eq!(
            classify_draw(&quiet, &PositionHistory::new()),
            Some(DrawReason::FiftyMoveRule)
        );
    }

    #[test]
    fn threefold_repetition_on_third_occurrence_only() {
        let start = Position::new_game();
        let mut history = PositionHistory::starting_from(&start);
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];

        let second = play_all(&start, &shuffle, &mut history);
        assert_eq!(second, {
            let mut expected = start.clone();
            expected.halfmove_clock = 4;
            expected.fullmove_number = 3;
            expected
        });
        assert_eq!(classify_draw(&second, &history), None);

        let third = play_all(&second, &shuffle, &mut history);
        assert_eq!(
            classify_draw(&third, &history),
            Some(DrawReason::ThreefoldRepetition)
        );
        assert_eq!(game_result(&third, &history), GameResult::ThreefoldRepetition);
    }

    #[test]
    fn result_names_and_scores() {
        assert_eq!(GameResult::Ongoing.to_string(), "none");
        assert_eq!(GameResult::FiftyMoveRule.to_string(), "fifty_move_rule");
        assert_eq!(GameResult::Stalemate.score(), "1/2-1/2");
        assert!(GameResult::ThreefoldRepetition.is_draw());
        assert!(!GameResult::Ongoing.is_terminal());
    }
}
