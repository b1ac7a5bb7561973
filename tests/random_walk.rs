//! Seeded random games checking move-generation invariants ply by ply.

use rand::prelude::IndexedRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;

use engine_match::board::chess_move::Move;
use engine_match::board::chess_types::{Color, PieceKind};
use engine_match::board::game_rules::game_result;
use engine_match::board::history::PositionHistory;
use engine_match::board::move_apply::apply;
use engine_match::board::move_generator::{is_king_in_check, legal_moves};
use engine_match::board::position::Position;
use engine_match::protocol::uci_codec::{decode_best_move, encode_best_move};

const GAMES: u64 = 24;
const MAX_PLIES: usize = 200;

fn assert_invariants(position: &Position) {
    for color in Color::ALL {
        assert_eq!(
            position.pieces(color, PieceKind::King).count_ones(),
            1,
            "{color} king count in {position}"
        );
    }
    let reparsed = Position::from_fen(&position.to_fen()).expect("own FEN should parse");
    assert_eq!(&reparsed, position);
}

#[test]
fn random_games_never_leave_the_mover_in_check() {
    for seed in 0..GAMES {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut position = Position::new_game();
        let mut history = PositionHistory::starting_from(&position);

        for _ in 0..MAX_PLIES {
            if game_result(&position, &history).is_terminal() {
                break;
            }
            let moves = legal_moves(&position);
            let Some(&mv) = moves.choose(&mut rng) else {
                panic!("non-terminal position without moves: {position}");
            };

            let mover = position.side_to_move();
            let next = apply(&position, mv).expect("generated move should apply");
            assert!(!is_king_in_check(&next, mover), "{mv} leaves {mover} in check");
            assert_eq!(next.side_to_move(), mover.opposite());
            assert_invariants(&next);

            let echoed: Move = decode_best_move(&encode_best_move(mv, None))
                .expect("bestmove line should decode");
            assert_eq!(echoed, mv);

            history.push(&next);
            position = next;
        }
    }
}
