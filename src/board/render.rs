//! Unicode board diagram for terminal output.

use crate::board::chess_types::*;
use crate::board::position::Position;

/// Render the board from White's side with file and rank labels.
pub fn render_position(position: &Position) -> String {
    let mut out = String::new();
    out.push_str("  a b c d e f g h\n");

    for rank in (0..8u8).rev() {
        let label = char::from(b'1' + rank);
        out.push(label);
        out.push(' ');

        for file in 0..8u8 {
            let glyph = position
                .piece_at(make_square(file, rank))
                .map(|(color, kind)| piece_glyph(color, kind))
                .unwrap_or('·');
            out.push(glyph);
            if file < 7 {
                out.push(' ');
            }
        }

        out.push(' ');
        out.push(label);
        out.push('\n');
    }

    out.push_str("  a b c d e f g h");
    out
}

fn piece_glyph(color: Color, kind: PieceKind) -> char {
    const WHITE: [char; 6] = ['♙', '♘', '♗', '♖', '♕', '♔'];
    const BLACK: [char; 6] = ['♟', '♞', '♝', '♜', '♛', '♚'];
    match color {
        Color::White => WHITE[kind.index()],
        Color::Black => BLACK[kind.index()],
    }
}
