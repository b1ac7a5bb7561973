//! Crate root module declarations for the engine match orchestrator.
//!
//! Exposes the board model, the UCI line codec, supervision of the external
//! engine process and the match session built on top of them, so the CLI,
//! the bundled test engine, integration tests and benches share one set of
//! module paths.

pub mod board {
    pub mod algebraic;
    pub mod attacks;
    pub mod chess_move;
    pub mod chess_rules;
    pub mod chess_types;
    pub mod fen;
    pub mod game_rules;
    pub mod history;
    pub mod move_apply;
    pub mod move_generator;
    pub mod perft;
    pub mod position;
    pub mod render;
}

pub mod protocol {
    pub mod uci_codec;
}

pub mod engine {
    pub mod config;
    pub mod error;
    pub mod process;
    pub mod supervisor;
}

pub mod session {
    pub mod error;
    pub mod orchestrator;
    pub mod retry;
    #[cfg(test)]
    pub(crate) mod scripted_engine;
    pub mod session;
}

pub mod utils {
    pub mod pgn;
}
