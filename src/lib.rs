//! Basalt: a UCI chess engine.
//!
//! Bitboard move generation over magic attack tables, an
//! iterative-deepening alpha-beta search with a shared lock-free
//! transposition table, and NNUE evaluation with incrementally maintained
//! accumulators.

pub mod board;
pub mod nnue;
pub mod search;
pub mod tt;
pub mod uci;
pub mod zobrist;
