//! Zobrist hashing for chess positions.
//!
//! Provides incrementally-updatable 64-bit position hashes for the
//! transposition table. The keys are drawn from a seeded RNG so hashes of
//! identical positions match across runs and builds.

use std::sync::LazyLock;

use rand::prelude::*;

use crate::board::{Color, Piece, Square};

/// Fixed seed; part of the hash definition.
const ZOBRIST_SEED: u64 = 0xB1A5_7B0A_12D5_EEDu64;

pub(crate) struct ZobristKeys {
    /// piece_keys[piece_type][color][square]
    pub(crate) piece_keys: [[[u64; 64]; 2]; 6],
    pub(crate) side_key: u64,
    /// One key per castling right (WK, WQ, BK, BQ)
    pub(crate) castling_keys: [u64; 4],
    /// Only the file of an en-passant target matters
    pub(crate) en_passant_keys: [u64; 8],
}

impl ZobristKeys {
    fn new() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut piece_keys = [[[0; 64]; 2]; 6];
        let mut castling_keys = [0; 4];
        let mut en_passant_keys = [0; 8];

        for piece in &mut piece_keys {
            for color in piece.iter_mut() {
                for key in color.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let side_key = rng.gen();

        for key in &mut castling_keys {
            *key = rng.gen();
        }

        for key in &mut en_passant_keys {
            *key = rng.gen();
        }

        ZobristKeys {
            piece_keys,
            side_key,
            castling_keys,
            en_passant_keys,
        }
    }
}

pub(crate) static ZOBRIST: LazyLock<ZobristKeys> = LazyLock::new(ZobristKeys::new);

#[inline]
pub(crate) fn piece_key(piece: Piece, color: Color, sq: Square) -> u64 {
    ZOBRIST.piece_keys[piece.index()][color.index()][sq.index()]
}

#[inline]
pub(crate) fn side_key() -> u64 {
    ZOBRIST.side_key
}

#[inline]
pub(crate) fn castling_key(right: usize) -> u64 {
    ZOBRIST.castling_keys[right]
}

#[inline]
pub(crate) fn en_passant_key(file: usize) -> u64 {
    ZOBRIST.en_passant_keys[file]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable() {
        // The same key twice; LazyLock must hand out identical data
        let a = piece_key(Piece::Pawn, Color::White, Square::A1);
        let b = piece_key(Piece::Pawn, Color::White, Square::A1);
        assert_eq!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn test_keys_are_distinct() {
        let a = piece_key(Piece::Pawn, Color::White, Square::A1);
        let b = piece_key(Piece::Pawn, Color::Black, Square::A1);
        let c = piece_key(Piece::Knight, Color::White, Square::A1);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(side_key(), 0);
    }
}
