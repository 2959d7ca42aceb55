//! Castling rights type, Fischer-random aware.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::piece::Color;

/// Which wing the castle goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastlingSide {
    King,
    Queen,
}

impl CastlingSide {
    pub const BOTH: [CastlingSide; 2] = [CastlingSide::King, CastlingSide::Queen];
}

/// Index of a castling right: WK=0, WQ=1, BK=2, BQ=3.
///
/// The zobrist table and the rook-square array in `Position` are both
/// indexed by this.
#[inline]
#[must_use]
pub(crate) const fn right_index(color: Color, side: CastlingSide) -> usize {
    color.index() * 2
        + match side {
            CastlingSide::King => 0,
            CastlingSide::Queen => 1,
        }
}

/// Castling rights represented as a 4-bit mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CastlingRights(u8);

impl CastlingRights {
    /// No castling rights
    #[must_use]
    pub const fn none() -> Self {
        CastlingRights(0)
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if a specific right is set
    #[inline]
    #[must_use]
    pub const fn has(self, color: Color, side: CastlingSide) -> bool {
        self.0 & (1 << right_index(color, side)) != 0
    }

    /// Check if a color has any right left
    #[inline]
    #[must_use]
    pub const fn has_any(self, color: Color) -> bool {
        self.0 & (0b11 << (color.index() * 2)) != 0
    }

    /// Set a specific right
    #[inline]
    pub fn set(&mut self, color: Color, side: CastlingSide) {
        self.0 |= 1 << right_index(color, side);
    }

    /// Remove a specific right
    #[inline]
    pub fn remove(&mut self, color: Color, side: CastlingSide) {
        self.0 &= !(1 << right_index(color, side));
    }

    /// Remove both rights of a color
    #[inline]
    pub fn remove_all(&mut self, color: Color) {
        self.0 &= !(0b11 << (color.index() * 2));
    }

    /// Get the raw bitmask value (for zobrist hashing)
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_indices_distinct() {
        let mut seen = [false; 4];
        for color in [Color::White, Color::Black] {
            for side in CastlingSide::BOTH {
                let idx = right_index(color, side);
                assert!(!seen[idx]);
                seen[idx] = true;
            }
        }
    }

    #[test]
    fn test_set_remove() {
        let mut cr = CastlingRights::none();
        cr.set(Color::White, CastlingSide::King);
        cr.set(Color::Black, CastlingSide::Queen);
        assert!(cr.has(Color::White, CastlingSide::King));
        assert!(!cr.has(Color::White, CastlingSide::Queen));
        assert!(cr.has_any(Color::Black));

        cr.remove(Color::White, CastlingSide::King);
        assert!(!cr.has_any(Color::White));
        cr.remove_all(Color::Black);
        assert!(cr.is_empty());
    }
}
