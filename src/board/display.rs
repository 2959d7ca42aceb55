//! Text rendering of a position for the `d` command.

use std::fmt;

use super::{Position, Square};

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " +---+---+---+---+---+---+---+---+")?;
        for rank in (0..8).rev() {
            write!(f, " |")?;
            for file in 0..8 {
                let sq = Square::new(rank, file);
                let c = match (self.piece_on(sq), self.color_on(sq)) {
                    (Some(piece), Some(color)) => piece.to_fen_char(color),
                    _ => ' ',
                };
                write!(f, " {c} |")?;
            }
            writeln!(f, " {}", rank + 1)?;
            writeln!(f, " +---+---+---+---+---+---+---+---+")?;
        }
        writeln!(f, "   a   b   c   d   e   f   g   h")?;
        writeln!(f)?;
        writeln!(f, "Fen: {}", self.to_fen())?;
        write!(f, "Key: {:016X}", self.hash())?;
        if self.in_check() {
            write!(f, "\nCheckers:")?;
            for sq in self.checkers().iter() {
                write!(f, " {sq}")?;
            }
        }
        Ok(())
    }
}
