//! Static exchange evaluation.
//!
//! Plays out the capture sequence on one square, each side always using its
//! least valuable attacker, and returns the material outcome for the mover.
//! Sliders revealed by a departing attacker join the exchange.

use crate::board::attack_tables::{bishop_attacks, rook_attacks};

use super::{Bitboard, Move, MoveKind, Piece, Position};

impl Position {
    /// Material outcome of the capture sequence started by `m`, in
    /// centipawns from the mover's point of view. Non-normal moves are
    /// scored neutrally.
    #[must_use]
    pub(crate) fn see(&self, m: Move) -> i32 {
        if m.kind() != MoveKind::Normal {
            return 0;
        }
        let from = m.from();
        let to = m.to();

        let mut gain = [0i32; 32];
        let mut occupied = self.occupied();
        let mut side = self.stm;
        let mut attacker = self.piece_on(from).expect("see: from square empty");

        gain[0] = self.piece_on(to).map_or(0, Piece::value);

        let mut depth = 0;
        let mut attacker_bb = Bitboard::from_square(from);

        loop {
            depth += 1;
            side = !side;
            gain[depth] = attacker.value() - gain[depth - 1];

            // Even the optimistic outcome loses: stop early
            if gain[depth].max(-gain[depth - 1]) < 0 {
                break;
            }

            occupied ^= attacker_bb;

            // Recompute attackers so x-rays through the departed piece count
            let rook_like = self.pieces(Piece::Rook) | self.pieces(Piece::Queen);
            let bishop_like = self.pieces(Piece::Bishop) | self.pieces(Piece::Queen);
            let attackers = ((self.attackers_to(to, occupied)
                | (rook_attacks(to, occupied) & rook_like)
                | (bishop_attacks(to, occupied) & bishop_like))
                & occupied)
                & self.color(side);

            // Least valuable attacker of the side to recapture
            let mut found = false;
            for piece in Piece::ALL {
                let candidates = attackers & self.pieces(piece);
                if !candidates.is_empty() {
                    attacker = piece;
                    attacker_bb = Bitboard::from_square(candidates.lsb());
                    found = true;
                    break;
                }
            }
            if !found || depth + 1 >= gain.len() {
                break;
            }
        }

        while depth > 1 {
            depth -= 1;
            gain[depth - 1] = -(-gain[depth - 1]).max(gain[depth]);
        }
        gain[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;

    fn capture(pos: &Position, from: &str, to: &str) -> Move {
        Move::new(
            from.parse::<Square>().unwrap(),
            to.parse::<Square>().unwrap(),
        )
    }

    #[test]
    fn test_see_undefended_pawn() {
        let pos: Position = "4k3/8/8/3p4/4N3/8/8/4K3 w - - 0 1".parse().unwrap();
        let m = capture(&pos, "e4", "d5");
        assert_eq!(pos.see(m), Piece::Pawn.value());
    }

    #[test]
    fn test_see_defended_pawn_bad_trade() {
        // Knight takes a pawn defended by a pawn: loses knight for pawn
        let pos: Position = "4k3/8/2p5/3p4/4N3/8/8/4K3 w - - 0 1".parse().unwrap();
        let m = capture(&pos, "e4", "d5");
        assert_eq!(pos.see(m), Piece::Pawn.value() - Piece::Knight.value());
    }

    #[test]
    fn test_see_rook_takes_defended_pawn() {
        // RxP on d5 runs into rxR from d8: a losing exchange
        let pos: Position = "3rk3/8/8/3p4/8/8/8/3RK2R w - - 0 1".parse().unwrap();
        let m = capture(&pos, "d1", "d5");
        assert_eq!(pos.see(m), Piece::Pawn.value() - Piece::Rook.value());
    }

    #[test]
    fn test_see_winning_exchange_with_backup() {
        // Pawn takes knight defended once, backed by our bishop; the
        // recapture trades pawns, so the whole knight stays won
        let pos: Position = "4k3/8/4p3/3n4/2P5/1B6/8/4K3 w - - 0 1".parse().unwrap();
        let m = capture(&pos, "c4", "d5");
        assert_eq!(pos.see(m), Piece::Knight.value());
    }
}
