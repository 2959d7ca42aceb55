//! Pawn move generation: pushes, captures, promotions, en passant.

use crate::board::attack_tables::pawn_attacks;

use super::super::{Bitboard, Color, Move, MoveList, Piece, Position, Square};
use super::GenType;

impl Position {
    pub(super) fn gen_pawn_moves(&self, gen: GenType, list: &mut MoveList, targets: Bitboard) {
        let us = self.stm;
        let them = !us;
        let st = self.state();
        let pawns = self.pieces_of(us, Piece::Pawn);
        let empty = !self.occupied();
        let enemies = self.color(them);

        let (promo_rank, double_rank, up): (Bitboard, Bitboard, i8) = if us == Color::White {
            (Bitboard::RANK_7, Bitboard::RANK_3, 8)
        } else {
            (Bitboard::RANK_2, Bitboard::RANK_6, -8)
        };
        let shift_up = |bb: Bitboard| {
            if us == Color::White {
                bb.shift_north()
            } else {
                bb.shift_south()
            }
        };
        let shift_up_west = |bb: Bitboard| shift_up(bb).shift_west();
        let shift_up_east = |bb: Bitboard| shift_up(bb).shift_east();

        let pawns_on7 = pawns & promo_rank;
        let pawns_not7 = pawns & !promo_rank;

        // Pushes (everything except the pure-capture stage)
        if gen != GenType::Loud {
            let mut push1 = shift_up(pawns_not7) & empty;
            let mut push2 = shift_up(push1 & double_rank) & empty & targets;
            push1 &= targets;

            if gen == GenType::QuietChecks {
                // Direct pawn checks, plus pushes of pawns shielding the
                // enemy king from a slider on another file
                let enemy_king = st.king_sq[them.index()];
                let discovered = pawns_not7
                    & st.blockers[them.index()]
                    & !Bitboard::file_mask(enemy_king.file());
                let check_mask = st.check_squares[Piece::Pawn.index()];
                push1 &= check_mask | shift_up(discovered);
                push2 &= check_mask | shift_up(shift_up(discovered));
            }

            for to in push1.iter() {
                list.push(Move::new(to.offset(-up), to));
            }
            for to in push2.iter() {
                list.push(Move::new(to.offset(-2 * up), to));
            }
        }

        // Promotions; the emitted piece set depends on the stage
        if !pawns_on7.is_empty() && gen != GenType::QuietChecks {
            let push_promos = shift_up(pawns_on7) & empty;
            let west_promos = shift_up_west(pawns_on7) & enemies;
            let east_promos = shift_up_east(pawns_on7) & enemies;

            let (push_set, capture_set): (&[Piece], &[Piece]) = match gen {
                GenType::Loud => (&[Piece::Queen], &super::super::types::PROMOTION_PIECES),
                GenType::Quiets => (&[Piece::Knight, Piece::Bishop, Piece::Rook], &[]),
                _ => (
                    &super::super::types::PROMOTION_PIECES,
                    &super::super::types::PROMOTION_PIECES,
                ),
            };

            // The Loud stage emits every promotion regardless of the
            // capture targets; evasion block masks still apply elsewhere
            let promo_mask = if gen == GenType::Loud {
                Bitboard::ALL
            } else {
                targets
            };

            for to in (push_promos & promo_mask).iter() {
                for &piece in push_set {
                    list.push(Move::promotion(to.offset(-up), to, piece));
                }
            }
            for to in (west_promos & promo_mask).iter() {
                for &piece in capture_set {
                    list.push(Move::promotion(to.offset(-(up - 1)), to, piece));
                }
            }
            for to in (east_promos & promo_mask).iter() {
                for &piece in capture_set {
                    list.push(Move::promotion(to.offset(-(up + 1)), to, piece));
                }
            }
        }

        // Captures
        if matches!(gen, GenType::Loud | GenType::Evasions | GenType::NonEvasions) {
            let capture_targets = enemies & targets;
            let west = shift_up_west(pawns_not7) & capture_targets;
            let east = shift_up_east(pawns_not7) & capture_targets;
            for to in west.iter() {
                list.push(Move::new(to.offset(-(up - 1)), to));
            }
            for to in east.iter() {
                list.push(Move::new(to.offset(-(up + 1)), to));
            }

            if let Some(ep_sq) = st.en_passant {
                // In evasions an en-passant capture only helps when the
                // double-pushed pawn is the checker
                let pushed_pawn = Square::new(
                    if us == Color::White {
                        ep_sq.rank() - 1
                    } else {
                        ep_sq.rank() + 1
                    },
                    ep_sq.file(),
                );
                let allowed = gen != GenType::Evasions || st.checkers.contains(pushed_pawn);
                if allowed {
                    let capturers = pawn_attacks(them, ep_sq) & pawns_not7;
                    for from in capturers.iter() {
                        list.push(Move::en_passant(from, ep_sq));
                    }
                }
            }
        }
    }
}
