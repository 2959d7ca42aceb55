//! Applying and taking back moves.
//!
//! `make_move` pushes a new state frame, applies the move to the bitboards
//! and mailbox, maintains the zobrist hash and material counters
//! incrementally, recomputes check information and feeds the NNUE
//! accumulator delta. `unmake_move` restores the board and pops the frame;
//! it never recomputes the hash.

use crate::board::attack_tables::pawn_attacks;
use crate::nnue::FeatureDelta;
use crate::zobrist;

use super::types::right_index;
use super::{CastlingSide, Color, Move, Piece, Position, Square};

impl Position {
    fn push_state(&mut self) {
        debug_assert!(self.ply + 1 < self.states.len(), "state stack exhausted");
        let (head, tail) = self.states.split_at_mut(self.ply + 1);
        tail[0].clone_from(&head[self.ply]);
        self.ply += 1;
    }

    /// Remove both castling rights of `color`, adjusting the hash.
    fn clear_rights(&mut self, color: Color, hash: &mut u64) {
        for side in CastlingSide::BOTH {
            if self.state().castling.has(color, side) {
                *hash ^= zobrist::castling_key(right_index(color, side));
                self.state_mut().castling.remove(color, side);
            }
        }
    }

    /// Remove the castling right tied to a rook start square, if any.
    fn clear_right_for_rook(&mut self, color: Color, sq: Square, hash: &mut u64) {
        for side in CastlingSide::BOTH {
            let idx = right_index(color, side);
            if self.castle_rook[idx] == Some(sq) && self.state().castling.has(color, side) {
                *hash ^= zobrist::castling_key(idx);
                self.state_mut().castling.remove(color, side);
            }
        }
    }

    /// Apply a pseudo-legal, legal move.
    pub fn make_move(&mut self, m: Move) {
        let us = self.stm;
        let them = !us;
        let from = m.from();
        let to = m.to();
        let piece = self.mailbox[from.index()].expect("make_move: from square empty");
        debug_assert_eq!(self.color_on(from), Some(us), "make_move: mover not to move");

        self.push_state();
        let mut hash = self.state().hash;
        {
            let st = self.state_mut();
            st.halfmove_clock += 1;
            st.plies_from_null += 1;
            st.captured = None;
            st.eval = None;
        }
        if us == Color::Black {
            self.fullmove += 1;
        }

        // A stale en-passant file leaves the hash before anything else
        if let Some(ep) = self.state().en_passant {
            hash ^= zobrist::en_passant_key(ep.file());
            self.state_mut().en_passant = None;
        }

        let mut delta = FeatureDelta::new();
        let mut king_move: Option<(Color, Square, Square)> = None;

        if m.is_castle() {
            let side = if to.file() > from.file() {
                CastlingSide::King
            } else {
                CastlingSide::Queen
            };
            let king_to = Self::castle_king_to(us, side);
            let rook_to = Self::castle_rook_to(us, side);

            // Lift both pieces first: in Fischer-random the king and rook
            // paths may overlap their own start squares.
            self.remove_piece(from, us, Piece::King);
            self.remove_piece(to, us, Piece::Rook);
            self.set_piece(king_to, us, Piece::King);
            self.set_piece(rook_to, us, Piece::Rook);

            hash ^= zobrist::piece_key(Piece::King, us, from)
                ^ zobrist::piece_key(Piece::King, us, king_to)
                ^ zobrist::piece_key(Piece::Rook, us, to)
                ^ zobrist::piece_key(Piece::Rook, us, rook_to);
            delta.sub(us, Piece::King, from);
            delta.sub(us, Piece::Rook, to);
            delta.add(us, Piece::King, king_to);
            delta.add(us, Piece::Rook, rook_to);

            self.state_mut().king_sq[us.index()] = king_to;
            king_move = Some((us, from, king_to));
            self.clear_rights(us, &mut hash);
        } else {
            // Captures, including en passant
            let capture_sq = if m.is_en_passant() {
                Square::new(from.rank(), to.file())
            } else {
                to
            };
            let captured = if m.is_en_passant() {
                Some(Piece::Pawn)
            } else {
                self.mailbox[to.index()]
            };

            if let Some(cap) = captured {
                self.remove_piece(capture_sq, them, cap);
                hash ^= zobrist::piece_key(cap, them, capture_sq);
                delta.sub(them, cap, capture_sq);
                {
                    let st = self.state_mut();
                    st.material[them.index()] -= cap.value();
                    if cap != Piece::Pawn {
                        st.non_pawn_material[them.index()] -= cap.value();
                    }
                    st.halfmove_clock = 0;
                    st.captured = Some(cap);
                }
                if cap == Piece::Rook {
                    self.clear_right_for_rook(them, capture_sq, &mut hash);
                }
            }

            // Move the mover; promotions place the new piece directly
            let placed = m.promotion_piece().unwrap_or(piece);
            self.remove_piece(from, us, piece);
            self.set_piece(to, us, placed);
            hash ^= zobrist::piece_key(piece, us, from) ^ zobrist::piece_key(placed, us, to);
            delta.sub(us, piece, from);
            delta.add(us, placed, to);

            match piece {
                Piece::King => {
                    self.state_mut().king_sq[us.index()] = to;
                    king_move = Some((us, from, to));
                    self.clear_rights(us, &mut hash);
                }
                Piece::Rook => {
                    self.clear_right_for_rook(us, from, &mut hash);
                }
                Piece::Pawn => {
                    self.state_mut().halfmove_clock = 0;
                    if from.rank().abs_diff(to.rank()) == 2 {
                        // The passed-over square counts as an en-passant
                        // target only when an enemy pawn can actually take
                        let ep_sq = Square::new((from.rank() + to.rank()) / 2, from.file());
                        let capturers =
                            pawn_attacks(us, ep_sq) & self.pieces_of(them, Piece::Pawn);
                        if !capturers.is_empty() {
                            self.state_mut().en_passant = Some(ep_sq);
                            hash ^= zobrist::en_passant_key(ep_sq.file());
                        }
                    }
                    if let Some(promo) = m.promotion_piece() {
                        let st = self.state_mut();
                        st.material[us.index()] += promo.value() - Piece::Pawn.value();
                        st.non_pawn_material[us.index()] += promo.value();
                    }
                }
                _ => {}
            }
        }

        hash ^= zobrist::side_key();
        self.stm = them;
        self.state_mut().hash = hash;

        self.update_check_info();
        self.apply_nnue_update(&delta, king_move);

        debug_assert_eq!(self.state().hash, self.compute_hash());
        debug_assert_eq!(
            self.all_bb,
            self.color_bb[0] | self.color_bb[1],
            "occupancy cache out of sync"
        );
    }

    /// Take back the last move. All scalar state is restored from the
    /// popped frame; only piece placement is replayed in reverse.
    pub fn unmake_move(&mut self, m: Move) {
        let us = !self.stm;
        self.stm = us;
        if us == Color::Black {
            self.fullmove -= 1;
        }

        let captured = self.state().captured;
        let from = m.from();
        let to = m.to();

        if m.is_castle() {
            let side = if to.file() > from.file() {
                CastlingSide::King
            } else {
                CastlingSide::Queen
            };
            let king_to = Self::castle_king_to(us, side);
            let rook_to = Self::castle_rook_to(us, side);
            self.remove_piece(king_to, us, Piece::King);
            self.remove_piece(rook_to, us, Piece::Rook);
            self.set_piece(from, us, Piece::King);
            self.set_piece(to, us, Piece::Rook);
        } else {
            let placed = self.mailbox[to.index()].expect("unmake_move: to square empty");
            let piece = if m.is_promotion() { Piece::Pawn } else { placed };
            self.remove_piece(to, us, placed);
            self.set_piece(from, us, piece);

            if m.is_en_passant() {
                self.set_piece(Square::new(from.rank(), to.file()), !us, Piece::Pawn);
            } else if let Some(cap) = captured {
                self.set_piece(to, !us, cap);
            }
        }

        self.ply -= 1;
    }

    /// Pass the move: copy state, clear the en-passant square, toggle the
    /// side to move. The accumulator carries over untouched.
    pub fn make_null_move(&mut self) {
        debug_assert!(!self.in_check(), "null move while in check");
        self.push_state();
        let mut hash = self.state().hash;
        if let Some(ep) = self.state().en_passant {
            hash ^= zobrist::en_passant_key(ep.file());
            self.state_mut().en_passant = None;
        }
        hash ^= zobrist::side_key();
        self.stm = !self.stm;
        {
            let st = self.state_mut();
            st.hash = hash;
            st.plies_from_null = 0;
            st.captured = None;
            st.eval = None;
        }
        self.update_check_info();
    }

    pub fn unmake_null_move(&mut self) {
        self.stm = !self.stm;
        self.ply -= 1;
    }
}
