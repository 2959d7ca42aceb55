//! Staged pseudo-legal move generation and the legality filter.
//!
//! Generation is parameterised by a [`GenType`] tag. Each stage computes a
//! `targets` mask and emits only moves whose destination lies in it:
//!
//! - `Loud`: captures plus all promotions
//! - `Quiets`: non-captures (underpromotions only)
//! - `QuietChecks`: non-captures that give direct or discovered check
//! - `Evasions`: king moves, checker captures and interpositions
//! - `NonEvasions`: everything pseudo-legal
//!
//! Castling is emitted in `Quiets`/`NonEvasions` when rights survive and the
//! path is clear; attack-freedom of the king's path is the legality
//! filter's job.

mod pawns;

use crate::board::attack_tables::{
    aligned, between, bishop_attacks, king_attacks, knight_attacks, line, pawn_attacks,
    queen_attacks, rook_attacks,
};

use super::{Bitboard, CastlingSide, Move, MoveKind, MoveList, Piece, Position, Square};

/// Generation stage tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenType {
    Loud,
    Quiets,
    QuietChecks,
    Evasions,
    NonEvasions,
}

impl Position {
    /// Generate pseudo-legal moves for the current side into `list`.
    pub fn generate(&self, gen: GenType, list: &mut MoveList) {
        debug_assert_eq!(
            matches!(gen, GenType::Evasions),
            self.in_check(),
            "evasion generation only while in check"
        );

        let us = self.stm;
        let ksq = self.king_square(us);
        let checkers = self.checkers();

        // Double check: only the king may move
        if gen == GenType::Evasions && checkers.more_than_one() {
            self.gen_king_steps(gen, list, !self.color(us));
            return;
        }

        let targets = match gen {
            GenType::Evasions => between(ksq, checkers.lsb()) | checkers,
            GenType::NonEvasions => !self.color(us),
            GenType::Loud => self.color(!us),
            GenType::Quiets | GenType::QuietChecks => !self.occupied(),
        };

        self.gen_pawn_moves(gen, list, targets);
        for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
            self.gen_piece_moves(piece, gen, list, targets);
        }

        let king_targets = if gen == GenType::Evasions {
            !self.color(us)
        } else {
            targets
        };
        self.gen_king_steps(gen, list, king_targets);

        if matches!(gen, GenType::Quiets | GenType::NonEvasions) {
            self.gen_castles(list);
        }
    }

    fn gen_piece_moves(&self, piece: Piece, gen: GenType, list: &mut MoveList, targets: Bitboard) {
        let us = self.stm;
        let them = !us;
        let occupied = self.occupied();
        let st = self.state();
        let enemy_king = st.king_sq[them.index()];

        for from in self.pieces_of(us, piece).iter() {
            let mut attacks = match piece {
                Piece::Knight => knight_attacks(from),
                Piece::Bishop => bishop_attacks(from, occupied),
                Piece::Rook => rook_attacks(from, occupied),
                _ => queen_attacks(from, occupied),
            } & targets;

            if gen == GenType::QuietChecks {
                let discovers = st.blockers[them.index()].contains(from);
                if discovers {
                    // Every destination off the king line discovers; on the
                    // line only a direct check still counts
                    attacks &= st.check_squares[piece.index()] | !line(from, enemy_king);
                } else {
                    attacks &= st.check_squares[piece.index()];
                }
            }

            for to in attacks.iter() {
                list.push(Move::new(from, to));
            }
        }
    }

    fn gen_king_steps(&self, gen: GenType, list: &mut MoveList, targets: Bitboard) {
        let us = self.stm;
        let them = !us;
        let st = self.state();
        let from = st.king_sq[us.index()];
        let mut attacks = king_attacks(from) & targets;

        if gen == GenType::QuietChecks {
            // The king can only ever check by discovery
            if !st.blockers[them.index()].contains(from) {
                return;
            }
            attacks &= !line(from, st.king_sq[them.index()]);
        }

        for to in attacks.iter() {
            list.push(Move::new(from, to));
        }
    }

    fn gen_castles(&self, list: &mut MoveList) {
        let us = self.stm;
        let ksq = self.king_square(us);
        for side in CastlingSide::BOTH {
            if !self.state().castling.has(us, side) {
                continue;
            }
            let Some(rook_from) = self.castling_rook_square(us, side) else {
                continue;
            };
            let idx = super::types::right_index(us, side);
            if (self.castle_path[idx] & self.occupied()).is_empty() {
                list.push(Move::castle(ksq, rook_from));
            }
        }
    }

    // =========================================================================
    // Legality
    // =========================================================================

    /// Full legality test for a pseudo-legal move of the side to move.
    #[must_use]
    pub fn is_legal(&self, m: Move) -> bool {
        let us = self.stm;
        let them = !us;
        let from = m.from();
        let to = m.to();
        let st = self.state();
        let ksq = st.king_sq[us.index()];
        let occupied = self.occupied();

        match m.kind() {
            MoveKind::EnPassant => {
                // Remove both pawns from a simulated occupancy, place ours,
                // and demand the king is not attacked
                let capture_sq = Square::new(from.rank(), to.file());
                let captured_bb = Bitboard::from_square(capture_sq);
                let after = (occupied ^ Bitboard::from_square(from) ^ captured_bb)
                    | Bitboard::from_square(to);
                let enemy = self.color(them) & !captured_bb;
                let ours_after = Bitboard::from_square(to);

                let rook_like =
                    (self.pieces(Piece::Rook) | self.pieces(Piece::Queen)) & enemy;
                let bishop_like =
                    (self.pieces(Piece::Bishop) | self.pieces(Piece::Queen)) & enemy;
                let knights = self.pieces(Piece::Knight) & enemy;
                let pawns = self.pieces(Piece::Pawn) & enemy & !ours_after;

                (rook_attacks(ksq, after) & rook_like).is_empty()
                    && (bishop_attacks(ksq, after) & bishop_like).is_empty()
                    && (knight_attacks(ksq) & knights).is_empty()
                    && (pawn_attacks(us, ksq) & pawns).is_empty()
            }
            MoveKind::Castle => {
                if self.in_check() {
                    return false;
                }
                let side = if to.file() > from.file() {
                    CastlingSide::King
                } else {
                    CastlingSide::Queen
                };
                let king_to = Self::castle_king_to(us, side);
                let rook_to = Self::castle_rook_to(us, side);

                // Every square the king crosses must be safe
                let path = between(from, king_to) | Bitboard::from_square(king_to);
                let slide_occ = occupied ^ Bitboard::from_square(from);
                for sq in path.iter() {
                    if self.attacked_by(sq, them, slide_occ) {
                        return false;
                    }
                }

                // Final placement: the rook no longer shields the king
                let after = (occupied
                    ^ Bitboard::from_square(from)
                    ^ Bitboard::from_square(to))
                    | Bitboard::from_square(king_to)
                    | Bitboard::from_square(rook_to);
                !self.attacked_by(king_to, them, after)
            }
            _ if self.piece_on(from) == Some(Piece::King) => {
                // King steps: remove the king from the occupancy so sliders
                // see through it
                !self.attacked_by(to, them, occupied ^ Bitboard::from_square(from))
            }
            _ => {
                let checkers = st.checkers;
                if checkers.more_than_one() {
                    return false;
                }
                if !checkers.is_empty() {
                    let checker = checkers.lsb();
                    let resolves = (between(ksq, checker) | checkers).contains(to);
                    if !resolves {
                        return false;
                    }
                }
                // A pinned piece must stay on its pin line
                !st.blockers[us.index()].contains(from) || aligned(from, to, ksq)
            }
        }
    }

    /// All legal moves of the side to move.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        let mut pseudo = MoveList::new();
        if self.in_check() {
            self.generate(GenType::Evasions, &mut pseudo);
        } else {
            self.generate(GenType::NonEvasions, &mut pseudo);
        }

        let mut legal = MoveList::new();
        for &m in &pseudo {
            if self.is_legal(m) {
                legal.push(m);
            }
        }
        legal
    }

    /// Leaf-node count of the move generation tree to the given depth.
    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.legal_moves();
        if depth == 1 {
            return moves.len() as u64;
        }
        let mut nodes = 0;
        for &m in &moves {
            self.make_move(m);
            nodes += self.perft(depth - 1);
            self.unmake_move(m);
        }
        nodes
    }
}
