//! The position and its per-ply state stack.
//!
//! A `Position` owns a preallocated stack of `StateInfo` records, one per
//! ply; make/unmake push and pop by bumping an index, never reallocating.
//! Each record carries everything a move cannot cheaply recompute when
//! taken back: castling rights, the en-passant square, clocks, the zobrist
//! hash, check information and the NNUE accumulator pair.

use std::sync::Arc;

use crate::board::attack_tables::{
    between, bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};
use crate::nnue::{Accumulator, NnueNetwork};

use super::types::{right_index, MAX_GAME_PLY};
use super::{Bitboard, CastlingRights, CastlingSide, Color, Piece, Square};

/// Per-ply search/game state.
#[derive(Clone)]
pub(crate) struct StateInfo {
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub plies_from_null: u32,
    pub captured: Option<Piece>,
    pub king_sq: [Square; 2],
    pub hash: u64,
    /// Enemy pieces giving check to the side to move
    pub checkers: Bitboard,
    /// `blockers[c]`: pieces of either color shielding the king of `c`
    /// from an enemy slider
    pub blockers: [Bitboard; 2],
    /// `pinners[c]`: sliders of color `c` pinning a piece against the
    /// enemy king
    pub pinners: [Bitboard; 2],
    /// `xrayers[c]`: sliders of color `c` aligned with the enemy king,
    /// whatever stands between
    pub xrayers: [Bitboard; 2],
    /// `check_squares[pt]`: squares from which a piece of type `pt` of the
    /// side to move would check the enemy king
    pub check_squares: [Bitboard; 6],
    /// Material in centipawns per color
    pub material: [i32; 2],
    /// Material excluding pawns, per color (zugzwang guard)
    pub non_pawn_material: [i32; 2],
    /// Static evaluation cache for this ply; `None` while in check
    pub eval: Option<i32>,
    pub accumulator: Accumulator,
}

impl Default for StateInfo {
    fn default() -> Self {
        StateInfo {
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 0,
            plies_from_null: 0,
            captured: None,
            king_sq: [Square::E1, Square::E8],
            hash: 0,
            checkers: Bitboard::EMPTY,
            blockers: [Bitboard::EMPTY; 2],
            pinners: [Bitboard::EMPTY; 2],
            xrayers: [Bitboard::EMPTY; 2],
            check_squares: [Bitboard::EMPTY; 6],
            material: [0; 2],
            non_pawn_material: [0; 2],
            eval: None,
            accumulator: Accumulator::new(),
        }
    }
}

/// A chess position: bitboards, mailbox, side to move and the state stack.
#[derive(Clone)]
pub struct Position {
    pub(crate) piece_bb: [Bitboard; 6],
    pub(crate) color_bb: [Bitboard; 2],
    pub(crate) all_bb: Bitboard,
    pub(crate) mailbox: [Option<Piece>; 64],
    pub(crate) stm: Color,
    pub(crate) fullmove: u32,
    pub(crate) chess960: bool,
    /// Rook start square per castling right (WK, WQ, BK, BQ)
    pub(crate) castle_rook: [Option<Square>; 4],
    /// Squares that must be empty for each right, king and rook excluded
    pub(crate) castle_path: [Bitboard; 4],
    pub(crate) states: Vec<StateInfo>,
    pub(crate) ply: usize,
    pub(crate) nnue: Option<Arc<NnueNetwork>>,
}

impl Position {
    /// The standard starting position.
    #[must_use]
    pub fn new() -> Self {
        Self::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("startpos FEN is valid")
    }

    pub(crate) fn empty() -> Self {
        Position {
            piece_bb: [Bitboard::EMPTY; 6],
            color_bb: [Bitboard::EMPTY; 2],
            all_bb: Bitboard::EMPTY,
            mailbox: [None; 64],
            stm: Color::White,
            fullmove: 1,
            chess960: false,
            castle_rook: [None; 4],
            castle_path: [Bitboard::EMPTY; 4],
            states: vec![StateInfo::default(); MAX_GAME_PLY],
            ply: 0,
            nnue: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub(crate) fn state(&self) -> &StateInfo {
        &self.states[self.ply]
    }

    #[inline]
    pub(crate) fn state_mut(&mut self) -> &mut StateInfo {
        &mut self.states[self.ply]
    }

    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.stm
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.state().hash
    }

    #[inline]
    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.state().halfmove_clock
    }

    #[inline]
    #[must_use]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove
    }

    #[inline]
    #[must_use]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn set_chess960(&mut self, enabled: bool) {
        self.chess960 = enabled;
    }

    /// Game ply since position setup
    #[inline]
    #[must_use]
    pub fn game_ply(&self) -> usize {
        self.ply
    }

    #[inline]
    #[must_use]
    pub fn occupied(&self) -> Bitboard {
        self.all_bb
    }

    #[inline]
    pub(crate) fn pieces(&self, piece: Piece) -> Bitboard {
        self.piece_bb[piece.index()]
    }

    #[inline]
    pub(crate) fn pieces_of(&self, color: Color, piece: Piece) -> Bitboard {
        self.piece_bb[piece.index()] & self.color_bb[color.index()]
    }

    #[inline]
    pub(crate) fn color(&self, color: Color) -> Bitboard {
        self.color_bb[color.index()]
    }

    /// The piece type on a square
    #[inline]
    #[must_use]
    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.mailbox[sq.index()]
    }

    /// The color of the piece on a square
    #[inline]
    #[must_use]
    pub fn color_on(&self, sq: Square) -> Option<Color> {
        if self.color_bb[0].contains(sq) {
            Some(Color::White)
        } else if self.color_bb[1].contains(sq) {
            Some(Color::Black)
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn king_square(&self, color: Color) -> Square {
        self.state().king_sq[color.index()]
    }

    #[inline]
    #[must_use]
    pub fn en_passant_square(&self) -> Option<Square> {
        self.state().en_passant
    }

    #[inline]
    #[must_use]
    pub fn castling_rights(&self) -> CastlingRights {
        self.state().castling
    }

    /// Enemy pieces currently giving check
    #[inline]
    #[must_use]
    pub fn checkers(&self) -> Bitboard {
        self.state().checkers
    }

    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        !self.state().checkers.is_empty()
    }

    /// Material balance from the side to move's point of view
    #[inline]
    #[must_use]
    pub fn material_balance(&self) -> i32 {
        let st = self.state();
        st.material[self.stm.index()] - st.material[(!self.stm).index()]
    }

    #[inline]
    pub(crate) fn non_pawn_material(&self, color: Color) -> i32 {
        self.state().non_pawn_material[color.index()]
    }

    /// Attach (or detach) the evaluation network; the accumulators are
    /// rebuilt lazily on the next evaluation.
    pub fn set_network(&mut self, nnue: Option<Arc<NnueNetwork>>) {
        self.nnue = nnue;
        let st = self.state_mut();
        st.accumulator.computed = [false; 2];
    }

    // =========================================================================
    // Board surgery
    // =========================================================================

    #[inline]
    pub(crate) fn set_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bit = Bitboard::from_square(sq);
        self.piece_bb[piece.index()] |= bit;
        self.color_bb[color.index()] |= bit;
        self.all_bb |= bit;
        self.mailbox[sq.index()] = Some(piece);
    }

    #[inline]
    pub(crate) fn remove_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        let bit = Bitboard::from_square(sq);
        self.piece_bb[piece.index()] ^= bit;
        self.color_bb[color.index()] ^= bit;
        self.all_bb ^= bit;
        self.mailbox[sq.index()] = None;
    }

    #[inline]
    pub(crate) fn move_piece(&mut self, from: Square, to: Square, color: Color, piece: Piece) {
        let bits = Bitboard::from_square(from) | Bitboard::from_square(to);
        self.piece_bb[piece.index()] ^= bits;
        self.color_bb[color.index()] ^= bits;
        self.all_bb ^= bits;
        self.mailbox[from.index()] = None;
        self.mailbox[to.index()] = Some(piece);
    }

    // =========================================================================
    // Attacks and check information
    // =========================================================================

    /// All pieces of both colors attacking `sq` under the given occupancy.
    #[must_use]
    pub(crate) fn attackers_to(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        let rook_like = self.pieces(Piece::Rook) | self.pieces(Piece::Queen);
        let bishop_like = self.pieces(Piece::Bishop) | self.pieces(Piece::Queen);

        (pawn_attacks(Color::White, sq) & self.pieces_of(Color::Black, Piece::Pawn))
            | (pawn_attacks(Color::Black, sq) & self.pieces_of(Color::White, Piece::Pawn))
            | (knight_attacks(sq) & self.pieces(Piece::Knight))
            | (king_attacks(sq) & self.pieces(Piece::King))
            | (rook_attacks(sq, occupied) & rook_like)
            | (bishop_attacks(sq, occupied) & bishop_like)
    }

    /// True when `color` attacks `sq` under the given occupancy.
    #[inline]
    pub(crate) fn attacked_by(&self, sq: Square, color: Color, occupied: Bitboard) -> bool {
        !(self.attackers_to(sq, occupied) & self.color_bb[color.index()]).is_empty()
    }

    /// Recompute checkers, blockers, pinners, xrayers and check squares for
    /// the current state. Called after every make and at setup.
    pub(crate) fn update_check_info(&mut self) {
        let us = self.stm;
        let them = !us;
        let occupied = self.all_bb;
        let king_sq = self.state().king_sq;

        let checkers = self.attackers_to(king_sq[us.index()], occupied) & self.color_bb[them.index()];

        let mut blockers = [Bitboard::EMPTY; 2];
        let mut pinners = [Bitboard::EMPTY; 2];
        let mut xrayers = [Bitboard::EMPTY; 2];

        for color in [Color::White, Color::Black] {
            let ksq = king_sq[color.index()];
            let enemy = !color;
            let rook_like = self.pieces_of(enemy, Piece::Rook) | self.pieces_of(enemy, Piece::Queen);
            let bishop_like =
                self.pieces_of(enemy, Piece::Bishop) | self.pieces_of(enemy, Piece::Queen);
            let snipers = (rook_attacks(ksq, Bitboard::EMPTY) & rook_like)
                | (bishop_attacks(ksq, Bitboard::EMPTY) & bishop_like);
            xrayers[enemy.index()] |= snipers;

            for sniper in snipers.iter() {
                let blocking = between(ksq, sniper) & occupied;
                if blocking.is_single() {
                    blockers[color.index()] |= blocking;
                    if !(blocking & self.color_bb[color.index()]).is_empty() {
                        pinners[enemy.index()] |= Bitboard::from_square(sniper);
                    }
                }
            }
        }

        let enemy_king = king_sq[them.index()];
        let mut check_squares = [Bitboard::EMPTY; 6];
        check_squares[Piece::Pawn.index()] = pawn_attacks(them, enemy_king);
        check_squares[Piece::Knight.index()] = knight_attacks(enemy_king);
        check_squares[Piece::Bishop.index()] = bishop_attacks(enemy_king, occupied);
        check_squares[Piece::Rook.index()] = rook_attacks(enemy_king, occupied);
        check_squares[Piece::Queen.index()] =
            check_squares[Piece::Bishop.index()] | check_squares[Piece::Rook.index()];

        let st = self.state_mut();
        st.checkers = checkers;
        st.blockers = blockers;
        st.pinners = pinners;
        st.xrayers = xrayers;
        st.check_squares = check_squares;
    }

    // =========================================================================
    // Castling geometry
    // =========================================================================

    #[inline]
    pub(crate) fn castling_rook_square(&self, color: Color, side: CastlingSide) -> Option<Square> {
        self.castle_rook[right_index(color, side)]
    }

    /// King destination for a castle of `side` (g- or c-file on the back rank)
    #[inline]
    pub(crate) fn castle_king_to(color: Color, side: CastlingSide) -> Square {
        let rank = if color == Color::White { 0 } else { 7 };
        match side {
            CastlingSide::King => Square::new(rank, 6),
            CastlingSide::Queen => Square::new(rank, 2),
        }
    }

    /// Rook destination for a castle of `side` (f- or d-file on the back rank)
    #[inline]
    pub(crate) fn castle_rook_to(color: Color, side: CastlingSide) -> Square {
        let rank = if color == Color::White { 0 } else { 7 };
        match side {
            CastlingSide::King => Square::new(rank, 5),
            CastlingSide::Queen => Square::new(rank, 3),
        }
    }

    /// Recompute the must-be-empty path mask for one castling right.
    /// Covers every square the king or rook crosses, excluding both pieces'
    /// own start squares.
    pub(crate) fn compute_castle_path(
        &self,
        color: Color,
        side: CastlingSide,
        king_from: Square,
        rook_from: Square,
    ) -> Bitboard {
        let king_to = Self::castle_king_to(color, side);
        let rook_to = Self::castle_rook_to(color, side);
        let span = (between(king_from, king_to) | Bitboard::from_square(king_to))
            | (between(rook_from, rook_to) | Bitboard::from_square(rook_to));
        span & !Bitboard::from_square(king_from) & !Bitboard::from_square(rook_from)
    }

    // =========================================================================
    // Draw detection
    // =========================================================================

    /// Repetition check by scanning hashes backward in steps of two, bounded
    /// by the halfmove clock and the last null move. A single prior
    /// occurrence inside the search tree (after `root_ply`) counts; outside
    /// it, two are required.
    #[must_use]
    pub(crate) fn is_repetition(&self, root_ply: usize) -> bool {
        let st = self.state();
        let span = st.halfmove_clock.min(st.plies_from_null) as usize;
        let mut count = 0;
        let mut back = 4;
        while back <= span && back <= self.ply {
            let idx = self.ply - back;
            if self.states[idx].hash == st.hash {
                if idx >= root_ply {
                    return true;
                }
                count += 1;
                if count >= 2 {
                    return true;
                }
            }
            back += 2;
        }
        false
    }

    /// Threefold repetition as seen from the game history.
    #[must_use]
    pub fn is_threefold_repetition(&self) -> bool {
        let st = self.state();
        let span = st.halfmove_clock.min(st.plies_from_null) as usize;
        let mut count = 0;
        let mut back = 4;
        while back <= span && back <= self.ply {
            if self.states[self.ply - back].hash == st.hash {
                count += 1;
                if count >= 2 {
                    return true;
                }
            }
            back += 2;
        }
        false
    }

    /// Kings alone, or at most one minor per side with no pawns, rooks or
    /// queens on the board.
    #[must_use]
    pub fn is_insufficient_material(&self) -> bool {
        let heavy = self.pieces(Piece::Pawn) | self.pieces(Piece::Rook) | self.pieces(Piece::Queen);
        if !heavy.is_empty() {
            return false;
        }
        let minors = self.pieces(Piece::Knight) | self.pieces(Piece::Bishop);
        (minors & self.color_bb[0]).popcount() <= 1 && (minors & self.color_bb[1]).popcount() <= 1
    }

    /// Draw by rule, as seen from the game history (50-move rule, threefold
    /// repetition, insufficient material).
    #[must_use]
    pub fn is_draw(&self) -> bool {
        self.state().halfmove_clock >= 100
            || self.is_threefold_repetition()
            || self.is_insufficient_material()
    }

    /// Draw test used inside the search tree, where a single repetition
    /// after the search root already scores as a draw.
    #[must_use]
    pub(crate) fn is_search_draw(&self, root_ply: usize) -> bool {
        self.state().halfmove_clock >= 100
            || self.is_repetition(root_ply)
            || self.is_insufficient_material()
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::new()
    }
}
