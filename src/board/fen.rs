//! FEN parsing and formatting.

use std::str::FromStr;

use crate::board::attack_tables::pawn_attacks;
use crate::zobrist;

use super::error::{FenError, MoveParseError};
use super::types::{file_to_index, rank_to_index, right_index};
use super::{
    Bitboard, CastlingSide, Color, Move, MoveKind, Piece, Position, Square,
};

impl Position {
    /// Parse a position from FEN notation.
    ///
    /// Castling rights accept both the conventional `KQkq` letters and
    /// Shredder-FEN file letters (`HAha`) for Fischer-random positions.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut pos = Position::empty();
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if parts.len() < 4 {
            return Err(FenError::TooFewParts { found: parts.len() });
        }

        // Piece placement
        for (rank_idx, rank_str) in parts[0].split('/').enumerate() {
            if rank_idx >= 8 {
                return Err(FenError::InvalidRank { rank: rank_idx });
            }
            let mut file = 0;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let color = if c.is_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    if file >= 8 {
                        return Err(FenError::TooManyFiles {
                            rank: rank_idx,
                            files: file + 1,
                        });
                    }
                    pos.set_piece(Square::new(7 - rank_idx, file), color, piece);
                    file += 1;
                }
            }
        }

        for (color, name) in [(Color::White, "White"), (Color::Black, "Black")] {
            let kings = pos.pieces_of(color, Piece::King).popcount();
            if kings != 1 {
                return Err(FenError::BadKingCount {
                    color: name,
                    found: kings,
                });
            }
        }
        let king_sq = [
            pos.pieces_of(Color::White, Piece::King).lsb(),
            pos.pieces_of(Color::Black, Piece::King).lsb(),
        ];

        // Side to move
        match parts[1] {
            "w" => pos.stm = Color::White,
            "b" => pos.stm = Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        }

        // Castling rights
        let mut castling = super::CastlingRights::none();
        for c in parts[2].chars() {
            if c == '-' {
                continue;
            }
            let color = if c.is_uppercase() {
                Color::White
            } else {
                Color::Black
            };
            let ksq = king_sq[color.index()];
            let back_rank = if color == Color::White { 0 } else { 7 };
            let rooks = pos.pieces_of(color, Piece::Rook) & Bitboard::rank_mask(back_rank);

            let rook_sq = match c.to_ascii_uppercase() {
                'K' => {
                    // Outermost rook on the king's right
                    let beyond = rooks
                        .iter()
                        .filter(|r| r.file() > ksq.file())
                        .max_by_key(|r| r.file());
                    beyond.ok_or(FenError::MissingCastlingRook { char: c })?
                }
                'Q' => {
                    let beyond = rooks
                        .iter()
                        .filter(|r| r.file() < ksq.file())
                        .min_by_key(|r| r.file());
                    beyond.ok_or(FenError::MissingCastlingRook { char: c })?
                }
                'A'..='H' => {
                    let file = c.to_ascii_uppercase() as usize - 'A' as usize;
                    let sq = Square::new(back_rank, file);
                    if !rooks.contains(sq) {
                        return Err(FenError::MissingCastlingRook { char: c });
                    }
                    sq
                }
                _ => return Err(FenError::InvalidCastling { char: c }),
            };

            let side = if rook_sq.file() > ksq.file() {
                CastlingSide::King
            } else {
                CastlingSide::Queen
            };
            castling.set(color, side);
            pos.castle_rook[right_index(color, side)] = Some(rook_sq);
            pos.castle_path[right_index(color, side)] =
                pos.compute_castle_path(color, side, ksq, rook_sq);
        }

        // En passant target: kept only when an enemy pawn can actually take
        let en_passant = if parts[3] == "-" {
            None
        } else {
            let sq = Square::from_str(parts[3]).map_err(|_| FenError::InvalidEnPassant {
                found: parts[3].to_string(),
            })?;
            let capturers = pawn_attacks(!pos.stm, sq) & pos.pieces_of(pos.stm, Piece::Pawn);
            if capturers.is_empty() {
                None
            } else {
                Some(sq)
            }
        };

        let halfmove_clock = parts.get(4).and_then(|p| p.parse().ok()).unwrap_or(0);
        pos.fullmove = parts.get(5).and_then(|p| p.parse().ok()).unwrap_or(1);

        let mut material = [0i32; 2];
        let mut non_pawn = [0i32; 2];
        for color in [Color::White, Color::Black] {
            for piece in Piece::ALL {
                if piece == Piece::King {
                    continue;
                }
                let count = pos.pieces_of(color, piece).popcount() as i32;
                material[color.index()] += count * piece.value();
                if piece != Piece::Pawn {
                    non_pawn[color.index()] += count * piece.value();
                }
            }
        }

        {
            let st = pos.state_mut();
            st.castling = castling;
            st.en_passant = en_passant;
            st.halfmove_clock = halfmove_clock;
            st.plies_from_null = halfmove_clock;
            st.king_sq = king_sq;
            st.material = material;
            st.non_pawn_material = non_pawn;
            st.accumulator.computed = [false; 2];
        }
        pos.states[0].hash = pos.compute_hash();
        pos.update_check_info();

        // The mover could capture the enemy king: illegal position
        let them = !pos.stm;
        if pos.attacked_by(pos.king_square(them), pos.stm, pos.all_bb) {
            return Err(FenError::OpponentInCheck);
        }

        Ok(pos)
    }

    /// Zobrist hash recomputed from scratch. Make/unmake maintain the same
    /// value incrementally.
    #[must_use]
    pub(crate) fn compute_hash(&self) -> u64 {
        let mut hash = 0u64;
        for sq_idx in 0..64 {
            let sq = Square::from_index(sq_idx);
            if let Some(piece) = self.piece_on(sq) {
                let color = self.color_on(sq).expect("occupied square has a color");
                hash ^= zobrist::piece_key(piece, color, sq);
            }
        }
        if self.stm == Color::Black {
            hash ^= zobrist::side_key();
        }
        let castling = self.state().castling;
        for color in [Color::White, Color::Black] {
            for side in CastlingSide::BOTH {
                if castling.has(color, side) {
                    hash ^= zobrist::castling_key(right_index(color, side));
                }
            }
        }
        if let Some(ep) = self.state().en_passant {
            hash ^= zobrist::en_passant_key(ep.file());
        }
        hash
    }

    /// Format the position as FEN.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut rows: Vec<String> = Vec::new();
        for rank in (0..8).rev() {
            let mut row = String::new();
            let mut empty = 0;
            for file in 0..8 {
                let sq = Square::new(rank, file);
                if let Some(piece) = self.piece_on(sq) {
                    if empty > 0 {
                        row.push_str(&empty.to_string());
                        empty = 0;
                    }
                    let color = self.color_on(sq).expect("occupied square has a color");
                    row.push(piece.to_fen_char(color));
                } else {
                    empty += 1;
                }
            }
            if empty > 0 {
                row.push_str(&empty.to_string());
            }
            rows.push(row);
        }

        let castling = self.state().castling;
        let mut rights = String::new();
        for (color, side, standard) in [
            (Color::White, CastlingSide::King, 'K'),
            (Color::White, CastlingSide::Queen, 'Q'),
            (Color::Black, CastlingSide::King, 'k'),
            (Color::Black, CastlingSide::Queen, 'q'),
        ] {
            if castling.has(color, side) {
                if self.chess960 {
                    let rook = self.castle_rook[right_index(color, side)]
                        .expect("right implies rook square");
                    let letter = (b'A' + rook.file() as u8) as char;
                    rights.push(if color == Color::White {
                        letter
                    } else {
                        letter.to_ascii_lowercase()
                    });
                } else {
                    rights.push(standard);
                }
            }
        }
        if rights.is_empty() {
            rights.push('-');
        }

        let ep = self
            .state()
            .en_passant
            .map_or_else(|| "-".to_string(), |sq| sq.to_string());

        format!(
            "{} {} {} {} {} {}",
            rows.join("/"),
            if self.stm == Color::White { "w" } else { "b" },
            rights,
            ep,
            self.state().halfmove_clock,
            self.fullmove
        )
    }

    /// Parse a move in UCI long algebraic notation and resolve it against
    /// the legal moves of this position.
    pub fn parse_move(&self, uci: &str) -> Result<Move, MoveParseError> {
        if uci.len() < 4 || uci.len() > 5 {
            return Err(MoveParseError::InvalidLength { len: uci.len() });
        }

        let chars: Vec<char> = uci.chars().collect();
        if !('a'..='h').contains(&chars[0])
            || !('1'..='8').contains(&chars[1])
            || !('a'..='h').contains(&chars[2])
            || !('1'..='8').contains(&chars[3])
        {
            return Err(MoveParseError::InvalidSquare {
                notation: uci.to_string(),
            });
        }

        let from = Square::new(rank_to_index(chars[1]), file_to_index(chars[0]));
        let to = Square::new(rank_to_index(chars[3]), file_to_index(chars[2]));

        let promotion = if uci.len() == 5 {
            let piece = Piece::from_char(chars[4]).ok_or(MoveParseError::InvalidPromotion {
                char: chars[4],
            })?;
            if matches!(piece, Piece::Pawn | Piece::King) {
                return Err(MoveParseError::InvalidPromotion { char: chars[4] });
            }
            Some(piece)
        } else {
            None
        };

        for mv in &self.legal_moves() {
            if mv.from() != from || mv.promotion_piece() != promotion {
                continue;
            }
            // Castling matches either spelling: king-to-rook or the
            // standard two-square king hop.
            let matches = if mv.kind() == MoveKind::Castle {
                let side = if mv.to().file() > mv.from().file() {
                    CastlingSide::King
                } else {
                    CastlingSide::Queen
                };
                mv.to() == to || Self::castle_king_to(self.stm, side) == to
            } else {
                mv.to() == to
            };
            if matches {
                return Ok(*mv);
            }
        }

        Err(MoveParseError::IllegalMove {
            notation: uci.to_string(),
        })
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_fen(s)
    }
}
