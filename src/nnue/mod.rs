//! NNUE (efficiently updatable neural network) evaluation.
//!
//! Architecture: a king-bucketed, horizontally mirrored 768-feature input
//! per perspective feeding a shared `(768 x buckets -> 256) x 2 -> 1`
//! transformer with squared clipped-ReLU activation and piece-count output
//! buckets. The accumulator pair lives in the position's state stack and is
//! updated incrementally as moves are made; a perspective whose king
//! changes bucket is marked stale and rebuilt lazily before evaluation.

pub mod network;
pub mod simd;

pub use network::{Accumulator, NetError, NnueNetwork, HIDDEN_SIZE};

use crate::board::{Color, Piece, Position, Square};

/// Feature weight quantization factor
pub const QA: i32 = 255;

/// Output weight quantization factor
pub const QB: i32 = 64;

/// Evaluation scale factor
pub const SCALE: i32 = 400;

/// Piece add/remove set of one move: at most two of each (castling moves
/// king and rook; a promotion capture removes pawn and victim).
pub(crate) struct FeatureDelta {
    adds: [(Color, Piece, Square); 2],
    n_add: usize,
    subs: [(Color, Piece, Square); 2],
    n_sub: usize,
}

impl FeatureDelta {
    pub(crate) fn new() -> Self {
        FeatureDelta {
            adds: [(Color::White, Piece::Pawn, Square::A1); 2],
            n_add: 0,
            subs: [(Color::White, Piece::Pawn, Square::A1); 2],
            n_sub: 0,
        }
    }

    #[inline]
    pub(crate) fn add(&mut self, color: Color, piece: Piece, sq: Square) {
        self.adds[self.n_add] = (color, piece, sq);
        self.n_add += 1;
    }

    #[inline]
    pub(crate) fn sub(&mut self, color: Color, piece: Piece, sq: Square) {
        self.subs[self.n_sub] = (color, piece, sq);
        self.n_sub += 1;
    }
}

impl Position {
    /// Apply a move's feature delta to the accumulator pair of the current
    /// state. A perspective whose king crossed a bucket or mirror boundary
    /// is marked stale instead; the opposite perspective still gets its
    /// deltas.
    pub(crate) fn apply_nnue_update(
        &mut self,
        delta: &FeatureDelta,
        king_move: Option<(Color, Square, Square)>,
    ) {
        let Some(net) = self.nnue.clone() else {
            self.state_mut().accumulator.computed = [false; 2];
            return;
        };

        for perspective in [Color::White, Color::Black] {
            let refresh = match king_move {
                Some((color, from, to)) if color == perspective => {
                    net.king_bucket_changed(perspective, from, to)
                }
                _ => false,
            };
            if refresh {
                self.state_mut().accumulator.computed[perspective.index()] = false;
                continue;
            }
            if !self.state().accumulator.computed[perspective.index()] {
                continue;
            }

            let ksq = self.king_square(perspective);
            let p_idx = perspective.index();
            for i in 0..delta.n_sub {
                let (color, piece, sq) = delta.subs[i];
                let feature = net.feature_index(perspective, ksq, color, piece, sq);
                let st = self.state_mut();
                simd::sub_weights(
                    &mut st.accumulator.values[p_idx],
                    &net.feature_weights[feature],
                );
            }
            for i in 0..delta.n_add {
                let (color, piece, sq) = delta.adds[i];
                let feature = net.feature_index(perspective, ksq, color, piece, sq);
                let st = self.state_mut();
                simd::add_weights(
                    &mut st.accumulator.values[p_idx],
                    &net.feature_weights[feature],
                );
            }
        }
    }

    /// Rebuild one perspective of the accumulator from scratch: bias plus
    /// the weights of every active feature.
    fn refresh_accumulator(&mut self, net: &NnueNetwork, perspective: Color) {
        let ksq = self.king_square(perspective);
        let mut features = [0usize; 32];
        let mut count = 0;
        for sq in self.occupied().iter() {
            let piece = self.piece_on(sq).expect("occupied square has a piece");
            let color = self.color_on(sq).expect("occupied square has a color");
            features[count] = net.feature_index(perspective, ksq, color, piece, sq);
            count += 1;
        }

        let p_idx = perspective.index();
        let st = self.state_mut();
        st.accumulator.values[p_idx] = net.feature_bias;
        for &feature in &features[..count] {
            simd::add_weights(
                &mut st.accumulator.values[p_idx],
                &net.feature_weights[feature],
            );
        }
        st.accumulator.computed[p_idx] = true;
    }

    /// Static evaluation from the side to move's point of view.
    ///
    /// With a network loaded this is the NNUE forward pass over freshly
    /// ensured accumulators; without one the engine degrades to the
    /// incrementally maintained material balance.
    #[must_use]
    pub fn evaluate(&mut self) -> i32 {
        let Some(net) = self.nnue.clone() else {
            return self.material_balance();
        };

        for perspective in [Color::White, Color::Black] {
            if !self.state().accumulator.computed[perspective.index()] {
                self.refresh_accumulator(&net, perspective);
            }
        }

        let piece_count = self.occupied().popcount();
        net.evaluate(&self.state().accumulator, self.side_to_move(), piece_count)
    }
}
