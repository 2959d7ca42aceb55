//! Iterative deepening, aspiration windows and the root move loop.

use crate::board::{Move, MAX_PLY};

use super::constants::{MATE_BOUND, SCORE_INFINITE, SCORE_MATE};
use super::{InfoCallback, RootMove, SearchContext, SearchInfo, SearchLimits};

/// Outcome of one thread's deepening loop.
#[derive(Debug, Clone)]
pub(crate) struct SearchReport {
    pub thread_id: usize,
    pub best_move: Move,
    pub ponder: Option<Move>,
    pub score: i32,
    /// Deepest fully completed iteration
    pub depth: u32,
}

impl SearchContext<'_> {
    /// Iterative deepening over the root move list. Helpers get a slightly
    /// widened aspiration window from their thread id so they explore
    /// different orderings.
    pub(crate) fn iterative_deepening(
        &mut self,
        limits: &SearchLimits,
        multi_pv: u32,
        info: Option<&InfoCallback>,
    ) -> SearchReport {
        self.root_moves = self
            .pos
            .legal_moves()
            .iter()
            .map(|&mv| RootMove {
                mv,
                score: -SCORE_INFINITE,
                prev_score: -SCORE_INFINITE,
            })
            .collect();

        let mut report = SearchReport {
            thread_id: self.thread_id,
            best_move: self.root_moves.first().map_or(Move::NONE, |rm| rm.mv),
            ponder: None,
            score: -SCORE_INFINITE,
            depth: 0,
        };
        if self.root_moves.is_empty() {
            // Checkmated or stalemated at the root
            report.score = if self.pos.in_check() {
                super::constants::mated_in(0)
            } else {
                super::constants::SCORE_DRAW
            };
            return report;
        }

        let max_depth = limits
            .depth
            .unwrap_or(MAX_PLY as u32 - 1)
            .clamp(1, MAX_PLY as u32 - 1);
        let lines = multi_pv.min(self.root_moves.len() as u32).max(1);
        let jitter = (self.thread_id as i32 % 4) * 6;

        let mut stability = 0u32;
        let mut last_best = report.best_move;

        for depth in 1..=max_depth {
            self.seldepth = 0;
            for rm in &mut self.root_moves {
                rm.prev_score = rm.score;
            }

            let mut depth_complete = true;
            for pv_index in 0..lines {
                let prev = self.root_moves[pv_index as usize].prev_score;

                // Aspiration window around the previous score; a fail on
                // either side re-searches with the full window
                let (mut alpha, mut beta) = if depth >= 2 && prev.abs() < MATE_BOUND {
                    let width =
                        self.params.aspiration_base + depth as i32 * self.params.aspiration_slope;
                    (prev - width - jitter, prev + width + jitter)
                } else {
                    (-SCORE_INFINITE, SCORE_INFINITE)
                };

                let first = pv_index as usize;
                loop {
                    let (score, best_idx) = self.root_search(depth as i32, alpha, beta, first);
                    if self.should_stop() {
                        depth_complete = false;
                        break;
                    }
                    if score <= alpha || score >= beta {
                        alpha = -SCORE_INFINITE;
                        beta = SCORE_INFINITE;
                        continue;
                    }
                    // Settle this line, then order the tail for the next
                    // iteration
                    self.root_moves.swap(first, best_idx);
                    self.root_moves[first + 1..]
                        .sort_by_key(|rm| std::cmp::Reverse(rm.score));
                    break;
                }
                if !depth_complete {
                    break;
                }

                if let Some(cb) = info {
                    self.report_line(cb, depth, pv_index + 1);
                }
            }

            if !depth_complete {
                break;
            }

            report.best_move = self.root_moves[0].mv;
            report.score = self.root_moves[0].score;
            report.depth = depth;
            report.ponder = self.pv.line(0).get(1).copied();

            if report.best_move == last_best {
                stability += 1;
            } else {
                stability = 0;
            }
            last_best = report.best_move;

            // A proven mate shorter than the horizon cannot change
            if report.score.abs() >= MATE_BOUND
                && SCORE_MATE - report.score.abs() <= depth as i32
            {
                break;
            }
            if let Some(tm) = self.time {
                if tm.soft_stop(stability) {
                    break;
                }
            }
            if self.should_stop() {
                break;
            }
        }

        self.flush_nodes();
        report
    }

    /// Search the root moves from `first` onward; earlier entries are lines
    /// already settled by MultiPV. Returns the best score and the index of
    /// the move that produced it.
    fn root_search(&mut self, depth: i32, mut alpha: i32, beta: i32, first: usize) -> (i32, usize) {
        let ply = 0;
        self.pv.clear(ply);
        let mut best_score = -SCORE_INFINITE;
        let mut best_idx = first;

        for i in first..self.root_moves.len() {
            let mv = self.root_moves[i].mv;
            self.pos.make_move(mv);

            let mut score;
            if i == first {
                score = -self.alphabeta(depth - 1, -beta, -alpha, false);
            } else {
                score = -self.alphabeta(depth - 1, -alpha - 1, -alpha, true);
                if score > alpha && score < beta {
                    score = -self.alphabeta(depth - 1, -beta, -alpha, false);
                }
            }

            self.pos.unmake_move(mv);
            if self.should_stop() {
                return (best_score, best_idx);
            }

            self.root_moves[i].score = score;

            if score > best_score {
                best_score = score;
                best_idx = i;
                if score > alpha {
                    self.pv.update(ply, mv);
                    if score >= beta {
                        break;
                    }
                    alpha = score;
                }
            }
        }

        (best_score, best_idx)
    }

    fn report_line(&mut self, cb: &InfoCallback, depth: u32, multipv: u32) {
        self.flush_nodes();
        let score = self.root_moves[(multipv - 1) as usize].score;
        let mate_in = if score.abs() < MATE_BOUND {
            None
        } else if score > 0 {
            Some((SCORE_MATE - score + 1) / 2)
        } else {
            Some(-(SCORE_MATE + score + 1) / 2)
        };

        let nodes = self
            .shared_nodes
            .load(std::sync::atomic::Ordering::Relaxed);
        let elapsed = self.time.map_or(0, |tm| tm.elapsed().as_millis() as u64);
        let nps = if elapsed > 0 { nodes * 1000 / elapsed } else { 0 };

        let pv: Vec<Move> = if multipv == 1 && !self.pv.line(0).is_empty() {
            self.pv.line(0).to_vec()
        } else {
            vec![self.root_moves[(multipv - 1) as usize].mv]
        };

        let info = SearchInfo {
            depth,
            seldepth: self.seldepth,
            multipv,
            score,
            mate_in,
            nodes,
            nps,
            time_ms: elapsed,
            hashfull: self.tt.hashfull_per_mille(),
            pv,
        };
        (**cb)(&info);
    }
}
