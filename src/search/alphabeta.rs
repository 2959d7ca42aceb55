//! The interior alpha-beta search.

use std::sync::LazyLock;

use crate::board::{GenType, Move, MoveList, Piece, MAX_PLY};
use crate::tt::Bound;

use super::constants::{
    history_bonus, mated_in, LMR_TABLE_MAX_DEPTH, LMR_TABLE_MAX_IDX, MATE_BOUND, SCORE_DRAW,
    SCORE_INFINITE, SCORE_MATE, SCORE_NONE,
};
use super::move_order::{capture_victim, score_moves};
use super::SearchContext;

/// Log-based late-move reduction table indexed by depth and move number.
static LMR_TABLE: LazyLock<[[i32; LMR_TABLE_MAX_IDX]; LMR_TABLE_MAX_DEPTH]> = LazyLock::new(|| {
    let mut table = [[0i32; LMR_TABLE_MAX_IDX]; LMR_TABLE_MAX_DEPTH];
    for (depth, row) in table.iter_mut().enumerate().skip(1) {
        for (idx, cell) in row.iter_mut().enumerate().skip(1) {
            let value = 0.8 + (depth as f64).ln() * (idx as f64).ln() / 2.4;
            *cell = value as i32;
        }
    }
    table
});

#[inline]
fn lmr_base(depth: i32, move_number: usize) -> i32 {
    let d = (depth as usize).min(LMR_TABLE_MAX_DEPTH - 1);
    let i = move_number.min(LMR_TABLE_MAX_IDX - 1);
    LMR_TABLE[d][i]
}

impl SearchContext<'_> {
    /// Principal variation search for interior nodes. `depth <= 0` falls
    /// into quiescence. PV-ness is carried by the window: `beta - alpha > 1`
    /// marks a PV node.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn alphabeta(
        &mut self,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        cut_node: bool,
    ) -> i32 {
        if depth <= 0 {
            return self.qsearch(alpha, beta, 0);
        }

        self.visit_node();
        if self.should_stop() {
            return SCORE_DRAW;
        }

        let ply = self.ply();
        let pv_node = beta - alpha > 1;
        if pv_node {
            self.pv.clear(ply);
            if ply as u32 + 1 > self.seldepth {
                self.seldepth = ply as u32 + 1;
            }
        }

        if self.pos.is_search_draw(self.root_ply) {
            return SCORE_DRAW;
        }
        if ply >= MAX_PLY - 1 {
            return self.pos.evaluate();
        }

        // Mate distance pruning: no line from here can beat an already
        // proven shorter mate
        alpha = alpha.max(mated_in(ply));
        beta = beta.min(SCORE_MATE - ply as i32 - 1);
        if alpha >= beta {
            return alpha;
        }

        // Endgame tablebases, when the caller provided a probe
        if let Some(tb) = &self.tablebases {
            if let Some((_, score)) = tb.probe(&self.pos) {
                return score;
            }
        }

        let in_check = self.pos.in_check();

        // Transposition table probe. An exact entry cuts even at a PV node
        // once its score sits inside the window; bound entries only cut
        // non-PV nodes.
        let tt_probe = self.tt.probe(self.pos.hash(), ply);
        let tt_move = if tt_probe.hit { tt_probe.mv } else { Move::NONE };
        if tt_probe.hit && tt_probe.depth as i32 >= depth {
            let cutoff = match tt_probe.bound {
                Bound::Exact => {
                    !pv_node || (tt_probe.score > alpha && tt_probe.score < beta)
                }
                Bound::Lower => !pv_node && tt_probe.score >= beta,
                Bound::Upper => !pv_node && tt_probe.score <= alpha,
                Bound::Invalid => false,
            };
            if cutoff {
                return tt_probe.score;
            }
        }

        // Static evaluation; treated as absent while in check
        let eval = if in_check {
            self.pos.state_mut().eval = None;
            SCORE_NONE
        } else {
            let eval = if tt_probe.hit && tt_probe.eval != SCORE_NONE {
                tt_probe.eval
            } else {
                self.pos.evaluate()
            };
            self.pos.state_mut().eval = Some(eval);
            eval
        };

        let improving = !in_check && self.improving(eval);

        // ====================================================================
        // Node-level pruning
        // ====================================================================
        if !pv_node && !in_check && eval != SCORE_NONE {
            // Reverse futility: far enough above beta that a real search
            // is unlikely to fall back under it
            if depth <= self.params.rfp_max_depth
                && eval - self.rfp_margin(depth, improving) >= beta
                && eval.abs() < MATE_BOUND
            {
                return beta;
            }

            // Razoring: hopeless static eval drops straight into quiescence
            if depth <= self.params.razor_max_depth
                && eval + self.params.razor_margin * depth <= alpha
            {
                let score = self.qsearch(alpha, beta, 0);
                if score <= alpha {
                    return score;
                }
            }

            // Null move: hand over the move and search reduced; zugzwang is
            // guarded by the non-pawn-material condition
            if depth >= self.params.nmp_min_depth
                && eval >= beta
                && self.pos.state().plies_from_null > 0
                && self.pos.non_pawn_material(self.pos.side_to_move()) > 0
            {
                let reduction = self.params.nmp_base_reduction + depth / 3;
                self.pos.make_null_move();
                let score = -self.alphabeta(depth - reduction, -beta, -beta + 1, !cut_node);
                self.pos.unmake_null_move();

                if self.should_stop() {
                    return SCORE_DRAW;
                }
                if score >= beta {
                    return beta;
                }
            }
        }

        // Internal iterative deepening: a PV node without a table move
        // searches shallower first rather than stumble through bad ordering
        let depth = if pv_node && tt_move.is_none() && depth >= 4 {
            depth - 1
        } else {
            depth
        };

        // ====================================================================
        // Move loop
        // ====================================================================
        let mut pseudo = MoveList::new();
        self.pos.generate(
            if in_check {
                GenType::Evasions
            } else {
                GenType::NonEvasions
            },
            &mut pseudo,
        );
        let killers = (self.killers.primary(ply), self.killers.secondary(ply));
        let mut scored = score_moves(
            &self.pos,
            &pseudo,
            tt_move,
            killers,
            &self.history,
            &self.capture_history,
        );

        let mut best_score = -SCORE_INFINITE;
        let mut best_move = Move::NONE;
        let mut raised_alpha = false;
        let mut move_count = 0usize;
        let mut quiet_count = 0usize;
        let mut quiets_tried = [Move::NONE; 64];
        let mut captures_tried = [Move::NONE; 32];
        let mut captures_count = 0usize;

        let mut idx = 0;
        while let Some(scored_move) = scored.pick_best(idx) {
            idx += 1;
            let mv = scored_move.mv;
            if !self.pos.is_legal(mv) {
                continue;
            }

            let is_quiet = capture_victim(&self.pos, mv).is_none() && !mv.is_promotion();

            if is_quiet && !pv_node && !in_check && best_score > -MATE_BOUND {
                // Late move pruning: enough quiets have been tried
                if depth <= self.params.lmp_max_depth
                    && quiet_count >= self.params.lmp_threshold(depth, improving)
                {
                    continue;
                }
                // Futility: eval so far below alpha that a quiet move
                // cannot repair it
                if depth <= self.params.futility_max_depth
                    && eval != SCORE_NONE
                    && eval + self.params.futility_margin * depth < alpha
                {
                    continue;
                }
            }

            let mover = self.pos.piece_on(mv.from()).expect("mover exists");
            self.pos.make_move(mv);
            let gives_check = self.pos.in_check();
            move_count += 1;

            if is_quiet {
                if quiet_count < quiets_tried.len() {
                    quiets_tried[quiet_count] = mv;
                }
                quiet_count += 1;
            } else if captures_count < captures_tried.len() {
                captures_tried[captures_count] = mv;
                captures_count += 1;
            }

            let extension = i32::from(gives_check);
            let new_depth = depth - 1 + extension;

            let mut score;
            if move_count == 1 {
                score = -self.alphabeta(new_depth, -beta, -alpha, false);
            } else {
                // Late move reductions with a null window, re-searching on
                // improvement
                let mut reduction = 1;
                if depth >= 3 && move_count >= 2 + usize::from(pv_node) && is_quiet {
                    let mut r = lmr_base(depth, move_count) + 1;
                    if pv_node {
                        r -= 1;
                    }
                    if mv == tt_move {
                        r -= 1;
                    }
                    if gives_check && depth >= 6 {
                        r -= 1;
                    }
                    if in_check && mover == Piece::King {
                        r -= 1;
                    }
                    if !improving {
                        r += 1;
                    }
                    reduction = r.clamp(1, (depth - 1).max(1));
                }

                score = -self.alphabeta(new_depth - (reduction - 1), -alpha - 1, -alpha, true);

                if score > alpha && reduction > 1 {
                    score = -self.alphabeta(new_depth, -alpha - 1, -alpha, !cut_node);
                }
                if pv_node && score > alpha && score < beta {
                    score = -self.alphabeta(new_depth, -beta, -alpha, false);
                }
            }

            self.pos.unmake_move(mv);

            if self.should_stop() {
                return SCORE_DRAW;
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
                if score > alpha {
                    if pv_node {
                        self.pv.update(ply, mv);
                    }
                    if score >= beta {
                        break;
                    }
                    alpha = score;
                    raised_alpha = true;
                }
            }
        }

        if move_count == 0 {
            return if in_check { mated_in(ply) } else { SCORE_DRAW };
        }

        if best_score >= beta {
            self.update_stats(
                best_move,
                depth as u32,
                ply,
                &quiets_tried[..quiet_count.min(quiets_tried.len())],
                &captures_tried[..captures_count],
            );
        }

        let bound = if best_score >= beta {
            Bound::Lower
        } else if pv_node && raised_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        if !self.stopped {
            self.tt.store(
                &tt_probe,
                self.pos.hash(),
                best_move,
                best_score,
                if in_check { SCORE_NONE } else { eval },
                depth as u32,
                bound,
                pv_node,
                ply,
            );
        }

        best_score
    }

    /// Reverse futility margin, smaller when the eval trend is improving.
    #[inline]
    fn rfp_margin(&self, depth: i32, improving: bool) -> i32 {
        self.params.rfp_margin * depth - if improving { self.params.rfp_margin / 2 } else { 0 }
    }

    /// Eval trend against the position two plies up the stack.
    #[inline]
    fn improving(&self, eval: i32) -> bool {
        let game_ply = self.pos.game_ply();
        if game_ply < self.root_ply + 2 {
            return true;
        }
        match self.pos.states[game_ply - 2].eval {
            Some(prior) => eval > prior,
            None => true,
        }
    }

    /// On a fail-high: killer slot for the cutoff quiet, a positive history
    /// bonus for the cutoff move and penalties for every earlier move of
    /// the same kind that failed to cut.
    fn update_stats(
        &mut self,
        cutoff: Move,
        depth: u32,
        ply: usize,
        quiets: &[Move],
        captures: &[Move],
    ) {
        let bonus = history_bonus(depth);
        let us = self.pos.side_to_move();

        if let Some(victim) = capture_victim(&self.pos, cutoff) {
            let attacker = self.pos.piece_on(cutoff.from()).expect("mover exists");
            self.capture_history
                .update(attacker, cutoff.to(), victim, bonus);
        } else if !cutoff.is_promotion() {
            self.killers.update(ply, cutoff);
            self.history.update(us, cutoff, bonus);
        }

        for &mv in quiets {
            if mv != cutoff {
                self.history.update(us, mv, -bonus);
            }
        }
        for &mv in captures {
            if mv == cutoff {
                continue;
            }
            if let Some(victim) = capture_victim(&self.pos, mv) {
                let attacker = self.pos.piece_on(mv.from()).expect("mover exists");
                self.capture_history.update(attacker, mv.to(), victim, -bonus);
            }
        }
    }
}
