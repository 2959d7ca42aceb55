//! Parallel search: one main thread plus helpers sharing the
//! transposition table, the stop flag and a node counter.
//!
//! Helpers run the same iterative deepening with jittered aspiration
//! windows so they explore different orderings and feed the table. The
//! main thread owns the clock; when it finishes it raises the stop flag
//! and the best result is chosen by a conservative, deterministic rule.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crate::board::{Move, Position};
use crate::tt::TranspositionTable;

use super::iterative::SearchReport;
use super::time::TimeManager;
use super::{InfoCallback, SearchContext, SearchLimits, SearchParams};

/// Search thread stack size; the recursion is deep in release builds.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Helpers within this margin of the best score lose ties to the main
/// thread.
const TIE_MARGIN: i32 = 20;

/// Final outcome of a search.
#[derive(Debug, Clone, Copy)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub ponder: Option<Move>,
    pub score: i32,
    pub depth: u32,
}

/// Pool-level knobs, set through UCI options.
#[derive(Clone)]
pub struct SearchSettings {
    pub threads: usize,
    pub multi_pv: u32,
    pub move_overhead_ms: u64,
    pub params: SearchParams,
    /// Optional endgame tablebase hook
    pub tablebases: Option<Arc<dyn super::TablebaseProbe>>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            threads: 1,
            multi_pv: 1,
            move_overhead_ms: 50,
            params: SearchParams::default(),
            tablebases: None,
        }
    }
}

/// Deepest completed depth wins; within it, the main thread keeps the
/// decision unless a helper beats it by more than the tie margin, and
/// exact ties go to the lowest thread id.
fn select_best(reports: &[SearchReport]) -> Option<&SearchReport> {
    let candidates: Vec<&SearchReport> = {
        let max_depth = reports
            .iter()
            .filter(|r| r.best_move.is_some())
            .map(|r| r.depth)
            .max()?;
        reports
            .iter()
            .filter(|r| r.best_move.is_some() && r.depth == max_depth)
            .collect()
    };

    let best_score = candidates.iter().map(|r| r.score).max()?;
    if let Some(main) = candidates.iter().find(|r| r.thread_id == 0) {
        if main.score >= best_score - TIE_MARGIN {
            return Some(*main);
        }
    }
    candidates
        .iter()
        .filter(|r| r.score == best_score)
        .min_by_key(|r| r.thread_id)
        .copied()
}

/// Run a search over `position` with the given limits.
///
/// Blocks until the search terminates: the depth/node/time budget runs
/// out or `stop` is raised externally. `bestmove` material is only read
/// after every thread has finished, so nothing is mutating it.
pub fn search(
    position: &Position,
    tt: &Arc<TranspositionTable>,
    limits: &SearchLimits,
    settings: &SearchSettings,
    stop: &Arc<AtomicBool>,
    info: Option<InfoCallback>,
) -> SearchResult {
    tt.new_search();
    let shared_nodes = AtomicU64::new(0);
    let time = TimeManager::new(limits, position.side_to_move(), settings.move_overhead_ms);
    let threads = settings.threads.max(1);

    let reports: Vec<SearchReport> = thread::scope(|scope| {
        let mut handles = Vec::with_capacity(threads - 1);
        for thread_id in 1..threads {
            let helper_pos = position.clone();
            let tt = Arc::clone(tt);
            let stop = Arc::clone(stop);
            let shared_nodes = &shared_nodes;
            let params = settings.params.clone();
            let limits = limits.clone();
            let tablebases = settings.tablebases.clone();
            let handle = thread::Builder::new()
                .name(format!("search-{thread_id}"))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn_scoped(scope, move || {
                    let mut ctx = SearchContext::new(
                        helper_pos,
                        &tt,
                        &stop,
                        shared_nodes,
                        None,
                        limits.nodes,
                        params,
                        thread_id,
                        tablebases,
                    );
                    ctx.iterative_deepening(&limits, 1, None)
                })
                .expect("failed to spawn search worker");
            handles.push(handle);
        }

        let mut ctx = SearchContext::new(
            position.clone(),
            tt,
            stop,
            &shared_nodes,
            Some(&time),
            limits.nodes,
            settings.params.clone(),
            0,
            settings.tablebases.clone(),
        );
        let main_report = ctx.iterative_deepening(limits, settings.multi_pv, info.as_ref());

        // The main thread is done: everyone else winds down too
        stop.store(true, Ordering::Relaxed);

        let mut reports = vec![main_report];
        for handle in handles {
            if let Ok(report) = handle.join() {
                reports.push(report);
            }
        }
        reports
    });

    match select_best(&reports) {
        Some(report) => {
            #[cfg(feature = "logging")]
            log::debug!(
                "selected thread {} at depth {} with score {}",
                report.thread_id,
                report.depth,
                report.score
            );
            SearchResult {
                best_move: Some(report.best_move).filter(|m| m.is_some()),
                ponder: report.ponder,
                score: report.score,
                depth: report.depth,
            }
        }
        // No thread had a move: checkmated or stalemated at the root. The
        // main thread still carries the mate/draw score.
        None => {
            let main = reports.iter().find(|r| r.thread_id == 0);
            SearchResult {
                best_move: None,
                ponder: None,
                score: main.map_or(0, |r| r.score),
                depth: main.map_or(0, |r| r.depth),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(thread_id: usize, depth: u32, score: i32, mv: Move) -> SearchReport {
        SearchReport {
            thread_id,
            best_move: mv,
            ponder: None,
            score,
            depth,
        }
    }

    fn mv(n: u16) -> Move {
        Move::from_u16(n)
    }

    #[test]
    fn test_select_prefers_deepest() {
        let reports = vec![
            report(0, 10, 50, mv(1)),
            report(1, 12, 10, mv(2)),
        ];
        assert_eq!(select_best(&reports).unwrap().thread_id, 1);
    }

    #[test]
    fn test_select_main_wins_close_ties() {
        let reports = vec![
            report(0, 10, 50, mv(1)),
            report(1, 10, 60, mv(2)),
        ];
        assert_eq!(select_best(&reports).unwrap().thread_id, 0);
    }

    #[test]
    fn test_select_helper_wins_by_margin() {
        let reports = vec![
            report(0, 10, 50, mv(1)),
            report(1, 10, 120, mv(2)),
        ];
        assert_eq!(select_best(&reports).unwrap().thread_id, 1);
    }

    #[test]
    fn test_select_exact_tie_is_deterministic() {
        let reports = vec![
            report(2, 10, 80, mv(3)),
            report(1, 10, 80, mv(2)),
        ];
        assert_eq!(select_best(&reports).unwrap().thread_id, 1);
    }
}
