//! Search: iterative deepening alpha-beta over a shared transposition
//! table.
//!
//! One [`SearchContext`] per thread owns a position copy, history and
//! killer tables and a triangular PV table; threads share only the
//! transposition table, the stop flag and a node counter.

pub mod constants;
pub mod smp;
pub mod time;

mod alphabeta;
mod iterative;
mod move_order;
mod params;
mod quiescence;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::board::{Move, Position, MAX_PLY};
use crate::tt::TranspositionTable;

pub use move_order::{CaptureHistoryTable, HistoryTable, KillerTable};
pub use params::SearchParams;
pub use smp::{search, SearchResult, SearchSettings};
pub use time::{SearchLimits, TimeManager};

use constants::CHECKUP_NODES;

/// Win/draw/loss verdict of an endgame tablebase probe, from the side to
/// move's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wdl {
    Loss,
    Draw,
    Win,
}

/// Endgame tablebase hook. The engine only consumes the interface; probing
/// itself lives with the caller.
pub trait TablebaseProbe: Send + Sync {
    /// Verdict and score for the position, or `None` when it is not
    /// covered by the tables.
    fn probe(&self, pos: &Position) -> Option<(Wdl, i32)>;
}

/// One completed depth iteration, as reported on the `info` line.
#[derive(Debug, Clone)]
pub struct SearchInfo {
    pub depth: u32,
    pub seldepth: u32,
    pub multipv: u32,
    pub score: i32,
    pub mate_in: Option<i32>,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub pv: Vec<Move>,
}

/// Callback invoked by the main thread after each completed depth.
pub type InfoCallback = Arc<dyn Fn(&SearchInfo) + Send + Sync>;

/// A root move with its running scores across iterations.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RootMove {
    pub mv: Move,
    pub score: i32,
    pub prev_score: i32,
}

/// Triangular principal variation table indexed by ply.
pub(crate) struct PvTable {
    lines: Box<[[Move; MAX_PLY]; MAX_PLY]>,
    lens: [usize; MAX_PLY],
}

impl PvTable {
    fn new() -> Self {
        PvTable {
            lines: Box::new([[Move::NONE; MAX_PLY]; MAX_PLY]),
            lens: [0; MAX_PLY],
        }
    }

    #[inline]
    pub(crate) fn clear(&mut self, ply: usize) {
        self.lens[ply] = 0;
    }

    /// Prepend `mv` to the child line one ply deeper.
    pub(crate) fn update(&mut self, ply: usize, mv: Move) {
        let child_len = if ply + 1 < MAX_PLY { self.lens[ply + 1] } else { 0 };
        let len = (child_len + 1).min(MAX_PLY - ply);
        self.lines[ply][0] = mv;
        for i in 1..len {
            self.lines[ply][i] = self.lines[ply + 1][i - 1];
        }
        self.lens[ply] = len;
    }

    #[must_use]
    pub(crate) fn line(&self, ply: usize) -> &[Move] {
        &self.lines[ply][..self.lens[ply]]
    }
}

/// Per-thread search state.
pub(crate) struct SearchContext<'a> {
    pub pos: Position,
    pub tt: &'a TranspositionTable,
    pub stop: &'a AtomicBool,
    pub shared_nodes: &'a AtomicU64,
    /// Only the main thread consults the clock
    pub time: Option<&'a TimeManager>,
    pub node_limit: Option<u64>,
    pub params: SearchParams,
    pub thread_id: usize,
    /// Game ply of the search root within the position's state stack
    pub root_ply: usize,
    pub nodes: u64,
    flushed: u64,
    pub seldepth: u32,
    pub stopped: bool,
    pub history: HistoryTable,
    pub capture_history: CaptureHistoryTable,
    pub killers: KillerTable,
    pub pv: PvTable,
    pub root_moves: Vec<RootMove>,
    pub tablebases: Option<Arc<dyn TablebaseProbe>>,
}

impl<'a> SearchContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        pos: Position,
        tt: &'a TranspositionTable,
        stop: &'a AtomicBool,
        shared_nodes: &'a AtomicU64,
        time: Option<&'a TimeManager>,
        node_limit: Option<u64>,
        params: SearchParams,
        thread_id: usize,
        tablebases: Option<Arc<dyn TablebaseProbe>>,
    ) -> Self {
        let root_ply = pos.game_ply();
        SearchContext {
            pos,
            tt,
            stop,
            shared_nodes,
            time,
            node_limit,
            params,
            thread_id,
            root_ply,
            nodes: 0,
            flushed: 0,
            seldepth: 0,
            stopped: false,
            history: HistoryTable::new(),
            capture_history: CaptureHistoryTable::new(),
            killers: KillerTable::new(),
            pv: PvTable::new(),
            root_moves: Vec::new(),
            tablebases,
        }
    }

    /// Per-node bookkeeping: count the node and, on checkup boundaries,
    /// publish the local count and consult the clock and node budget.
    #[inline]
    pub(crate) fn visit_node(&mut self) {
        self.nodes += 1;
        if self.nodes % CHECKUP_NODES == 0 {
            self.flush_nodes();
            if let Some(tm) = self.time {
                if tm.check_up() {
                    self.stop.store(true, Ordering::Relaxed);
                }
            }
            if let Some(limit) = self.node_limit {
                if self.shared_nodes.load(Ordering::Relaxed) >= limit {
                    self.stop.store(true, Ordering::Relaxed);
                }
            }
        }
    }

    /// Publish nodes counted since the last flush to the shared counter.
    pub(crate) fn flush_nodes(&mut self) {
        let delta = self.nodes - self.flushed;
        if delta > 0 {
            self.shared_nodes.fetch_add(delta, Ordering::Relaxed);
            self.flushed = self.nodes;
        }
    }

    /// Sticky stop test; once true the whole tree unwinds.
    #[inline]
    pub(crate) fn should_stop(&mut self) -> bool {
        if !self.stopped && self.stop.load(Ordering::Relaxed) {
            self.stopped = true;
        }
        self.stopped
    }

    /// Ply of the current node relative to the search root.
    #[inline]
    pub(crate) fn ply(&self) -> usize {
        self.pos.game_ply() - self.root_ply
    }
}
