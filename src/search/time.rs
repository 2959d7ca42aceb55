//! Time management.
//!
//! Translates UCI `go` limits into a soft and a hard budget. The hard
//! budget terminates the search wherever it stands; the soft budget is
//! consulted between depth iterations and only stops when the best move
//! has been stable for several iterations.

use std::time::{Duration, Instant};

use crate::board::Color;

/// Iterations the best move must survive before a soft stop may fire.
pub const STABILITY_THRESHOLD: u32 = 4;

/// Search limits parsed from a `go` command.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub infinite: bool,
}

impl SearchLimits {
    /// A fixed-depth limit.
    #[must_use]
    pub fn depth(depth: u32) -> Self {
        SearchLimits {
            depth: Some(depth),
            ..Default::default()
        }
    }

    /// A fixed time-per-move limit in milliseconds.
    #[must_use]
    pub fn movetime(ms: u64) -> Self {
        SearchLimits {
            movetime: Some(ms),
            ..Default::default()
        }
    }

    /// A node budget.
    #[must_use]
    pub fn nodes(nodes: u64) -> Self {
        SearchLimits {
            nodes: Some(nodes),
            ..Default::default()
        }
    }
}

/// Soft and hard wall-clock budgets for one search.
pub struct TimeManager {
    start: Instant,
    soft: Option<Duration>,
    hard: Option<Duration>,
}

impl TimeManager {
    /// Derive budgets from the limits for the side to move.
    #[must_use]
    pub fn new(limits: &SearchLimits, stm: Color, move_overhead_ms: u64) -> Self {
        let (soft, hard) = if limits.infinite || limits.depth.is_some() || limits.nodes.is_some() {
            (None, None)
        } else if let Some(movetime) = limits.movetime {
            // Fixed move time uses only the hard condition
            let budget = movetime.saturating_sub(move_overhead_ms).max(1);
            (None, Some(Duration::from_millis(budget)))
        } else {
            let (time_left, inc) = match stm {
                Color::White => (limits.wtime, limits.winc.unwrap_or(0)),
                Color::Black => (limits.btime, limits.binc.unwrap_or(0)),
            };
            match time_left {
                None => (None, None),
                Some(remaining) => {
                    let remaining = remaining.saturating_sub(move_overhead_ms);
                    let moves_to_go = limits.movestogo.unwrap_or(25).max(1);
                    let alloc = (remaining / moves_to_go + inc * 3 / 4).max(1);
                    let hard = (alloc * 4).min(remaining * 4 / 5).max(1);
                    (
                        Some(Duration::from_millis(alloc)),
                        Some(Duration::from_millis(hard)),
                    )
                }
            }
        };

        TimeManager {
            start: Instant::now(),
            soft,
            hard,
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Hard-budget check, called on node-count boundaries inside the search.
    #[inline]
    #[must_use]
    pub fn check_up(&self) -> bool {
        self.hard.is_some_and(|hard| self.start.elapsed() >= hard)
    }

    /// Soft-budget check between iterations: stop once the budget is spent
    /// and the best move has held for enough iterations.
    #[must_use]
    pub fn soft_stop(&self, stability: u32) -> bool {
        match self.soft {
            Some(soft) => self.start.elapsed() >= soft && stability >= STABILITY_THRESHOLD,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movetime_is_hard_only() {
        let tm = TimeManager::new(&SearchLimits::movetime(500), Color::White, 10);
        assert!(tm.soft.is_none());
        assert_eq!(tm.hard, Some(Duration::from_millis(490)));
    }

    #[test]
    fn test_depth_and_nodes_have_no_budget() {
        let tm = TimeManager::new(&SearchLimits::depth(8), Color::White, 10);
        assert!(tm.soft.is_none() && tm.hard.is_none());
        let tm = TimeManager::new(&SearchLimits::nodes(1000), Color::White, 10);
        assert!(tm.soft.is_none() && tm.hard.is_none());
        assert!(!tm.check_up());
    }

    #[test]
    fn test_incremental_allocates_fraction() {
        let limits = SearchLimits {
            wtime: Some(60_000),
            winc: Some(1000),
            ..Default::default()
        };
        let tm = TimeManager::new(&limits, Color::White, 50);
        let soft = tm.soft.unwrap();
        let hard = tm.hard.unwrap();
        assert!(soft < Duration::from_millis(60_000 / 5));
        assert!(hard <= Duration::from_millis(60_000 * 4 / 5));
        assert!(soft <= hard);
    }

    #[test]
    fn test_soft_stop_needs_stability() {
        let limits = SearchLimits {
            wtime: Some(1),
            ..Default::default()
        };
        let tm = TimeManager::new(&limits, Color::White, 0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(!tm.soft_stop(STABILITY_THRESHOLD - 1));
        assert!(tm.soft_stop(STABILITY_THRESHOLD));
    }
}
