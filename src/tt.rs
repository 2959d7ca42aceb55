//! Shared transposition table.
//!
//! A contiguous array of cache-line-sized clusters of three entries,
//! probed and written lock-free by every search thread. Each entry is two
//! atomic words; a torn read across them is caught by the 16-bit key check
//! and simply becomes a miss. Entries age in a 5-bit cycle and the
//! replacement victim is the shallowest, stalest entry.

use std::sync::atomic::{AtomicU16, AtomicU64, AtomicU8, Ordering};

use crate::board::Move;
use crate::search::constants::{MATE_BOUND, SCORE_NONE};

/// Entry bound type, two bits of the meta byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// Empty or torn entry
    Invalid,
    /// Score is at most the stored value (failed low)
    Upper,
    /// Score is at least the stored value (failed high)
    Lower,
    /// Score is exact
    Exact,
}

impl Bound {
    fn from_bits(bits: u8) -> Bound {
        match bits & 3 {
            0 => Bound::Invalid,
            1 => Bound::Upper,
            2 => Bound::Lower,
            _ => Bound::Exact,
        }
    }

    fn bits(self) -> u8 {
        match self {
            Bound::Invalid => 0,
            Bound::Upper => 1,
            Bound::Lower => 2,
            Bound::Exact => 3,
        }
    }
}

const AGE_CYCLE: u8 = 32;
const ENTRIES_PER_CLUSTER: usize = 3;

/// One entry, split across two atomics:
/// `data` = key16 | move16 | score16 | eval16, `meta` = depth8 | info8
/// with info = bound(2) | pv(1) | age(5).
#[derive(Default)]
struct Entry {
    data: AtomicU64,
    meta: AtomicU16,
}

impl Entry {
    #[inline]
    fn pack_data(key: u16, mv: Move, score: i16, eval: i16) -> u64 {
        u64::from(key)
            | (u64::from(mv.as_u16()) << 16)
            | (u64::from(score as u16) << 32)
            | (u64::from(eval as u16) << 48)
    }

    #[inline]
    fn pack_meta(depth: u8, bound: Bound, pv: bool, age: u8) -> u16 {
        let info = bound.bits() | (u8::from(pv) << 2) | (age << 3);
        u16::from(depth) | (u16::from(info) << 8)
    }
}

#[repr(align(64))]
#[derive(Default)]
struct Cluster {
    entries: [Entry; ENTRIES_PER_CLUSTER],
}

/// Result of a probe: either a decoded hit, or the slot the caller should
/// overwrite.
#[derive(Clone, Copy)]
pub struct TtProbe {
    pub hit: bool,
    pub mv: Move,
    pub score: i32,
    pub eval: i32,
    pub depth: u32,
    pub bound: Bound,
    pub pv: bool,
    cluster: usize,
    slot: usize,
}

impl TtProbe {
    fn miss(cluster: usize, slot: usize) -> Self {
        TtProbe {
            hit: false,
            mv: Move::NONE,
            score: SCORE_NONE,
            eval: SCORE_NONE,
            depth: 0,
            bound: Bound::Invalid,
            pv: false,
            cluster,
            slot,
        }
    }
}

pub struct TranspositionTable {
    clusters: Vec<Cluster>,
    age: AtomicU8,
}

/// Mate scores are stored relative to the probing node so they stay
/// correct when found again at another depth.
#[inline]
fn score_to_tt(score: i32, ply: usize) -> i16 {
    if score >= MATE_BOUND {
        (score + ply as i32) as i16
    } else if score <= -MATE_BOUND {
        (score - ply as i32) as i16
    } else {
        score as i16
    }
}

#[inline]
fn score_from_tt(score: i32, ply: usize) -> i32 {
    if score >= MATE_BOUND {
        score - ply as i32
    } else if score <= -MATE_BOUND {
        score + ply as i32
    } else {
        score
    }
}

impl TranspositionTable {
    /// Allocate a table of roughly `size_mb` megabytes.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        let cluster_size = std::mem::size_of::<Cluster>();
        let count = (size_mb.max(1) * 1024 * 1024 / cluster_size).max(1);
        let mut clusters = Vec::with_capacity(count);
        clusters.resize_with(count, Cluster::default);
        TranspositionTable {
            clusters,
            age: AtomicU8::new(0),
        }
    }

    /// Reallocate to a new size, dropping all entries.
    pub fn resize(&mut self, size_mb: usize) {
        *self = TranspositionTable::new(size_mb);
    }

    /// Drop all entries, keeping the allocation.
    pub fn clear(&mut self) {
        for cluster in &self.clusters {
            for entry in &cluster.entries {
                entry.data.store(0, Ordering::Relaxed);
                entry.meta.store(0, Ordering::Relaxed);
            }
        }
        self.age.store(0, Ordering::Relaxed);
    }

    /// Advance the age at the start of a new search.
    pub fn new_search(&self) {
        let next = (self.age.load(Ordering::Relaxed) + 1) % AGE_CYCLE;
        self.age.store(next, Ordering::Relaxed);
    }

    /// Map a hash onto a cluster with the high half of the 128-bit product.
    #[inline]
    fn cluster_index(&self, hash: u64) -> usize {
        ((u128::from(hash) * self.clusters.len() as u128) >> 64) as usize
    }

    #[inline]
    fn relative_age(&self, entry_age: u8) -> u8 {
        let cur = self.age.load(Ordering::Relaxed);
        (AGE_CYCLE + cur - entry_age) % AGE_CYCLE
    }

    /// Look up `hash`. On a hit the entry's age is refreshed; on a miss the
    /// returned slot is the replacement victim (an empty entry if there is
    /// one, otherwise the shallowest, stalest entry).
    #[must_use]
    pub fn probe(&self, hash: u64, ply: usize) -> TtProbe {
        let cluster_idx = self.cluster_index(hash);
        let cluster = &self.clusters[cluster_idx];
        let key = hash as u16;
        let cur_age = self.age.load(Ordering::Relaxed);

        let mut victim = 0;
        let mut victim_value = i32::MAX;

        for (slot, entry) in cluster.entries.iter().enumerate() {
            let data = entry.data.load(Ordering::Relaxed);
            let meta = entry.meta.load(Ordering::Relaxed);

            if meta == 0 {
                return TtProbe::miss(cluster_idx, slot);
            }

            let depth = (meta & 0xFF) as u8;
            let info = (meta >> 8) as u8;

            if data as u16 == key {
                // Refresh the age so a useful entry survives replacement
                let refreshed = Entry::pack_meta(
                    depth,
                    Bound::from_bits(info),
                    info & 4 != 0,
                    cur_age,
                );
                entry.meta.store(refreshed, Ordering::Relaxed);

                return TtProbe {
                    hit: true,
                    mv: Move::from_u16((data >> 16) as u16),
                    score: score_from_tt(i32::from((data >> 32) as u16 as i16), ply),
                    eval: i32::from((data >> 48) as u16 as i16),
                    depth: u32::from(depth),
                    bound: Bound::from_bits(info),
                    pv: info & 4 != 0,
                    cluster: cluster_idx,
                    slot,
                };
            }

            let value = i32::from(depth) - i32::from(self.relative_age(info >> 3));
            if value < victim_value {
                victim_value = value;
                victim = slot;
            }
        }

        TtProbe::miss(cluster_idx, victim)
    }

    /// Write through the slot chosen by a previous probe.
    ///
    /// The slot is always overwritten, with two exceptions: a null incoming
    /// move preserves the move already stored for the same key, and an
    /// exact entry is not downgraded by a shallower non-exact result.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        probe: &TtProbe,
        hash: u64,
        mv: Move,
        score: i32,
        eval: i32,
        depth: u32,
        bound: Bound,
        pv: bool,
        ply: usize,
    ) {
        let entry = &self.clusters[probe.cluster].entries[probe.slot];
        let key = hash as u16;

        let data = entry.data.load(Ordering::Relaxed);
        let meta = entry.meta.load(Ordering::Relaxed);
        let same_key = meta != 0 && data as u16 == key;

        if same_key
            && Bound::from_bits((meta >> 8) as u8) == Bound::Exact
            && bound != Bound::Exact
            && depth < u32::from(meta as u8)
        {
            return;
        }

        let mv = if mv.is_none() && same_key {
            Move::from_u16((data >> 16) as u16)
        } else {
            mv
        };

        let score = score_to_tt(score, ply);
        let eval = eval.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
        let age = self.age.load(Ordering::Relaxed);

        entry
            .data
            .store(Entry::pack_data(key, mv, score, eval), Ordering::Relaxed);
        entry.meta.store(
            Entry::pack_meta(depth.min(255) as u8, bound, pv, age),
            Ordering::Relaxed,
        );
    }

    /// Permille of sampled entries written during the current age cycle.
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let cur = self.age.load(Ordering::Relaxed);
        let sample = self.clusters.len().min(1000);
        let mut used = 0u32;
        for cluster in &self.clusters[..sample] {
            for entry in &cluster.entries {
                let meta = entry.meta.load(Ordering::Relaxed);
                if meta != 0 && ((meta >> 8) as u8) >> 3 == cur {
                    used += 1;
                }
            }
        }
        used * 1000 / (sample as u32 * ENTRIES_PER_CLUSTER as u32)
    }
}
