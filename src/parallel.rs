//! Parallel processing utilities using Rayon.

use crate::kmer::{KmerCount, KmerValue};
use crate::table::MappedTable;
use rayon::prelude::*;
use std::ops::Range;

/// Minimum total record count before a merge is split into shards.
/// Below this, one shard is faster than scheduling overhead.
pub const PARALLEL_THRESHOLD: u64 = 10_000;

/// Shards per rayon thread when none is configured.
pub const SHARDS_PER_THREAD: usize = 4;

pub fn default_shards() -> usize {
    rayon::current_num_threads() * SHARDS_PER_THREAD
}

/// Half-open key interval; None means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Option<KmerValue>,
    pub end: Option<KmerValue>,
}

impl KeyRange {
    pub const ALL: KeyRange = KeyRange {
        start: None,
        end: None,
    };

    /// Record indices of `table` whose keys fall in this range.
    pub fn indices(&self, table: &MappedTable) -> Range<u64> {
        let lo = self.start.map_or(0, |k| table.lower_bound(k));
        let hi = self.end.map_or(table.len(), |k| table.lower_bound(k));
        lo..hi.max(lo)
    }
}

/// Split the key space into at most `shards` ranges of similar size.
///
/// Boundaries are sampled at even positions of the largest table, so a
/// shard never splits a key between tables. Together the ranges cover the
/// whole key space without overlap.
pub fn plan_shards(tables: &[MappedTable], shards: usize) -> Vec<KeyRange> {
    let total: u64 = tables.iter().map(|t| t.len()).sum();
    let Some(largest) = tables.iter().max_by_key(|t| t.len()) else {
        return vec![KeyRange::ALL];
    };
    if shards <= 1 || total < PARALLEL_THRESHOLD || largest.len() < 2 {
        return vec![KeyRange::ALL];
    }

    let n = largest.len();
    let parts = (shards as u64).min(n);
    let mut bounds: Vec<KmerValue> = (1..parts).map(|i| largest.key(n * i / parts)).collect();
    bounds.dedup();

    let mut ranges = Vec::with_capacity(bounds.len() + 1);
    let mut start = None;
    for b in bounds {
        ranges.push(KeyRange {
            start,
            end: Some(b),
        });
        start = Some(b);
    }
    ranges.push(KeyRange { start, end: None });
    ranges
}

/// Parallel sort by key, summing the counts of repeated keys.
///
/// Returns the collapsed records and how many duplicates were folded in.
/// Counts saturate at `u32::MAX`.
pub fn sort_and_collapse(mut records: Vec<KmerCount>) -> (Vec<KmerCount>, u64) {
    records.par_sort_unstable_by_key(|r| r.kmer);
    let before = records.len();
    records.dedup_by(|next, kept| {
        if next.kmer == kept.kmer {
            kept.count = kept.count.saturating_add(next.count);
            true
        } else {
            false
        }
    });
    let folded = (before - records.len()) as u64;
    (records, folded)
}
