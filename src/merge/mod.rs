//! Merging sorted k-mer tables into a classified histogram.
//!
//! Stream 0 is always the reads table, streams 1 and 2 are assemblies.
//! A merge step yields a [`Hit`]: one distinct key, the set of streams that
//! hold it and their counts. A [`Classifier`] turns each hit into a
//! (multiplicity, category) cell of the [`Histogram`].
//!
//! Two drivers feed the same loop:
//! - [`workers`]: one reader thread per table, batches over channels
//! - [`sharded`]: memory-mapped binary tables split into key ranges

pub mod classify;
pub mod cursor;
pub mod sharded;
pub mod workers;

pub use classify::{Classifier, CnClassifier, VennCategory, VennClassifier};
pub use cursor::KWayMerge;

use crate::error::Result;
use crate::histogram::Histogram;
use crate::kmer::{KmerCount, KmerValue};
use tracing::debug;

/// Reads plus at most two assemblies.
pub const MAX_STREAMS: usize = 3;

/// Stream index of the reads table.
pub const READS: usize = 0;

/// One distinct key and where it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub kmer: KmerValue,
    /// Bit i set when stream i holds the key.
    pub mask: u8,
    /// Count per stream; zero where the bit is clear.
    pub counts: [u32; MAX_STREAMS],
}

impl Hit {
    #[inline]
    pub fn new(kmer: KmerValue) -> Self {
        Self {
            kmer,
            mask: 0,
            counts: [0; MAX_STREAMS],
        }
    }

    #[inline]
    pub fn contains(&self, stream: usize) -> bool {
        self.mask & (1 << stream) != 0
    }

    #[inline]
    pub fn in_reads(&self) -> bool {
        self.contains(READS)
    }

    /// Count in `stream`, None when the stream lacks the key.
    #[inline]
    pub fn count(&self, stream: usize) -> Option<u32> {
        self.contains(stream).then_some(self.counts[stream])
    }
}

/// Totals gathered while draining a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Distinct keys across all inputs.
    pub distinct: u64,
    /// Distinct keys present in the reads table.
    pub in_reads: u64,
}

impl MergeStats {
    pub fn add(&mut self, other: MergeStats) {
        self.distinct += other.distinct;
        self.in_reads += other.in_reads;
    }
}

/// Drain `merge` into `hist`.
pub fn merge_into<I>(
    merge: KWayMerge<I>,
    classifier: &dyn Classifier,
    hist: &mut Histogram,
) -> Result<MergeStats>
where
    I: Iterator<Item = Result<KmerCount>>,
{
    let mut stats = MergeStats::default();
    for hit in merge {
        let hit = hit?;
        let (multiplicity, category) = classifier.classify(&hit);
        hist.record(multiplicity, category);
        stats.distinct += 1;
        if hit.in_reads() {
            stats.in_reads += 1;
        }
    }
    debug!(
        distinct = stats.distinct,
        in_reads = stats.in_reads,
        "merge drained"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(pairs: &[(u128, u32)]) -> std::vec::IntoIter<Result<KmerCount>> {
        pairs
            .iter()
            .map(|&(k, c)| Ok(KmerCount::new(KmerValue(k), c)))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_hit_accessors() {
        let mut hit = Hit::new(KmerValue(9));
        hit.mask = 0b101;
        hit.counts = [4, 0, 1];
        assert!(hit.in_reads());
        assert!(!hit.contains(1));
        assert_eq!(hit.count(2), Some(1));
        assert_eq!(hit.count(1), None);
    }

    #[test]
    fn test_merge_into_one_assembly() {
        // reads {1:5, 2:12, 3:40}, assembly {2, 3, 4}
        let merge = KWayMerge::new(vec![
            stream(&[(1, 5), (2, 12), (3, 40)]),
            stream(&[(2, 1), (3, 1), (4, 1)]),
        ])
        .unwrap();
        let classifier = VennClassifier::new(1);
        let mut hist = classifier.histogram(100);
        let stats = merge_into(merge, &classifier, &mut hist).unwrap();

        assert_eq!(stats, MergeStats { distinct: 4, in_reads: 3 });
        assert_eq!(hist.total(), 4);
        let read_only = classifier.column(VennCategory::ReadsOnly).unwrap();
        let shared = classifier.column(VennCategory::SHARED).unwrap();
        let asm_only = classifier.column(VennCategory::ASSEMBLY_ONLY).unwrap();
        assert_eq!(hist.get(5, read_only), 1);
        assert_eq!(hist.get(12, shared), 1);
        assert_eq!(hist.get(40, shared), 1);
        assert_eq!(hist.get(0, asm_only), 1);
    }
}
