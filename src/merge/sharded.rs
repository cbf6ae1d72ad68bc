//! Parallel merge over memory-mapped binary tables.
//!
//! Tables are validated up front (in parallel), the key space is split into
//! ranges and every range is merged into its own histogram on the rayon
//! pool. Range histograms are summed at the end; nothing is shared while
//! merging.

use super::{merge_into, Classifier, KWayMerge, MergeStats};
use crate::error::{Result, SpectrumError};
use crate::histogram::Histogram;
use crate::kmer::KmerCount;
use crate::parallel::{plan_shards, KeyRange};
use crate::table::MappedTable;
use rayon::prelude::*;
use tracing::debug;

/// Check every table's ordering, in parallel across and within tables.
pub fn validate_tables(tables: &[MappedTable]) -> Result<()> {
    tables.par_iter().try_for_each(|t| t.validate())
}

fn merge_range(
    tables: &[MappedTable],
    range: KeyRange,
    classifier: &dyn Classifier,
    cap: u32,
) -> Result<(Histogram, MergeStats)> {
    let streams: Vec<_> = tables
        .iter()
        .map(|t| t.records(range.indices(t)).map(Ok::<KmerCount, SpectrumError>))
        .collect();
    let mut hist = classifier.histogram(cap);
    let stats = merge_into(KWayMerge::new(streams)?, classifier, &mut hist)?;
    Ok((hist, stats))
}

/// Merge validated tables in `shards` key ranges.
pub fn merge_sharded(
    tables: &[MappedTable],
    classifier: &dyn Classifier,
    cap: u32,
    shards: usize,
) -> Result<(Histogram, MergeStats)> {
    validate_tables(tables)?;
    let ranges = plan_shards(tables, shards);
    debug!(shards = ranges.len(), "sharded merge");

    ranges
        .into_par_iter()
        .map(|range| merge_range(tables, range, classifier, cap))
        .try_reduce(
            || (classifier.histogram(cap), MergeStats::default()),
            |(mut hist, mut stats), (h, s)| {
                hist.merge(&h)?;
                stats.add(s);
                Ok((hist, stats))
            },
        )
}
