//! Multiplicity x category count matrix.
//!
//! Each cell counts distinct k-mers. Multiplicities above the cap fold into
//! the final (overflow) bin. Two histograms of the same shape can be summed
//! cell-wise, which is how per-shard results are combined.

use crate::error::{Result, SpectrumError};
use crate::peak::{self, Peak, PeakFinder};

/// Default overflow bin.
pub const DEFAULT_CAP: u32 = 1000;

/// Metadata for one histogram column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInfo {
    pub label: String,
    /// Category holds k-mers present in the reads table and therefore
    /// belongs to the coverage spectrum (and to the aggregate view).
    pub in_reads: bool,
}

impl CategoryInfo {
    pub fn new(label: impl Into<String>, in_reads: bool) -> Self {
        Self {
            label: label.into(),
            in_reads,
        }
    }
}

/// Which per-bin view a peak query runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSelector {
    Category(usize),
    /// Sum over every reads-present category.
    Aggregate,
}

/// Distinct k-mer counts by (multiplicity bin, category).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    categories: Vec<CategoryInfo>,
    cap: u32,
    /// Row-major: `cells[bin * ncat + category]`.
    cells: Vec<u64>,
}

impl Histogram {
    /// Empty histogram with bins `0..=cap`.
    pub fn new(categories: Vec<CategoryInfo>, cap: u32) -> Self {
        let cap = cap.max(1);
        let cells = vec![0; (cap as usize + 1) * categories.len()];
        Self {
            categories,
            cap,
            cells,
        }
    }

    /// Empty histogram of the same shape.
    pub fn empty_like(&self) -> Self {
        Self::new(self.categories.clone(), self.cap)
    }

    pub fn categories(&self) -> &[CategoryInfo] {
        &self.categories
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    /// Overflow bin index; also the largest bin.
    pub fn cap(&self) -> u32 {
        self.cap
    }

    pub fn num_bins(&self) -> usize {
        self.cap as usize + 1
    }

    #[inline]
    fn index(&self, bin: usize, category: usize) -> usize {
        bin * self.categories.len() + category
    }

    /// Count one distinct k-mer.
    #[inline]
    pub fn record(&mut self, multiplicity: u32, category: usize) {
        let bin = multiplicity.min(self.cap) as usize;
        let idx = self.index(bin, category);
        self.cells[idx] += 1;
    }

    /// Cell-wise sum with a histogram of identical shape.
    pub fn merge(&mut self, other: &Histogram) -> Result<()> {
        if self.cap != other.cap || self.categories != other.categories {
            return Err(SpectrumError::InvalidInput(
                "cannot merge histograms of different shape".to_string(),
            ));
        }
        for (a, b) in self.cells.iter_mut().zip(&other.cells) {
            *a += b;
        }
        Ok(())
    }

    #[inline]
    pub fn get(&self, bin: usize, category: usize) -> u64 {
        self.cells[self.index(bin, category)]
    }

    /// Per-bin counts of one category.
    pub fn category_counts(&self, category: usize) -> Vec<u64> {
        (0..self.num_bins()).map(|bin| self.get(bin, category)).collect()
    }

    /// Per-bin sum over the given categories.
    pub fn sum_counts(&self, categories: &[usize]) -> Vec<u64> {
        (0..self.num_bins())
            .map(|bin| categories.iter().map(|&c| self.get(bin, c)).sum())
            .collect()
    }

    /// Per-bin sum over the reads-present categories.
    pub fn aggregate_counts(&self) -> Vec<u64> {
        let reads: Vec<usize> = self
            .categories
            .iter()
            .enumerate()
            .filter(|(_, c)| c.in_reads)
            .map(|(i, _)| i)
            .collect();
        self.sum_counts(&reads)
    }

    pub fn series(&self, selector: SeriesSelector) -> Vec<u64> {
        match selector {
            SeriesSelector::Category(c) => self.category_counts(c),
            SeriesSelector::Aggregate => self.aggregate_counts(),
        }
    }

    /// Total over all bins of one category.
    pub fn category_total(&self, category: usize) -> u64 {
        (0..self.num_bins()).map(|bin| self.get(bin, category)).sum()
    }

    /// Total over every cell: the number of distinct k-mers merged.
    pub fn total(&self) -> u64 {
        self.cells.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Maximum over bins >= 1 (overflow bin excluded).
    pub fn raw_peak(&self, selector: SeriesSelector) -> Option<Peak> {
        peak::raw_peak(&self.series(selector))
    }

    /// Maximum after dropping the lowest `n` bins above zero.
    pub fn peak_excluding(&self, selector: SeriesSelector, n: usize) -> Option<Peak> {
        peak::peak_excluding(&self.series(selector), n)
    }

    /// Peak according to an arbitrary strategy.
    pub fn peak_with(&self, selector: SeriesSelector, finder: &dyn PeakFinder) -> Option<Peak> {
        finder.find_peak(&self.series(selector))
    }

    /// Non-zero cells as (category, bin, count), category-major.
    pub fn nonzero_cells(&self) -> impl Iterator<Item = (usize, usize, u64)> + '_ {
        (0..self.num_categories()).flat_map(move |c| {
            (0..self.num_bins()).filter_map(move |bin| {
                let count = self.get(bin, c);
                (count > 0).then_some((c, bin, count))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peak::ValleyPeakFinder;

    fn categories() -> Vec<CategoryInfo> {
        vec![
            CategoryInfo::new("read-only", true),
            CategoryInfo::new("shared", true),
            CategoryInfo::new("asm-only", false),
        ]
    }

    #[test]
    fn test_record_and_cap() {
        let mut h = Histogram::new(categories(), 10);
        h.record(3, 0);
        h.record(3, 0);
        h.record(25, 1);
        h.record(10, 1);
        h.record(0, 2);

        assert_eq!(h.get(3, 0), 2);
        assert_eq!(h.get(10, 1), 2);
        assert_eq!(h.get(0, 2), 1);
        assert_eq!(h.total(), 5);
        assert_eq!(h.category_total(1), 2);
    }

    #[test]
    fn test_aggregate_excludes_assembly_only() {
        let mut h = Histogram::new(categories(), 10);
        h.record(0, 2);
        h.record(4, 0);
        h.record(4, 1);
        let agg = h.aggregate_counts();
        assert_eq!(agg[0], 0);
        assert_eq!(agg[4], 2);
    }

    #[test]
    fn test_merge_is_cellwise_sum() {
        let mut a = Histogram::new(categories(), 10);
        let mut b = a.empty_like();
        a.record(2, 0);
        b.record(2, 0);
        b.record(7, 1);
        a.merge(&b).unwrap();
        assert_eq!(a.get(2, 0), 2);
        assert_eq!(a.get(7, 1), 1);
        assert_eq!(a.total(), 3);
    }

    #[test]
    fn test_merge_rejects_shape_mismatch() {
        let mut a = Histogram::new(categories(), 10);
        let b = Histogram::new(categories(), 20);
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_peak_queries() {
        let mut h = Histogram::new(categories(), 50);
        for _ in 0..20 {
            h.record(1, 0);
        }
        for _ in 0..5 {
            h.record(2, 0);
        }
        for (m, n) in [(10u32, 6), (11, 9), (12, 7)] {
            for _ in 0..n {
                h.record(m, 1);
            }
        }
        assert_eq!(h.raw_peak(SeriesSelector::Aggregate).unwrap().bin, 1);
        assert_eq!(h.peak_excluding(SeriesSelector::Aggregate, 2).unwrap().bin, 11);
        let peak = h.peak_with(SeriesSelector::Aggregate, &ValleyPeakFinder).unwrap();
        assert_eq!((peak.bin, peak.count), (11, 9));
        assert_eq!(h.raw_peak(SeriesSelector::Category(1)).unwrap().bin, 11);
        assert!(h.raw_peak(SeriesSelector::Category(2)).is_none());
    }

    #[test]
    fn test_nonzero_cells_order() {
        let mut h = Histogram::new(categories(), 5);
        h.record(4, 1);
        h.record(1, 0);
        h.record(0, 2);
        let cells: Vec<_> = h.nonzero_cells().collect();
        assert_eq!(cells, vec![(0, 1, 1), (1, 4, 1), (2, 0, 1)]);
    }
}
