//! Peak detection strategies.
//!
//! A k-mer spectrum from reads starts with a steep error tail at
//! multiplicity 1-2, then rises to the true coverage mode. Where "the" peak
//! is depends on how that tail is treated, so the policy is a trait and the
//! scale resolver only sees the result.
//!
//! Every finder receives the full per-bin array: bin 0 holds k-mers absent
//! from the reads and the last bin is the overflow bin. Neither is ever a
//! peak candidate.

use std::ops::Range;

/// A histogram peak: bin position and the count at that bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    pub bin: usize,
    pub count: u64,
}

/// Strategy locating the dominant mode of a per-bin count array.
pub trait PeakFinder: Send + Sync {
    fn find_peak(&self, counts: &[u64]) -> Option<Peak>;
}

/// Bins eligible as peaks: everything except bin 0 and the overflow bin.
#[inline]
pub fn candidate_bins(counts: &[u64]) -> Range<usize> {
    1..counts.len().saturating_sub(1).max(1)
}

/// Highest count within `range`; ties go to the higher bin.
/// None when every count in the range is zero.
pub fn max_in(counts: &[u64], range: Range<usize>) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for bin in range {
        let count = counts[bin];
        if count > 0 && best.is_none_or(|b| count >= b.count) {
            best = Some(Peak { bin, count });
        }
    }
    best
}

/// The unfiltered maximum over all candidate bins.
pub fn raw_peak(counts: &[u64]) -> Option<Peak> {
    max_in(counts, candidate_bins(counts))
}

/// Maximum after excluding the lowest `n` candidate bins (1..=n).
pub fn peak_excluding(counts: &[u64], n: usize) -> Option<Peak> {
    let bins = candidate_bins(counts);
    let start = (bins.start + n).min(bins.end);
    max_in(counts, start..bins.end)
}

/// Walks down the error tail, then takes the highest bin beyond the valley.
///
/// If counts decrease all the way to the end there is no mode away from the
/// origin and the raw maximum is returned instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValleyPeakFinder;

impl PeakFinder for ValleyPeakFinder {
    fn find_peak(&self, counts: &[u64]) -> Option<Peak> {
        let bins = candidate_bins(counts);
        if bins.is_empty() {
            return None;
        }
        let mut k = bins.start + 1;
        while k < bins.end && counts[k] < counts[k - 1] {
            k += 1;
        }
        if k >= bins.end {
            return raw_peak(counts);
        }
        max_in(counts, k..bins.end).or_else(|| raw_peak(counts))
    }
}

/// Ignores a fixed number of low bins.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdPeakFinder {
    pub skip: usize,
}

impl ThresholdPeakFinder {
    pub fn new(skip: usize) -> Self {
        Self { skip }
    }
}

impl PeakFinder for ThresholdPeakFinder {
    fn find_peak(&self, counts: &[u64]) -> Option<Peak> {
        peak_excluding(counts, self.skip).or_else(|| raw_peak(counts))
    }
}

/// Right-most local maximum beyond `main` reaching `fraction` of its height.
///
/// Used to widen the x axis when a spectrum has a second mode (for example
/// a heterozygous/homozygous pair). A bin only counts when the curve
/// actually rises into it; a slowly decaying tail is not a peak.
pub fn secondary_peak(counts: &[u64], main: Peak, fraction: f64) -> Option<Peak> {
    if fraction <= 0.0 {
        return None;
    }
    let end = candidate_bins(counts).end;
    let threshold = fraction * main.count as f64;
    let mut found = None;

    let mut k = main.bin + 1;
    while k < end {
        while k < end && counts[k] <= counts[k - 1] {
            k += 1;
        }
        let rise_start = k;
        while k < end && counts[k] >= counts[k - 1] {
            k += 1;
        }
        if k > rise_start && counts[k - 1] as f64 >= threshold {
            found = Some(Peak {
                bin: k - 1,
                count: counts[k - 1],
            });
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Error tail at 1-3, main mode at 30, overflow bin last.
    fn spectrum() -> Vec<u64> {
        let mut counts = vec![0u64; 101];
        counts[0] = 500;
        counts[1] = 10_000;
        counts[2] = 3_000;
        counts[3] = 400;
        for (bin, c) in counts.iter_mut().enumerate().take(60).skip(4) {
            let d = (bin as i64 - 30).unsigned_abs();
            *c = 1_000u64.saturating_sub(d * 35).max(5);
        }
        counts[100] = 99_999;
        counts
    }

    #[test]
    fn test_raw_peak_hits_error_tail() {
        assert_eq!(raw_peak(&spectrum()), Some(Peak { bin: 1, count: 10_000 }));
    }

    #[test]
    fn test_valley_finder_skips_error_tail() {
        assert_eq!(
            ValleyPeakFinder.find_peak(&spectrum()),
            Some(Peak { bin: 30, count: 1_000 })
        );
    }

    #[test]
    fn test_valley_finder_falls_back_when_monotone() {
        let counts = vec![0, 50, 20, 10, 5, 0];
        assert_eq!(
            ValleyPeakFinder.find_peak(&counts),
            Some(Peak { bin: 1, count: 50 })
        );
    }

    #[test]
    fn test_threshold_finder() {
        let counts = spectrum();
        assert_eq!(ThresholdPeakFinder::new(3).find_peak(&counts).unwrap().bin, 30);
        assert_eq!(ThresholdPeakFinder::new(0).find_peak(&counts).unwrap().bin, 1);
        // Nothing left above the threshold: fall back to the raw maximum.
        let small = vec![0, 9, 4, 0];
        assert_eq!(ThresholdPeakFinder::new(5).find_peak(&small).unwrap().bin, 1);
    }

    #[test]
    fn test_overflow_and_zero_bins_never_peak() {
        let counts = vec![1_000, 0, 0, 7, 0, 5_000];
        assert_eq!(raw_peak(&counts), Some(Peak { bin: 3, count: 7 }));
    }

    #[test]
    fn test_empty_counts() {
        assert_eq!(raw_peak(&[]), None);
        assert_eq!(raw_peak(&[0, 0, 0]), None);
        assert_eq!(ValleyPeakFinder.find_peak(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn test_ties_prefer_higher_bin() {
        let counts = vec![0, 4, 9, 9, 1, 0];
        assert_eq!(raw_peak(&counts).unwrap().bin, 3);
    }

    #[test]
    fn test_secondary_peak() {
        let mut counts = vec![0u64; 50];
        counts[10] = 100;
        counts[11] = 40;
        counts[12] = 10;
        counts[19] = 15;
        counts[20] = 30;
        counts[21] = 5;
        let main = Peak { bin: 10, count: 100 };
        assert_eq!(secondary_peak(&counts, main, 0.1), Some(Peak { bin: 20, count: 30 }));
        assert_eq!(secondary_peak(&counts, main, 0.5), None);
        assert_eq!(secondary_peak(&counts, main, 0.0), None);
    }

    #[test]
    fn test_decaying_tail_is_not_secondary() {
        let counts = vec![0, 10, 100, 80, 60, 40, 20, 0];
        let main = Peak { bin: 2, count: 100 };
        assert_eq!(secondary_peak(&counts, main, 0.1), None);
    }
}
