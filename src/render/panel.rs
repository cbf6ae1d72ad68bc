//! Plot-ready series, computed without touching a drawing backend.

use crate::merge::classify::PanelSpec;
use crate::histogram::Histogram;

/// Series of one panel over bins `0..=x_max` (clipped to the overflow bin).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelData {
    pub title: String,
    pub labels: Vec<String>,
    /// One per-bin count vector per series, in stacking order.
    pub series: Vec<Vec<u64>>,
}

impl PanelData {
    /// Project `hist` onto the series of `spec`.
    pub fn project(hist: &Histogram, spec: &PanelSpec, x_max: u64) -> Self {
        let last = (x_max.min(hist.cap() as u64)) as usize;
        let series = spec
            .series
            .iter()
            .map(|s| {
                let mut counts = hist.sum_counts(&s.categories);
                counts.truncate(last + 1);
                counts
            })
            .collect();
        Self {
            title: spec.title.clone(),
            labels: spec.series.iter().map(|s| s.label.clone()).collect(),
            series,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.series.first().map_or(0, Vec::len)
    }

    /// Cumulative series: entry i is the sum of series 0..=i.
    pub fn stacked(&self) -> Vec<Vec<u64>> {
        let mut out: Vec<Vec<u64>> = Vec::with_capacity(self.series.len());
        for s in &self.series {
            let next = match out.last() {
                Some(below) => below.iter().zip(s).map(|(a, b)| a + b).collect(),
                None => s.clone(),
            };
            out.push(next);
        }
        out
    }

    /// Per-bin sum over all series.
    pub fn totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.num_bins()];
        for s in &self.series {
            for (t, c) in totals.iter_mut().zip(s) {
                *t += c;
            }
        }
        totals
    }

    /// (bin, count) points of one count vector.
    pub fn points(counts: &[u64]) -> Vec<(f64, f64)> {
        counts
            .iter()
            .enumerate()
            .map(|(bin, &c)| (bin as f64, c as f64))
            .collect()
    }
}

/// Bars of the unique-kmer strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportData {
    pub bars: Vec<(String, u64)>,
}

impl ReportData {
    pub fn new(bars: Vec<(String, u64)>) -> Self {
        Self { bars }
    }

    /// Largest bar, at least 1 so an empty report still has an axis.
    pub fn y_max(&self) -> u64 {
        self.bars.iter().map(|(_, v)| *v).max().unwrap_or(0).max(1)
    }
}
