//! Axis extents for spectrum plots.
//!
//! Absolute limits win verbatim. Otherwise the extents are multiples of the
//! aggregate peak: `x = ceil(x_rel * peak bin)`, `y = ceil(y_rel * peak count)`.
//! Every panel of one plot shares the resolved extents.

use crate::error::{Result, SpectrumError};
use crate::histogram::{Histogram, SeriesSelector};
use crate::peak::{secondary_peak, PeakFinder, ThresholdPeakFinder, ValleyPeakFinder};
use tracing::{debug, warn};

pub const DEFAULT_X_REL: f64 = 2.1;
pub const DEFAULT_Y_REL: f64 = 1.1;
/// Secondary peaks at least this fraction of the main peak widen the x axis.
pub const DEFAULT_SECONDARY_FRACTION: f64 = 0.1;
/// Extent used on both axes when the histogram has no peak.
pub const DEFAULT_EXTENT: u64 = 10;

/// Requested scaling, before any data is seen.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleConfig {
    pub x_max: Option<u64>,
    pub y_max: Option<u64>,
    pub x_rel: f64,
    pub y_rel: f64,
    /// Low bins the peak search skips; None walks down the error tail instead.
    pub noise_bins: Option<usize>,
    /// 0 disables secondary-peak widening.
    pub secondary_fraction: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            x_max: None,
            y_max: None,
            x_rel: DEFAULT_X_REL,
            y_rel: DEFAULT_Y_REL,
            noise_bins: None,
            secondary_fraction: DEFAULT_SECONDARY_FRACTION,
        }
    }
}

impl ScaleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_x_max(mut self, x_max: Option<u64>) -> Self {
        self.x_max = x_max;
        self
    }

    pub fn with_y_max(mut self, y_max: Option<u64>) -> Self {
        self.y_max = y_max;
        self
    }

    pub fn with_x_rel(mut self, x_rel: f64) -> Self {
        self.x_rel = x_rel;
        self
    }

    pub fn with_y_rel(mut self, y_rel: f64) -> Self {
        self.y_rel = y_rel;
        self
    }

    pub fn with_noise_bins(mut self, noise_bins: Option<usize>) -> Self {
        self.noise_bins = noise_bins;
        self
    }

    pub fn with_secondary_fraction(mut self, fraction: f64) -> Self {
        self.secondary_fraction = fraction;
        self
    }

    /// Reject impossible settings before any table is opened.
    pub fn validate(&self) -> Result<()> {
        if self.x_max == Some(0) {
            return Err(SpectrumError::InvalidScale("x max must be positive".to_string()));
        }
        if self.y_max == Some(0) {
            return Err(SpectrumError::InvalidScale("y max must be positive".to_string()));
        }
        for (name, v) in [("x", self.x_rel), ("y", self.y_rel)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(SpectrumError::InvalidScale(format!(
                    "{name} relative factor must be positive, got {v}"
                )));
            }
        }
        if !(self.secondary_fraction.is_finite() && self.secondary_fraction >= 0.0) {
            return Err(SpectrumError::InvalidScale(format!(
                "secondary peak fraction must be >= 0, got {}",
                self.secondary_fraction
            )));
        }
        Ok(())
    }

    /// Peak strategy selected by `noise_bins`.
    pub fn peak_finder(&self) -> Box<dyn PeakFinder> {
        match self.noise_bins {
            Some(skip) => Box::new(ThresholdPeakFinder::new(skip)),
            None => Box::new(ValleyPeakFinder),
        }
    }
}

/// Resolved extents, both at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleSpec {
    pub x_max: u64,
    pub y_max: u64,
}

/// Round up, forgiving floating-point noise just above an integer.
fn ceil_scaled(factor: f64, value: f64) -> u64 {
    let v = factor * value;
    ((v - 1e-9).ceil().max(1.0)) as u64
}

/// Resolves a [`ScaleConfig`] against a finished histogram.
pub struct ScaleResolver<'a> {
    config: &'a ScaleConfig,
    finder: Box<dyn PeakFinder>,
}

impl<'a> ScaleResolver<'a> {
    pub fn new(config: &'a ScaleConfig) -> Self {
        Self {
            config,
            finder: config.peak_finder(),
        }
    }

    /// Replace the peak strategy.
    pub fn with_finder(mut self, finder: Box<dyn PeakFinder>) -> Self {
        self.finder = finder;
        self
    }

    pub fn resolve(&self, hist: &Histogram) -> ScaleSpec {
        let counts = hist.series(SeriesSelector::Aggregate);
        let Some(peak) = self.finder.find_peak(&counts) else {
            if hist.is_empty() {
                warn!("histogram is empty; using default plot extents");
            } else {
                warn!("no k-mers present in the reads; using default plot extents");
            }
            return ScaleSpec {
                x_max: self.config.x_max.unwrap_or(DEFAULT_EXTENT),
                y_max: self.config.y_max.unwrap_or(DEFAULT_EXTENT),
            };
        };

        let x_basis = match secondary_peak(&counts, peak, self.config.secondary_fraction) {
            Some(second) => {
                debug!(main = peak.bin, secondary = second.bin, "secondary peak widens x axis");
                (peak.bin + second.bin) as f64 / 2.0
            }
            None => peak.bin as f64,
        };
        let spec = ScaleSpec {
            x_max: self
                .config
                .x_max
                .unwrap_or_else(|| ceil_scaled(self.config.x_rel, x_basis)),
            y_max: self
                .config
                .y_max
                .unwrap_or_else(|| ceil_scaled(self.config.y_rel, peak.count as f64)),
        };
        debug!(
            peak_bin = peak.bin,
            peak_count = peak.count,
            x_max = spec.x_max,
            y_max = spec.y_max,
            "resolved scale"
        );
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::CategoryInfo;

    fn hist_with(points: &[(u32, u64)]) -> Histogram {
        let mut h = Histogram::new(
            vec![CategoryInfo::new("read-only", true), CategoryInfo::new("asm-only", false)],
            200,
        );
        for &(bin, n) in points {
            for _ in 0..n {
                h.record(bin, 0);
            }
        }
        h
    }

    #[test]
    fn test_relative_scale() {
        let h = hist_with(&[(1, 50), (2, 10), (29, 80), (30, 100), (31, 70)]);
        let config = ScaleConfig::default();
        let spec = ScaleResolver::new(&config).resolve(&h);
        assert_eq!(spec, ScaleSpec { x_max: 63, y_max: 110 });
    }

    #[test]
    fn test_absolute_wins() {
        let h = hist_with(&[(30, 100)]);
        let config = ScaleConfig::new().with_x_max(Some(45)).with_y_max(Some(7));
        let spec = ScaleResolver::new(&config).resolve(&h);
        assert_eq!(spec, ScaleSpec { x_max: 45, y_max: 7 });
    }

    #[test]
    fn test_empty_histogram_defaults() {
        let h = hist_with(&[]);
        let config = ScaleConfig::default();
        assert_eq!(
            ScaleResolver::new(&config).resolve(&h),
            ScaleSpec { x_max: 10, y_max: 10 }
        );
        let config = ScaleConfig::new().with_y_max(Some(3));
        assert_eq!(
            ScaleResolver::new(&config).resolve(&h),
            ScaleSpec { x_max: 10, y_max: 3 }
        );
    }

    #[test]
    fn test_assembly_only_data_uses_defaults() {
        let mut h = hist_with(&[]);
        h.record(0, 1);
        let config = ScaleConfig::default();
        assert_eq!(
            ScaleResolver::new(&config).resolve(&h),
            ScaleSpec { x_max: 10, y_max: 10 }
        );
    }

    #[test]
    fn test_secondary_peak_widens_x() {
        // Main peak at 20, secondary at 40 reaching 50% of it.
        let h = hist_with(&[(19, 50), (20, 100), (21, 50), (39, 20), (40, 50), (41, 20)]);
        let config = ScaleConfig::default();
        let spec = ScaleResolver::new(&config).resolve(&h);
        assert_eq!(spec.x_max, 63);

        let config = ScaleConfig::new().with_secondary_fraction(0.0);
        assert_eq!(ScaleResolver::new(&config).resolve(&h).x_max, 42);
    }

    #[test]
    fn test_resolved_extents_at_least_one() {
        let h = hist_with(&[(1, 1)]);
        let config = ScaleConfig::new().with_x_rel(0.01).with_y_rel(0.01);
        let spec = ScaleResolver::new(&config).resolve(&h);
        assert_eq!(spec, ScaleSpec { x_max: 1, y_max: 1 });
    }

    #[test]
    fn test_validate() {
        assert!(ScaleConfig::default().validate().is_ok());
        for bad in [
            ScaleConfig::new().with_x_rel(0.0),
            ScaleConfig::new().with_y_rel(-1.0),
            ScaleConfig::new().with_x_rel(f64::NAN),
            ScaleConfig::new().with_x_max(Some(0)),
            ScaleConfig::new().with_y_max(Some(0)),
            ScaleConfig::new().with_secondary_fraction(-0.5),
        ] {
            assert!(matches!(bad.validate(), Err(SpectrumError::InvalidScale(_))));
        }
    }

    #[test]
    fn test_noise_bins_selects_threshold() {
        let h = hist_with(&[(1, 500), (2, 400), (3, 450), (10, 100)]);
        // Valley walk stops at bin 3 (450 > 400) and takes 450.
        let config = ScaleConfig::new().with_secondary_fraction(0.0);
        assert_eq!(ScaleResolver::new(&config).resolve(&h).y_max, 495);
        let config = config.with_noise_bins(Some(3));
        let spec = ScaleResolver::new(&config).resolve(&h);
        assert_eq!(spec, ScaleSpec { x_max: 21, y_max: 110 });
    }
}
