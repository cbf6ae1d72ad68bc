//! Run configuration for spectrum plots.
//!
//! Everything here is plain data with defaults and `with_*` builders. The
//! configuration is validated as a whole before any table is opened, so a
//! bad option never costs a merge.

use crate::error::{Result, SpectrumError};
use crate::histogram::DEFAULT_CAP;
use crate::scale::ScaleConfig;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_WIDTH: f64 = 6.0;
pub const DEFAULT_HEIGHT: f64 = 4.5;
pub const DEFAULT_DPI: u32 = 100;
/// Largest panel edge in pixels.
pub const MAX_PANEL_PIXELS: u32 = 8192;

/// How the series of a panel are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlotStyle {
    Line,
    Fill,
    Stack,
}

impl PlotStyle {
    /// Fixed row order of the plot grid.
    pub const ALL: [PlotStyle; 3] = [PlotStyle::Line, PlotStyle::Fill, PlotStyle::Stack];

    pub fn name(self) -> &'static str {
        match self {
            PlotStyle::Line => "line",
            PlotStyle::Fill => "fill",
            PlotStyle::Stack => "stack",
        }
    }
}

impl fmt::Display for PlotStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlotStyle {
    type Err = SpectrumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "line" | "l" => Ok(PlotStyle::Line),
            "fill" | "f" => Ok(PlotStyle::Fill),
            "stack" | "s" => Ok(PlotStyle::Stack),
            other => Err(SpectrumError::InvalidInput(format!(
                "unknown plot style '{other}' (expected line, fill or stack)"
            ))),
        }
    }
}

/// Requested styles. Empty means every style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSet(Vec<PlotStyle>);

impl StyleSet {
    pub fn new(styles: impl IntoIterator<Item = PlotStyle>) -> Self {
        let mut v: Vec<PlotStyle> = styles.into_iter().collect();
        v.sort();
        v.dedup();
        Self(v)
    }

    /// Styles to draw, in grid row order.
    pub fn resolved(&self) -> Vec<PlotStyle> {
        if self.0.is_empty() {
            PlotStyle::ALL.to_vec()
        } else {
            self.0.clone()
        }
    }
}

/// Artifact encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Svg => "svg",
        }
    }

    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(OutputFormat::Png),
            "svg" => Some(OutputFormat::Svg),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = SpectrumError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "svg" => Ok(OutputFormat::Svg),
            other => Err(SpectrumError::InvalidInput(format!(
                "unknown output format '{other}' (expected png or svg)"
            ))),
        }
    }
}

/// Geometry and encoding of the plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    /// Inches per panel.
    pub width: f64,
    /// Inches per panel.
    pub height: f64,
    pub dpi: u32,
    pub styles: StyleSet,
    /// None infers from the output path.
    pub format: Option<OutputFormat>,
    /// Draw the assembly-only bar strip.
    pub unique_report: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            dpi: DEFAULT_DPI,
            styles: StyleSet::default(),
            format: None,
            unique_report: false,
        }
    }
}

impl PlotConfig {
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_styles(mut self, styles: StyleSet) -> Self {
        self.styles = styles;
        self
    }

    pub fn with_format(mut self, format: Option<OutputFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn with_unique_report(mut self, enabled: bool) -> Self {
        self.unique_report = enabled;
        self
    }

    /// Explicit format, else the output extension, else PNG.
    pub fn format_for(&self, output: &Path) -> OutputFormat {
        self.format
            .or_else(|| OutputFormat::from_path(output))
            .unwrap_or(OutputFormat::Png)
    }

    /// Pixel size of one panel.
    pub fn panel_pixels(&self) -> (u32, u32) {
        let px = |inches: f64| ((inches * self.dpi as f64).round() as u32).max(1);
        (px(self.width), px(self.height))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("width", self.width), ("height", self.height)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(SpectrumError::InvalidInput(format!(
                    "plot {name} must be positive, got {v}"
                )));
            }
        }
        if self.dpi == 0 {
            return Err(SpectrumError::InvalidInput("dpi must be positive".to_string()));
        }
        for (name, v) in [("width", self.width), ("height", self.height)] {
            let pixels = v * self.dpi as f64;
            if pixels.round() > MAX_PANEL_PIXELS as f64 {
                return Err(SpectrumError::InvalidInput(format!(
                    "plot {name} of {v} in at {} dpi exceeds {MAX_PANEL_PIXELS} pixels",
                    self.dpi
                )));
            }
        }
        Ok(())
    }
}

/// Full configuration of one spectrum run.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumConfig {
    pub plot: PlotConfig,
    pub scale: ScaleConfig,
    /// Overflow bin.
    pub cap: u32,
    /// Key-range partitions for the sharded merge; None picks from the pool size.
    pub shards: Option<usize>,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            plot: PlotConfig::default(),
            scale: ScaleConfig::default(),
            cap: DEFAULT_CAP,
            shards: None,
        }
    }
}

impl SpectrumConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plot(mut self, plot: PlotConfig) -> Self {
        self.plot = plot;
        self
    }

    pub fn with_scale(mut self, scale: ScaleConfig) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_cap(mut self, cap: u32) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_shards(mut self, shards: Option<usize>) -> Self {
        self.shards = shards;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.scale.validate()?;
        self.plot.validate()?;
        if self.cap == 0 {
            return Err(SpectrumError::InvalidInput("cap must be at least 1".to_string()));
        }
        if self.shards == Some(0) {
            return Err(SpectrumError::InvalidInput("shards must be at least 1".to_string()));
        }
        Ok(())
    }
}
