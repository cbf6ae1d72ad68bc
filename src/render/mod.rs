//! Spectrum plot rendering.
//!
//! [`panel`] computes the data of every curve; [`draw`] turns it into a PNG
//! or SVG file.

pub mod draw;
pub mod panel;

pub use draw::{render_to_file, render_to_temp, PlotRequest};
pub use panel::{PanelData, ReportData};

use crate::config::{OutputFormat, PlotConfig};
use crate::error::Result;
use crate::histogram::Histogram;
use crate::merge::Classifier;
use crate::scale::ScaleSpec;
use std::path::Path;
use tempfile::NamedTempFile;

/// Plot `hist` with the panel layout of `classifier`.
///
/// The finished image is left in a temporary file beside `output`; the
/// caller persists it once every other artifact of the run is ready.
pub fn render_spectrum_to_temp(
    hist: &Histogram,
    classifier: &dyn Classifier,
    assemblies: &[String],
    config: &PlotConfig,
    scale: ScaleSpec,
    output: &Path,
) -> Result<(NamedTempFile, OutputFormat)> {
    let panels: Vec<PanelData> = classifier
        .panels(assemblies)
        .iter()
        .map(|spec| PanelData::project(hist, spec, scale.x_max))
        .collect();
    let report = config
        .unique_report
        .then(|| ReportData::new(classifier.unique_report(hist)));
    let styles = config.styles.resolved();
    let format = config.format_for(output);

    let request = PlotRequest {
        config,
        styles: &styles,
        panels: &panels,
        report: report.as_ref(),
        scale,
    };
    let tmp = render_to_temp(&request, output, format)?;
    Ok((tmp, format))
}
