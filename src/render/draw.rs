//! Drawing panels with plotters.
//!
//! The grid has one row per style and one column per panel. The optional
//! unique-kmer strip spans the full width below it. Colours are indexed by
//! series position, so the same input always draws the same picture.

use super::panel::{PanelData, ReportData};
use crate::config::{OutputFormat, PlotConfig, PlotStyle};
use crate::error::{Result, SpectrumError};
use crate::scale::ScaleSpec;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::fmt::Display;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

const PALETTE: [RGBColor; 7] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0x7f, 0x7f, 0x7f),
];

const FONT: &str = "sans-serif";

/// DejaVu Sans, embedded so raster and vector text never depend on the
/// fonts installed on the host.
static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Register [`FONT_DATA`] with plotters once per process.
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| {
            plotters::style::register_font(FONT, FontStyle::Normal, FONT_DATA)
                .map_err(|_| "embedded font is not a valid TrueType file".to_string())
        })
        .clone()
        .map_err(SpectrumError::Render)
}

#[inline]
fn color(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

fn render_err<E: Display>(e: E) -> SpectrumError {
    SpectrumError::Render(e.to_string())
}

/// Everything one plot needs.
pub struct PlotRequest<'a> {
    pub config: &'a PlotConfig,
    pub styles: &'a [PlotStyle],
    pub panels: &'a [PanelData],
    pub report: Option<&'a ReportData>,
    pub scale: ScaleSpec,
}

impl PlotRequest<'_> {
    /// Total canvas size in pixels.
    pub fn canvas_size(&self) -> (u32, u32) {
        let (pw, ph) = self.config.panel_pixels();
        let cols = self.panels.len().max(1) as u32;
        let rows = self.styles.len().max(1) as u32;
        (
            pw.saturating_mul(cols),
            ph.saturating_mul(rows).saturating_add(self.strip_height()),
        )
    }

    fn strip_height(&self) -> u32 {
        if self.report.is_some() {
            self.config.panel_pixels().1 / 2
        } else {
            0
        }
    }
}

/// Render `request` to `output`.
///
/// The image is drawn into a temporary file beside `output` and only
/// renamed over it once drawing succeeded.
pub fn render_to_file(request: &PlotRequest<'_>, output: &Path, format: OutputFormat) -> Result<()> {
    let tmp = render_to_temp(request, output, format)?;
    tmp.persist(output).map_err(|e| SpectrumError::Io(e.error))?;
    Ok(())
}

/// Render `request` into a temporary file in the directory of `output`.
///
/// The caller decides when (and whether) to persist it.
pub fn render_to_temp(
    request: &PlotRequest<'_>,
    output: &Path,
    format: OutputFormat,
) -> Result<tempfile::NamedTempFile> {
    request.config.validate()?;
    ensure_font()?;
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".kspec-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(dir)?;

    let size = request.canvas_size();
    debug!(width = size.0, height = size.1, ?format, "rendering plot");
    match format {
        OutputFormat::Png => {
            let root = BitMapBackend::new(tmp.path(), size).into_drawing_area();
            draw(&root, request)?;
            root.present().map_err(render_err)?;
        }
        OutputFormat::Svg => {
            let root = SVGBackend::new(tmp.path(), size).into_drawing_area();
            draw(&root, request)?;
            root.present().map_err(render_err)?;
        }
    }

    Ok(tmp)
}

/// Draw the whole figure onto `root`.
pub fn draw<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, request: &PlotRequest<'_>) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(render_err)?;

    let strip = request.strip_height();
    let (_, total_h) = root.dim_in_pixel();
    let (grid, bottom) = root.split_vertically((total_h - strip) as i32);

    let rows = request.styles.len().max(1);
    let cols = request.panels.len().max(1);
    let cells = grid.split_evenly((rows, cols));
    for (r, &style) in request.styles.iter().enumerate() {
        for (c, panel) in request.panels.iter().enumerate() {
            draw_panel(&cells[r * cols + c], panel, style, request.scale)?;
        }
    }

    if let Some(report) = request.report {
        draw_report(&bottom, report)?;
    }
    Ok(())
}

fn clamp_points(counts: &[u64], y_max: u64) -> Vec<(f64, f64)> {
    let clipped: Vec<u64> = counts.iter().map(|&c| c.min(y_max)).collect();
    PanelData::points(&clipped)
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &PanelData,
    style: PlotStyle,
    scale: ScaleSpec,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .caption(format!("{} ({})", panel.title, style), (FONT, 16))
        .margin(8)
        .x_label_area_size(32)
        .y_label_area_size(56)
        .build_cartesian_2d(0f64..scale.x_max as f64, 0f64..scale.y_max as f64)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc("k-mer multiplicity")
        .y_desc("distinct k-mers")
        .label_style((FONT, 11))
        .draw()
        .map_err(render_err)?;

    match style {
        PlotStyle::Line => {
            for (i, (label, counts)) in panel.labels.iter().zip(&panel.series).enumerate() {
                let c = color(i);
                chart
                    .draw_series(LineSeries::new(clamp_points(counts, scale.y_max), c.stroke_width(2)))
                    .map_err(render_err)?
                    .label(label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], c.stroke_width(2)));
            }
        }
        PlotStyle::Fill => {
            for (i, (label, counts)) in panel.labels.iter().zip(&panel.series).enumerate() {
                let c = color(i);
                chart
                    .draw_series(
                        AreaSeries::new(clamp_points(counts, scale.y_max), 0.0, c.mix(0.3))
                            .border_style(c.stroke_width(1)),
                    )
                    .map_err(render_err)?
                    .label(label.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 16, y + 5)], c.mix(0.3).filled()));
            }
        }
        PlotStyle::Stack => {
            // Tallest layer first so each lower layer paints over it.
            let stacked = panel.stacked();
            for (i, (label, counts)) in panel.labels.iter().zip(&stacked).enumerate().rev() {
                let c = color(i);
                chart
                    .draw_series(
                        AreaSeries::new(clamp_points(counts, scale.y_max), 0.0, c.mix(0.85))
                            .border_style(c.stroke_width(1)),
                    )
                    .map_err(render_err)?
                    .label(label.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 16, y + 5)], c.filled()));
            }
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .label_font((FONT, 11))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;
    Ok(())
}

fn draw_report<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, report: &ReportData) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let n = report.bars.len().max(1);
    let y_max = report.y_max() as f64 * 1.1;
    let mut chart = ChartBuilder::on(area)
        .caption("k-mers absent from reads", (FONT, 14))
        .margin(8)
        .x_label_area_size(28)
        .y_label_area_size(56)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)
        .map_err(render_err)?;

    let labels: Vec<String> = report.bars.iter().map(|(l, _)| l.clone()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| {
            let idx = x.round();
            if (x - idx).abs() < 1e-6 && idx >= 0.0 {
                labels.get(idx as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        })
        .y_desc("distinct k-mers")
        .label_style((FONT, 11))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(report.bars.iter().enumerate().map(|(i, (_, v))| {
            let x = i as f64;
            Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *v as f64)], color(i).filled())
        }))
        .map_err(render_err)?;
    Ok(())
}
