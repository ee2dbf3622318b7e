//! SVG chart rendering for prepared series and fitted curves.
//!
//! Each region gets one chart: a scatter of observed counts against days
//! since the first observation, with an optional fitted-curve overlay. SVG
//! keeps the output a small vector document with no native font or raster
//! dependencies.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::domain::{CountColumn, FitResult, TimeSeries};
use crate::error::AppError;
use crate::models::predict;

#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Render one SVG per series into `out_dir` and return the written paths.
///
/// `fits` is matched to series by region; a series without a fit is plotted
/// as a plain scatter.
pub fn render_all(
    out_dir: &Path,
    series: &[TimeSeries],
    fits: &[FitResult],
    column: CountColumn,
    opts: &PlotOptions,
) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(out_dir).map_err(|e| {
        AppError::Render(format!(
            "failed to create output directory '{}': {e}",
            out_dir.display()
        ))
    })?;

    let mut written = Vec::with_capacity(series.len());
    for s in series {
        let fit = fits.iter().find(|f| f.region == s.region());
        let path = out_dir.join(plot_file_name(s.region(), column));
        render_series(&path, s, fit, column, opts)?;
        info!(region = s.region(), path = %path.display(), "wrote plot");
        written.push(path);
    }
    Ok(written)
}

/// Filesystem-safe plot file name for a region/column pair.
pub fn plot_file_name(region: &str, column: CountColumn) -> String {
    let slug: String = region
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{slug}_{}.svg", column.header())
}

/// Render a single chart. An empty series still produces a valid (empty)
/// chart rather than failing.
pub fn render_series(
    path: &Path,
    series: &TimeSeries,
    fit: Option<&FitResult>,
    column: CountColumn,
    opts: &PlotOptions,
) -> Result<(), AppError> {
    let root = SVGBackend::new(path, (opts.width, opts.height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| render_err(path, &e))?;

    let (ts, ys) = series.days_and_counts();
    let points: Vec<(f64, f64)> = ts.iter().copied().zip(ys.iter().copied()).collect();

    let (x_max, y_max) = axis_bounds(&points, fit);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} - {}", series.region(), column.header()),
            ("sans-serif", 24),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)
        .map_err(|e| render_err(path, &e))?;

    chart
        .configure_mesh()
        .x_desc("days since first observation")
        .y_desc(column.header())
        .draw()
        .map_err(|e| render_err(path, &e))?;

    let has_points = !points.is_empty();
    if has_points {
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(t, y)| Circle::new((t, y), 3, BLUE.filled())),
            )
            .map_err(|e| render_err(path, &e))?
            .label("observed")
            .legend(|(x, y)| Circle::new((x, y), 3, BLUE.filled()));
    }

    if let Some(fit) = fit {
        let steps = 200;
        let curve = (0..=steps).map(|i| {
            let t = x_max * i as f64 / steps as f64;
            (t, predict(fit.model.kind, t, &fit.model.params))
        });
        chart
            .draw_series(LineSeries::new(curve, &RED))
            .map_err(|e| render_err(path, &e))?
            .label(format!("{} fit", fit.model.kind.display_name()))
            .legend(|(x, y)| PathElement::new(vec![(x - 5, y), (x + 5, y)], RED));
    }

    if has_points || fit.is_some() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(|e| render_err(path, &e))?;
    }

    root.present().map_err(|e| render_err(path, &e))?;
    Ok(())
}

/// Axis upper bounds with padding; degenerate inputs fall back to a unit
/// chart so an empty series still renders.
fn axis_bounds(points: &[(f64, f64)], fit: Option<&FitResult>) -> (f64, f64) {
    let mut x_max = points.iter().map(|p| p.0).fold(0.0, f64::max);
    let mut y_max = points.iter().map(|p| p.1).fold(0.0, f64::max);

    if let Some(fit) = fit {
        x_max = x_max.max(fit.span_days);
        // The logistic plateau can exceed every observation.
        if let Some(&l) = fit.model.params.first() {
            if l.is_finite() {
                y_max = y_max.max(l.min(y_max * 4.0 + 1.0));
            }
        }
    }

    let x_max = if x_max > 0.0 { x_max * 1.05 } else { 1.0 };
    let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };
    (x_max, y_max)
}

fn render_err(path: &Path, e: &dyn std::fmt::Display) -> AppError {
    AppError::Render(format!("failed to render '{}': {e}", path.display()))
}
