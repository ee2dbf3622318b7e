//! Shared pipeline logic: load -> prepare -> {fit, plot}.
//!
//! Keeping this in one place means every run mode exercises the same stage
//! implementations; modes only choose which tail stages execute. The
//! pipeline is a straight-line sequence: each stage either completes or
//! fails the run.

use std::path::PathBuf;

use rayon::prelude::*;
use tracing::info;

use crate::domain::{FitResult, RunConfig, RunMode, TimeSeries};
use crate::error::AppError;
use crate::fit::{FitOptions, fit_series};
use crate::plot::PlotOptions;
use crate::prepare::{PrepareOptions, prepare_series};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub prepared: Vec<TimeSeries>,
    pub fits: Vec<FitResult>,
    pub plots: Vec<PathBuf>,
}

/// Execute the pipeline stages selected by `config.mode`.
pub fn execute(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) Load raw snapshots into one cumulative series per region.
    let mut series = crate::io::loader::load_series(&config.data_dir, config.column)?;

    // 2) Optional region filter.
    if let Some(region) = &config.region {
        series.retain(|s| s.region().eq_ignore_ascii_case(region));
        if series.is_empty() {
            return Err(AppError::Prepare(format!(
                "no series matches region '{region}'"
            )));
        }
    }

    // 3) Prepare each series.
    let prep_opts = PrepareOptions {
        gap_fill: config.gap_fill,
        daily: config.daily,
    };
    let prepared = series
        .iter()
        .map(|s| prepare_series(s, &prep_opts))
        .collect::<Result<Vec<_>, _>>()?;
    info!(regions = prepared.len(), "prepared series");

    // 4) Fit each prepared series (regions are independent, so in parallel).
    let fits = if matches!(config.mode, RunMode::FitOnly | RunMode::All) {
        let opts = FitOptions {
            max_iters: config.max_iters,
            tol: config.tol,
            initial_guess: config.initial_guess.clone(),
        };
        let fits = prepared
            .par_iter()
            .map(|s| fit_series(s, config.model, &opts))
            .collect::<Result<Vec<_>, _>>()?;
        info!(fits = fits.len(), model = config.model.display_name(), "fitted series");
        fits
    } else {
        Vec::new()
    };

    // 5) Plot.
    let plots = if matches!(config.mode, RunMode::PlotOnly | RunMode::All) {
        let opts = PlotOptions {
            width: config.plot_width,
            height: config.plot_height,
        };
        crate::plot::render_all(&config.out_dir, &prepared, &fits, config.column, &opts)?
    } else {
        Vec::new()
    };

    Ok(RunOutput {
        prepared,
        fits,
        plots,
    })
}
