//! Command-line parsing.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline/math code: flags are resolved into a `RunConfig` and nothing
//! here touches data.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{CountColumn, GapFill, ModelKind, RunConfig, RunMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "pandemic",
    version,
    about = "Pandemic case-count growth-curve fitter"
)]
pub struct Cli {
    /// Run the prepare stage only: load + prepare, print series stats.
    #[arg(short = 'p', long = "prepare-only", conflicts_with_all = ["plot_only", "fit_only"])]
    pub prepare_only: bool,

    /// Plot prepared series only (no fit overlay).
    #[arg(short = 's', long = "plot-only", conflicts_with = "fit_only")]
    pub plot_only: bool,

    /// Fit only (no plots).
    #[arg(short = 'a', long = "fit-only")]
    pub fit_only: bool,

    /// Directory of raw case-count CSV snapshot files.
    #[arg(long, value_name = "DIR")]
    pub data_dir: PathBuf,

    /// Directory for plot output.
    #[arg(long, value_name = "DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// Only analyze this region (e.g. `USA`), case-insensitive.
    #[arg(long)]
    pub region: Option<String>,

    /// Which count column to analyze.
    #[arg(long, value_enum, default_value_t = CountColumn::Confirmed)]
    pub column: CountColumn,

    /// Gap interpolation policy for missing dates.
    #[arg(long, value_enum, default_value_t = GapFill::LinearInterpolate)]
    pub gap_fill: GapFill,

    /// Convert cumulative counts to daily deltas before fitting/plotting.
    #[arg(long)]
    pub daily: bool,

    /// Growth model family to fit.
    #[arg(long, value_enum, default_value_t = ModelKind::Logistic)]
    pub model: ModelKind,

    /// Maximum optimizer iterations before giving up.
    #[arg(long, default_value_t = 20_000)]
    pub max_iters: usize,

    /// Convergence tolerance (relative SSE improvement or relative step size).
    #[arg(long, default_value_t = 1e-8)]
    pub tol: f64,

    /// Initial parameter guess, comma-separated
    /// (logistic: `L,k,t0`; exponential: `a,r`).
    #[arg(
        long,
        value_name = "PARAMS",
        value_delimiter = ',',
        allow_hyphen_values = true
    )]
    pub guess: Option<Vec<f64>>,

    /// Plot width in pixels.
    #[arg(long, default_value_t = 800)]
    pub plot_width: u32,

    /// Plot height in pixels.
    #[arg(long, default_value_t = 600)]
    pub plot_height: u32,

    /// Export prepared series to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_prepared: Option<PathBuf>,

    /// Export fit results (params + fitted grid) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_fit: Option<PathBuf>,
}

impl Cli {
    /// Resolve the mutually-exclusive mode flags (clap enforces exclusivity).
    pub fn run_mode(&self) -> RunMode {
        if self.prepare_only {
            RunMode::PrepareOnly
        } else if self.plot_only {
            RunMode::PlotOnly
        } else if self.fit_only {
            RunMode::FitOnly
        } else {
            RunMode::All
        }
    }

    pub fn to_config(&self) -> RunConfig {
        RunConfig {
            mode: self.run_mode(),
            data_dir: self.data_dir.clone(),
            out_dir: self.out_dir.clone(),
            region: self.region.clone(),
            column: self.column,
            gap_fill: self.gap_fill,
            daily: self.daily,
            model: self.model,
            max_iters: self.max_iters,
            tol: self.tol,
            initial_guess: self.guess.clone(),
            plot_width: self.plot_width,
            plot_height: self.plot_height,
            export_prepared: self.export_prepared.clone(),
            export_fit: self.export_fit.clone(),
        }
    }
}
