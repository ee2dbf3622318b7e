//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during preparation and fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which count column of the surveillance snapshots to analyze.
///
/// Snapshot files carry `Confirmed`, `Deaths`, and `Recovered` totals; one
/// run analyzes exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CountColumn {
    Confirmed,
    Deaths,
    Recovered,
}

impl CountColumn {
    /// Normalized CSV header name for this column.
    pub fn header(self) -> &'static str {
        match self {
            CountColumn::Confirmed => "confirmed",
            CountColumn::Deaths => "deaths",
            CountColumn::Recovered => "recovered",
        }
    }
}

/// Gap interpolation policy for missing dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GapFill {
    /// Insert missing dates with a count of zero.
    ZeroFill,
    /// Insert missing dates with values interpolated linearly between the
    /// surrounding observations.
    LinearInterpolate,
    /// Leave gaps as-is (dates stay strictly increasing but not contiguous).
    Drop,
}

/// Growth model family fitted to a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `f(t) = L / (1 + exp(-k (t - t0)))`
    Logistic,
    /// `f(t) = a * exp(r t)`
    Exponential,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic",
            ModelKind::Exponential => "exponential",
        }
    }

    /// Number of free parameters for this model.
    pub fn param_count(self) -> usize {
        match self {
            ModelKind::Logistic => 3,
            ModelKind::Exponential => 2,
        }
    }

    /// Stable parameter names, in positional order.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Logistic => &["L", "k", "t0"],
            ModelKind::Exponential => &["a", "r"],
        }
    }
}

/// Whether a series holds cumulative totals or daily deltas.
///
/// Carrying this tag on the series is what makes cumulative-to-daily
/// conversion idempotent: converting an already-daily series is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Cumulative,
    Daily,
}

/// A single dated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub count: f64,
}

/// Ordered case counts for a single region.
///
/// Invariants, enforced by [`TimeSeries::new`]:
///
/// - dates strictly increasing
/// - counts non-negative and finite
///
/// A series is constructed once per run from raw input and is immutable
/// afterwards; preparation produces a new series rather than mutating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    region: String,
    kind: SeriesKind,
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Validate and construct a series. The error string names the first
    /// violated invariant; callers wrap it into their stage error.
    pub fn new(
        region: String,
        kind: SeriesKind,
        observations: Vec<Observation>,
    ) -> Result<Self, String> {
        for w in observations.windows(2) {
            if w[1].date <= w[0].date {
                return Err(format!(
                    "dates are not strictly increasing ({} then {})",
                    w[0].date, w[1].date
                ));
            }
        }
        for o in &observations {
            if !o.count.is_finite() || o.count < 0.0 {
                return Err(format!(
                    "negative or non-finite count {} on {}",
                    o.count, o.date
                ));
            }
        }
        Ok(Self {
            region,
            kind,
            observations,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn kind(&self) -> SeriesKind {
        self.kind
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Observation times as whole days since the first observation, paired
    /// with counts. This is the `(t, y)` view the fitter and plots consume.
    pub fn days_and_counts(&self) -> (Vec<f64>, Vec<f64>) {
        let Some(start) = self.start_date() else {
            return (Vec::new(), Vec::new());
        };
        let ts = self
            .observations
            .iter()
            .map(|o| (o.date - start).num_days() as f64)
            .collect();
        let ys = self.observations.iter().map(|o| o.count).collect();
        (ts, ys)
    }
}

/// Which pipeline stages to run, selected by the CLI mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// `-p`: load + prepare, print series stats.
    PrepareOnly,
    /// `-s`: load + prepare + plot (no fit overlay).
    PlotOnly,
    /// `-a`: load + prepare + fit (no plots).
    FitOnly,
    /// No mode flag: run every stage.
    All,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    /// Sum of squared residuals at the accepted parameters.
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
    /// Optimizer iterations actually performed.
    pub iterations: usize,
}

/// Fitted model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedCurve {
    pub kind: ModelKind,
    pub params: Vec<f64>,
}

impl FittedCurve {
    /// Parameter values paired with their stable names.
    pub fn named_params(&self) -> Vec<(&'static str, f64)> {
        self.kind
            .param_names()
            .iter()
            .copied()
            .zip(self.params.iter().copied())
            .collect()
    }
}

/// Fit output for a single region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub region: String,
    /// Date anchoring `t = 0` in model time.
    pub start_date: NaiveDate,
    /// Days covered by the fitted observations.
    pub span_days: f64,
    pub model: FittedCurve,
    pub quality: FitQuality,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Only analyze this region (case-insensitive match).
    pub region: Option<String>,
    pub column: CountColumn,
    pub gap_fill: GapFill,
    /// Convert cumulative counts to daily deltas during preparation.
    pub daily: bool,
    pub model: ModelKind,

    pub max_iters: usize,
    pub tol: f64,
    /// Optional explicit initial guess; validated against the model's
    /// parameter count by the fitter.
    pub initial_guess: Option<Vec<f64>>,

    pub plot_width: u32,
    pub plot_height: u32,

    pub export_prepared: Option<PathBuf>,
    pub export_fit: Option<PathBuf>,
}
