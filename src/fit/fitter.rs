//! Levenberg-Marquardt fitting of a growth model to a prepared series.
//!
//! Given observation times `t_i` (days since the first observation) and
//! counts `y_i`, we minimize the sum of squared residuals
//!
//! ```text
//! SSE(θ) = Σ (y_i - f(t_i; θ))²
//! ```
//!
//! by damped Gauss-Newton steps: each iteration solves the augmented linear
//! least-squares problem `[J; sqrt(λ) I] δ = [r; 0]` for the step `δ`.
//! Accepted steps shrink the damping λ, rejected steps grow it. The fit is a
//! pure function of (series, model, options): no randomness, no side effects.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{FitQuality, FitResult, FittedCurve, ModelKind, TimeSeries};
use crate::error::AppError;
use crate::math::solve_least_squares;
use crate::models::{fill_jacobian_row, initial_guess, predict};

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;

/// Fitting options that affect how a model is calibrated.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Maximum optimizer iterations before reporting non-convergence.
    pub max_iters: usize,
    /// Convergence tolerance, applied to both the relative SSE improvement
    /// and the relative size of an accepted step.
    pub tol: f64,
    /// Explicit starting parameters; when absent the guess is derived from
    /// the data.
    pub initial_guess: Option<Vec<f64>>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iters: 20_000,
            tol: 1e-8,
            initial_guess: None,
        }
    }
}

/// Fit a growth model to a single series.
pub fn fit_series(
    series: &TimeSeries,
    model: ModelKind,
    opts: &FitOptions,
) -> Result<FitResult, AppError> {
    let (ts, ys) = series.days_and_counts();
    let n = ts.len();
    let p = model.param_count();

    if n < p {
        return Err(AppError::Convergence(format!(
            "region '{}': {n} point(s) cannot identify the {} model ({p} parameters)",
            series.region(),
            model.display_name(),
        )));
    }
    let Some(start_date) = series.start_date() else {
        return Err(AppError::Convergence(format!(
            "region '{}': empty series",
            series.region()
        )));
    };

    let mut params = match &opts.initial_guess {
        Some(guess) => {
            if guess.len() != p {
                return Err(AppError::Usage(format!(
                    "--guess expects {p} value(s) for the {} model, got {}",
                    model.display_name(),
                    guess.len()
                )));
            }
            guess.clone()
        }
        None => initial_guess(model, &ts, &ys)
            .map_err(|msg| AppError::Convergence(format!("region '{}': {msg}", series.region())))?,
    };

    let mut sse = sum_sq_residuals(model, &ts, &ys, &params);
    if !sse.is_finite() {
        return Err(AppError::Convergence(format!(
            "region '{}': non-finite residuals at the starting parameters",
            series.region()
        )));
    }

    let mut lambda = LAMBDA_INIT;
    for iter in 1..=opts.max_iters {
        let step = lm_step(model, &ts, &ys, &params, lambda);

        let Some(delta) = step else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Err(AppError::Convergence(format!(
                    "region '{}': damped step became unsolvable after {iter} iteration(s)",
                    series.region()
                )));
            }
            continue;
        };

        let trial: Vec<f64> = params
            .iter()
            .zip(delta.iter())
            .map(|(v, d)| v + d)
            .collect();
        let trial_sse = sum_sq_residuals(model, &ts, &ys, &trial);

        let improved = trial_sse.is_finite() && trial_sse < sse;
        let delta_sse = if trial_sse.is_finite() {
            (sse - trial_sse).abs()
        } else {
            f64::INFINITY
        };
        let step_norm = delta.norm();

        if improved {
            params = trial;
            sse = trial_sse;
            lambda = (lambda * 0.1).max(LAMBDA_MIN);
        }

        debug!(
            region = series.region(),
            iter, sse, lambda, improved, "optimizer step"
        );

        // Two stopping tests. A small SSE change covers a smooth optimum and
        // a start that is already optimal. A small accepted step covers
        // weakly identified parameters, where SSE keeps improving by
        // vanishing amounts while one parameter drifts along a flat valley
        // (a logistic capacity on near-exponential data never settles under
        // the SSE test alone).
        let param_norm = params.iter().map(|v| v * v).sum::<f64>().sqrt();
        let small_step = improved && step_norm <= opts.tol * (param_norm + opts.tol);
        let small_gain = delta_sse <= opts.tol * (sse + opts.tol);
        if small_step || small_gain {
            let span_days = ts.last().copied().unwrap_or(0.0);
            let rmse = (sse / n as f64).sqrt();
            return Ok(FitResult {
                region: series.region().to_string(),
                start_date,
                span_days,
                model: FittedCurve {
                    kind: model,
                    params,
                },
                quality: FitQuality {
                    sse,
                    rmse,
                    n,
                    iterations: iter,
                },
            });
        }

        if !improved {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                return Err(AppError::Convergence(format!(
                    "region '{}': no descent direction after {iter} iteration(s) (SSE={sse:.6})",
                    series.region()
                )));
            }
        }
    }

    Err(AppError::Convergence(format!(
        "region '{}': no convergence within {} iterations (SSE={sse:.6})",
        series.region(),
        opts.max_iters
    )))
}

/// Solve one damped step `[J; sqrt(λ) I] δ = [r; 0]`.
fn lm_step(
    model: ModelKind,
    ts: &[f64],
    ys: &[f64],
    params: &[f64],
    lambda: f64,
) -> Option<DVector<f64>> {
    let n = ts.len();
    let p = params.len();

    let mut a = DMatrix::<f64>::zeros(n + p, p);
    let mut b = DVector::<f64>::zeros(n + p);
    let mut row = vec![0.0; p];

    for i in 0..n {
        fill_jacobian_row(model, ts[i], params, &mut row);
        for j in 0..p {
            a[(i, j)] = row[j];
        }
        b[i] = ys[i] - predict(model, ts[i], params);
    }

    let damp = lambda.sqrt();
    for j in 0..p {
        a[(n + j, j)] = damp;
    }

    if a.iter().any(|v| !v.is_finite()) || b.iter().any(|v| !v.is_finite()) {
        return None;
    }

    solve_least_squares(&a, &b)
}

fn sum_sq_residuals(model: ModelKind, ts: &[f64], ys: &[f64], params: &[f64]) -> f64 {
    let mut sse = 0.0;
    for (&t, &y) in ts.iter().zip(ys.iter()) {
        let r = y - predict(model, t, params);
        sse += r * r;
    }
    sse
}
