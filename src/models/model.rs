//! Growth model evaluation.
//!
//! The fitter relies on three primitive operations:
//! - predict `f(t)` given parameters (for residuals/plots)
//! - fill a Jacobian row at `t` (for Levenberg-Marquardt steps)
//! - derive an initial parameter guess from the data

use crate::domain::ModelKind;
use crate::math::linear_regression;

/// Clamp for exponents so extreme trial parameters saturate instead of
/// producing inf/NaN mid-iteration.
const EXP_CLAMP: f64 = 500.0;

fn exp_clamped(x: f64) -> f64 {
    x.clamp(-EXP_CLAMP, EXP_CLAMP).exp()
}

/// Predict `f(t)` for the given model kind.
///
/// # Panics
/// Panics if `params` does not have length `model.param_count()`. Callers
/// should size the parameter vector correctly.
pub fn predict(model: ModelKind, t: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::Logistic => {
            let (l, k, t0) = (params[0], params[1], params[2]);
            l / (1.0 + exp_clamped(-k * (t - t0)))
        }
        ModelKind::Exponential => {
            let (a, r) = (params[0], params[1]);
            a * exp_clamped(r * t)
        }
    }
}

/// Fill a Jacobian row: partial derivatives of `f(t)` with respect to each
/// parameter, in positional order.
///
/// # Panics
/// Panics if `out` does not have length `model.param_count()`.
pub fn fill_jacobian_row(model: ModelKind, t: f64, params: &[f64], out: &mut [f64]) {
    match model {
        ModelKind::Logistic => {
            let (l, k, t0) = (params[0], params[1], params[2]);
            let e = exp_clamped(-k * (t - t0));
            let sig = 1.0 / (1.0 + e);
            // d/dx of the sigmoid body, shared by the k and t0 partials.
            let common = l * e * sig * sig;
            out[0] = sig;
            out[1] = common * (t - t0);
            out[2] = -common * k;
        }
        ModelKind::Exponential => {
            let (a, r) = (params[0], params[1]);
            let e = exp_clamped(r * t);
            out[0] = e;
            out[1] = a * t * e;
        }
    }
}

/// Derive an initial parameter guess from the observed data.
///
/// - Logistic: the carrying capacity starts slightly above the observed
///   maximum, then `k` and `t0` come from a linear regression of the
///   linearized form `ln(L/y - 1) = k*t0 - k*t`.
/// - Exponential: log-linear regression of `ln(y)` on `t`.
///
/// The error string names the reason no valid starting point exists; the
/// fitter wraps it into `AppError::Convergence` with region context.
pub fn initial_guess(model: ModelKind, ts: &[f64], ys: &[f64]) -> Result<Vec<f64>, String> {
    match model {
        ModelKind::Logistic => logistic_guess(ts, ys),
        ModelKind::Exponential => exponential_guess(ts, ys),
    }
}

fn logistic_guess(ts: &[f64], ys: &[f64]) -> Result<Vec<f64>, String> {
    let max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0) {
        return Err("logistic growth needs a non-zero scale; all counts are zero".to_string());
    }

    // Start the plateau slightly above the observed maximum so the
    // linearization below is defined for every positive observation.
    let l = max * 1.05;

    let mut zts = Vec::new();
    let mut zs = Vec::new();
    for (&t, &y) in ts.iter().zip(ys.iter()) {
        if y > 0.0 && y < l {
            zts.push(t);
            zs.push((l / y - 1.0).ln());
        }
    }

    match linear_regression(&zts, &zs) {
        // z = intercept + slope*t with slope = -k; z crosses zero at t0.
        Some((intercept, slope)) if slope < 0.0 => {
            let k = -slope;
            Ok(vec![l, k, intercept / k])
        }
        _ => {
            // Degenerate linearization (flat or rising z): fall back to a
            // mid-range inflection with a moderate growth rate.
            let mid = match (ts.first(), ts.last()) {
                (Some(a), Some(b)) => (a + b) / 2.0,
                _ => 0.0,
            };
            Ok(vec![l, 0.5, mid])
        }
    }
}

fn exponential_guess(ts: &[f64], ys: &[f64]) -> Result<Vec<f64>, String> {
    let mut lts = Vec::new();
    let mut lys = Vec::new();
    for (&t, &y) in ts.iter().zip(ys.iter()) {
        if y > 0.0 {
            lts.push(t);
            lys.push(y.ln());
        }
    }
    if lts.len() < 2 {
        return Err("exponential growth needs at least two positive counts".to_string());
    }

    match linear_regression(&lts, &lys) {
        Some((intercept, slope)) => Ok(vec![intercept.exp(), slope]),
        None => Err("series is degenerate for an exponential starting point".to_string()),
    }
}
