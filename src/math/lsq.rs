//! Linear least-squares building blocks.
//!
//! The Levenberg-Marquardt loop repeatedly solves small damped linear systems
//! of the form:
//!
//! ```text
//! minimize || A δ - b ||²
//! ```
//!
//! where `A` stacks the Jacobian on top of `sqrt(λ) I` damping rows. The
//! parameter dimension is tiny (2-3 columns), so an SVD solve is robust and
//! fast enough, and it handles the tall, occasionally near-singular systems
//! that show up when a model is weakly identified by the data.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    // Try progressively looser tolerances if the strict solve fails. Growth
    // curves on short series can produce nearly collinear Jacobian columns
    // (e.g. L and k when the data never leaves the exponential regime).
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Ordinary least-squares line fit `y = intercept + slope * x`.
///
/// Used to derive initial parameter guesses from linearized model forms.
/// Returns `None` for fewer than 2 points, non-finite inputs, or a
/// degenerate (constant) x.
pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    if xs.len() < 2 || xs.len() != ys.len() {
        return None;
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let n = xs.len() as f64;
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let dx = x - x_mean;
        cov += dx * (y - y_mean);
        var += dx * dx;
    }
    if var <= 1e-18 || !cov.is_finite() {
        return None;
    }

    let slope = cov / var;
    let intercept = y_mean - slope * x_mean;
    Some((intercept, slope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let x = solve_least_squares(&a, &b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_handles_tall_damped_system() {
        // 3 observation rows + 2 damping rows, as built by an LM step.
        let a = DMatrix::from_row_slice(
            5,
            2,
            &[
                1.0, 0.0, //
                1.0, 1.0, //
                1.0, 2.0, //
                0.1, 0.0, //
                0.0, 0.1,
            ],
        );
        let b = DVector::from_row_slice(&[2.0, 5.0, 8.0, 0.0, 0.0]);
        let x = solve_least_squares(&a, &b).unwrap();
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn regression_recovers_exact_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys: Vec<f64> = xs.iter().map(|x| 1.5 - 0.25 * x).collect();
        let (intercept, slope) = linear_regression(&xs, &ys).unwrap();
        assert!((intercept - 1.5).abs() < 1e-12);
        assert!((slope + 0.25).abs() < 1e-12);
    }

    #[test]
    fn regression_rejects_constant_x() {
        let xs = [2.0, 2.0, 2.0];
        let ys = [1.0, 2.0, 3.0];
        assert!(linear_regression(&xs, &ys).is_none());
    }
}
