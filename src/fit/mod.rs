//! Curve fitting.
//!
//! Responsibilities:
//!
//! - derive or validate the initial parameter guess
//! - run damped Gauss-Newton (Levenberg-Marquardt) iterations
//! - report fitted parameters and goodness-of-fit

pub mod fitter;

pub use fitter::*;
