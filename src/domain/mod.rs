//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input configuration enums (`CountColumn`, `GapFill`, `ModelKind`)
//! - validated time series (`TimeSeries`, `Observation`)
//! - fit outputs (`FitResult`, `FittedCurve`, `FitQuality`)

pub mod types;

pub use types::*;
