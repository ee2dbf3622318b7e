//! Growth model implementations (logistic, exponential).
//!
//! Models are implemented as small, pure functions so that the fitting code
//! can stay generic over the model kind.

pub mod model;

pub use model::*;
