//! Input/output helpers.
//!
//! - raw snapshot CSV ingest (`loader`)
//! - prepared-series CSV and fit JSON exports (`export`)

pub mod export;
pub mod loader;

pub use export::*;
pub use loader::*;
