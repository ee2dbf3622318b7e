//! Mathematical utilities: least-squares solving and simple regression.

pub mod lsq;

pub use lsq::*;
