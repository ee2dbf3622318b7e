//! Application error type and exit-code mapping.
//!
//! Each pipeline stage fails fast with the variant naming that stage; there is
//! no partial-result recovery. `main` prints the message and exits with the
//! mapped code.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Raw input was missing or malformed (bad directory, unparseable
    /// date/count).
    #[error("load error: {0}")]
    Load(String),
    /// A series was too short or otherwise invalid for preparation.
    #[error("prepare error: {0}")]
    Prepare(String),
    /// The optimizer did not converge within its iteration budget, or no
    /// valid starting point exists for the requested model.
    #[error("fit error: {0}")]
    Convergence(String),
    /// A plot or export file could not be written.
    #[error("render error: {0}")]
    Render(String),
    /// Invalid configuration (e.g. a malformed `--guess`).
    #[error("usage error: {0}")]
    Usage(String),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Load(_) => 2,
            AppError::Prepare(_) => 3,
            AppError::Convergence(_) => 4,
            AppError::Render(_) => 5,
            AppError::Usage(_) => 2,
        }
    }
}
