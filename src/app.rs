//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initializes logging
//! - parses CLI arguments
//! - runs the pipeline stages for the selected mode
//! - prints the run summary
//! - writes optional exports

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `pandemic` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    let cli = Cli::parse();
    let config = cli.to_config();

    let run = pipeline::execute(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.prepared, &run.fits, &config)
    );
    for path in &run.plots {
        println!("wrote {}", path.display());
    }

    if let Some(path) = &config.export_prepared {
        crate::io::export::write_prepared_csv(path, &run.prepared)?;
        info!(path = %path.display(), "wrote prepared series CSV");
    }
    if let Some(path) = &config.export_fit {
        crate::io::export::write_fit_json(path, config.column, &run.fits)?;
        info!(path = %path.display(), "wrote fit JSON");
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // try_init: tests and embedders may already have a subscriber installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
