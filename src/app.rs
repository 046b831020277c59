//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this is the real main:
//! - loads `.env` and parses CLI arguments
//! - installs the log subscriber
//! - runs the fit pipeline over every input
//! - prints the report and writes optional curve exports

use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, warn};

use crate::cli::Cli;
use crate::domain::{EosModel, SolverOptions};
use crate::error::AppError;

pub mod pipeline;

/// Resolved settings for one `eos` run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub inputs: Vec<String>,
    pub model: EosModel,
    pub options: SolverOptions,
    pub json: Option<PathBuf>,
    pub points: usize,
}

/// Entry point for the `eos` binary.
///
/// Returns `Ok(true)` when every input fitted, `Ok(false)` when at least one
/// fit failed (its row carries the message).
pub fn run() -> Result<bool, AppError> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    crate::logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded environment file."),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {e}"),
    }

    let config = run_config_from_args(&cli)?;
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_report(run.rows()));
    Ok(run.all_fitted())
}

pub fn run_config_from_args(cli: &Cli) -> Result<RunConfig, AppError> {
    if cli.points < 2 {
        return Err(AppError::new(2, format!("--points must be at least 2, got {}.", cli.points)));
    }
    if cli.max_iter == 0 {
        return Err(AppError::new(2, "--max-iter must be at least 1."));
    }
    Ok(RunConfig {
        inputs: cli.inputs.clone(),
        model: cli.model,
        options: SolverOptions {
            max_iterations: cli.max_iter,
            ..SolverOptions::default()
        },
        json: cli.json.clone(),
        points: cli.points,
    })
}
