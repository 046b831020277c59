//! Command-line parsing for the `eos` binary.
//!
//! Parsing only; the run itself lives in [`crate::app`].

use std::path::PathBuf;

use clap::Parser;

use crate::domain::EosModel;

/// Fit an equation of state to (volume, energy) tables.
#[derive(Debug, Parser, Clone)]
#[command(name = "eos", version, about = "Calculate equation of state.")]
pub struct Cli {
    /// Two-column (volume, energy) tables; `-` reads stdin.
    #[arg(value_name = "FILE", required = true)]
    pub inputs: Vec<String>,

    /// Equation of state to fit.
    #[arg(short = 't', long = "type", value_enum, env = "EOS_TYPE", default_value_t = EosModel::Sj)]
    pub model: EosModel,

    /// Iteration budget of the nonlinear solver.
    #[arg(long, env = "EOS_MAX_ITER", default_value_t = 1000)]
    pub max_iter: usize,

    /// Export each fitted curve as JSON (a directory when several inputs are given).
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Number of grid points in exported curves.
    #[arg(long, default_value_t = 100)]
    pub points: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Silence all log output.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write logs to this file.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}
