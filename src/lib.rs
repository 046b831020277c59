//! `eos-fit` library crate.
//!
//! Fits equations of state `E(V)` to (volume, energy) samples of a solid and
//! extracts the equilibrium volume `V0`, energy `E0` and bulk modulus `B`.
//!
//! ```no_run
//! use eos_fit::{EosModel, EquationOfState, SampleSet};
//!
//! let volumes = [10.0, 11.0, 12.0, 13.0, 14.0];
//! let energies = [-0.91, -0.98, -1.0, -0.98, -0.93];
//! let eos = EquationOfState::new(SampleSet::new(volumes, energies)?, EosModel::BirchMurnaghan);
//! let (v0, e0, b) = eos.fit()?.triple();
//! # Ok::<(), eos_fit::EosError>(())
//! ```
//!
//! The `eos` binary is a thin wrapper around this library.

pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod report;

pub use domain::{Advisory, EosModel, FitResult, SampleSet, SolverOptions};
pub use engine::EquationOfState;
pub use error::{AppError, EosError};
