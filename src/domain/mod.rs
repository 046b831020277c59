//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the model catalogue (`EosModel`)
//! - validated input samples (`SampleSet`)
//! - solver settings (`SolverOptions`)
//! - fit outputs (`FitResult`, `Advisory`)

pub mod types;

pub use types::*;
