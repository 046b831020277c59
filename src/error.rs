//! Error types.
//!
//! - [`EosError`] is the library's typed failure taxonomy. Every variant is a
//!   distinct, identifiable kind so callers can decide whether to retry with a
//!   different model or more samples.
//! - [`AppError`] is the binary-level error: a message plus the process exit code.

use thiserror::Error;

/// Failure of an equation-of-state fit.
///
/// Variants carry owned data only so a failed outcome can be cached and handed
/// out again on repeated `fit()` calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EosError {
    /// Mismatched lengths, too few samples, non-positive or non-finite values.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The parabola or polynomial regression is numerically singular.
    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    /// The nonlinear solver did not reach an accepted termination criterion.
    #[error("Nonlinear fit did not converge after {iterations} iterations: {reason}")]
    Convergence { iterations: usize, reason: String },

    /// No physical minimum exists for the fitted curve.
    #[error("No minimum: {0}")]
    NoMinimum(String),

    /// A query that needs fitted parameters was made before a successful fit.
    #[error("Equation of state has not been fitted successfully")]
    NotFitted,
}

impl EosError {
    /// Short machine-friendly label for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EosError::InvalidInput(_) => "invalid_input",
            EosError::DegenerateFit(_) => "degenerate_fit",
            EosError::Convergence { .. } => "convergence",
            EosError::NoMinimum(_) => "no_minimum",
            EosError::NotFitted => "not_fitted",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
