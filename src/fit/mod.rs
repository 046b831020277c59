//! Fitting paths.
//!
//! Responsibilities:
//!
//! - parabola pre-fit for robust initial guesses (`parabola`)
//! - Levenberg–Marquardt for the closed-form models (`nonlinear`)
//! - closed-form polynomial fits: `sj` in `V^(-1/3)` and `p3` in `V` (`polynomial`)

pub mod nonlinear;
pub mod parabola;
pub mod polynomial;

pub use nonlinear::*;
pub use parabola::*;
pub use polynomial::*;
