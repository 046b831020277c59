//! Mathematical utilities: least squares and scaled polynomials.

pub mod ols;
pub mod poly;

pub use ols::*;
pub use poly::*;
