//! Linear least squares solver.
//!
//! Every regression in this crate is tiny (3–4 columns, a handful of rows):
//! the parabola pre-fit, the `sj` cubic in `V^(-1/3)` and the `p3` cubic in `V`.
//!
//! Implementation choices:
//! - We solve via SVD so tall design matrices are handled directly.
//!   (Nalgebra's `QR::solve` is intended for square systems.)
//! - Rank deficiency is reported as `None` instead of returning a
//!   minimum-norm solution, because a singular regression means the samples
//!   cannot determine the model (e.g. too few distinct volumes).
//! - Callers centre and scale the abscissa before building a Vandermonde
//!   matrix; raw powers of `V` are badly conditioned.

use nalgebra::{DMatrix, DVector};

/// Singular values below `RANK_RTOL * max_singular_value` count as zero.
const RANK_RTOL: f64 = 1e-10;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the design matrix is rank deficient or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() < x.ncols() || x.nrows() != y.len() {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if !(s_max > 0.0) || s_min <= s_max * RANK_RTOL {
        return None;
    }

    let beta = svd.solve(y, 0.0).ok()?;
    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}

/// Build a Vandermonde design matrix with columns `1, u, u^2, ..., u^degree`.
pub fn vandermonde(u: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(u.len(), degree + 1, |i, j| u[i].powi(j as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn rank_deficient_design_is_rejected() {
        // Only two distinct abscissae for a quadratic.
        let u = [0.0, 1.0, 0.0, 1.0];
        let x = vandermonde(&u, 2);
        let y = DVector::from_row_slice(&[1.0, 2.0, 1.0, 2.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }

    #[test]
    fn underdetermined_system_is_rejected() {
        let x = vandermonde(&[0.0, 1.0], 3);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }

    #[test]
    fn vandermonde_layout() {
        let x = vandermonde(&[2.0, 3.0], 2);
        assert_eq!(x[(0, 0)], 1.0);
        assert_eq!(x[(0, 2)], 4.0);
        assert_eq!(x[(1, 1)], 3.0);
    }
}
