//! Levenberg–Marquardt damped least squares.
//!
//! Minimizes `Σ (f(x_i; p) - y_i)^2` from a supplied starting point:
//!
//! - central-difference Jacobian, step `cbrt(eps) * max(|p_j|, 1)`
//! - Marquardt scaling: the damping term is `λ · diag(JᵀJ)`, so parameters with
//!   very different magnitudes (eV vs Å³) are damped consistently
//! - λ is updated from the gain ratio (Nielsen's rule on acceptance, ×4 on rejection)
//!
//! Termination follows the MINPACK tests (relative reduction, relative step,
//! scaled gradient) plus an absolute test for residuals at round-off level,
//! which is what noiseless data converges to. Exhausting the iteration budget is
//! an error; the solver never returns a partial result.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, instrument, trace};

use crate::domain::SolverOptions;
use crate::error::EosError;

/// `f64::EPSILON.cbrt()`, the usual central-difference step scale.
const EPS_CBRT: f64 = 6.055_454_452_393_343e-6;

/// Residual norms below `ROUNDOFF_FACTOR * eps * ||y||` are treated as exact.
const ROUNDOFF_FACTOR: f64 = 16.0;

/// Minimum gain ratio for a step to be accepted.
const ACCEPT_RATIO: f64 = 1e-4;

/// Damping beyond which no useful step can be found.
const MAX_DAMPING: f64 = 1e32;

/// Which criterion ended a successful solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Residuals are exactly zero.
    ZeroResidual,
    /// Residuals are at floating-point round-off level.
    RoundoffResidual,
    /// Actual and predicted relative reductions are both below `ftol`.
    RelativeReduction,
    /// Relative step is below `xtol`.
    StepSize,
    /// Scaled gradient is below `gtol`.
    Gradient,
}

/// Output of a converged nonlinear fit.
#[derive(Debug, Clone)]
pub struct NonlinearFit {
    pub params: Vec<f64>,
    /// Residual sum of squares at `params`.
    pub rss: f64,
    pub iterations: usize,
    pub termination: Termination,
    /// `s² (JᵀJ)⁻¹` with `s² = rss / (n - k)`, if it could be computed.
    pub covariance: Option<DMatrix<f64>>,
}

/// Fit `f(x; p)` to `(x, y)` starting from `guess`.
#[instrument(level = "debug", skip_all, fields(n = x.len(), k = guess.len()))]
pub fn fit_nonlinear<F>(
    f: F,
    x: &[f64],
    y: &[f64],
    guess: &[f64],
    opts: &SolverOptions,
) -> Result<NonlinearFit, EosError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let n = x.len();
    let k = guess.len();
    if n != y.len() || k == 0 || n < k {
        return Err(EosError::InvalidInput(format!(
            "Nonlinear fit needs at least {k} samples with matching lengths (got {n} x, {} y).",
            y.len()
        )));
    }

    let mut p = DVector::from_column_slice(guess);
    let mut r = residuals(&f, x, y, p.as_slice());
    let mut cost = r.norm_squared();
    if !cost.is_finite() {
        return Err(EosError::Convergence {
            iterations: 0,
            reason: format!("model is not finite at the initial guess {guess:?}"),
        });
    }

    let y_norm = y.iter().map(|v| v * v).sum::<f64>().sqrt();
    let cost_floor = (ROUNDOFF_FACTOR * f64::EPSILON * y_norm).powi(2);
    let mut lambda = opts.initial_damping;

    for iter in 1..=opts.max_iterations {
        if cost <= cost_floor {
            return finish(&f, x, p, cost, iter - 1, Termination::RoundoffResidual);
        }

        let jac = jacobian(&f, x, p.as_slice()).ok_or_else(|| EosError::Convergence {
            iterations: iter,
            reason: "Jacobian is not finite".into(),
        })?;
        let jtj = jac.tr_mul(&jac);
        let grad = jac.tr_mul(&r);

        let max_diag = (0..k).map(|j| jtj[(j, j)]).fold(0.0_f64, f64::max);
        if !(max_diag > 0.0) {
            return Err(EosError::Convergence {
                iterations: iter,
                reason: "model does not depend on its parameters".into(),
            });
        }
        let scale: Vec<f64> = (0..k)
            .map(|j| jtj[(j, j)].max(f64::EPSILON * max_diag))
            .collect();

        let grad_scaled = (0..k)
            .map(|j| grad[j].abs() / (scale[j] * cost).sqrt())
            .fold(0.0_f64, f64::max);
        if grad_scaled <= opts.gtol {
            return finish(&f, x, p, cost, iter - 1, Termination::Gradient);
        }

        loop {
            let mut damped = jtj.clone();
            for j in 0..k {
                damped[(j, j)] += lambda * scale[j];
            }
            let Some(chol) = damped.cholesky() else {
                lambda *= 10.0;
                if lambda > MAX_DAMPING {
                    return Err(EosError::Convergence {
                        iterations: iter,
                        reason: "damped normal equations are not positive definite".into(),
                    });
                }
                continue;
            };
            let step = chol.solve(&(-grad.clone()));

            let p_new = &p + &step;
            let r_new = residuals(&f, x, y, p_new.as_slice());
            let cost_new = r_new.norm_squared();

            let predicted = cost - (&r + &jac * &step).norm_squared();
            let actual = if cost_new.is_finite() {
                cost - cost_new
            } else {
                f64::NEG_INFINITY
            };
            let ratio = if predicted > 0.0 { actual / predicted } else { 0.0 };

            let reduction_small =
                actual.abs() <= opts.ftol * cost && predicted <= opts.ftol * cost && ratio <= 2.0;
            let step_small = step.norm() <= opts.xtol * (p.norm() + opts.xtol);
            trace!(iter, lambda, cost, cost_new, ratio, "Levenberg-Marquardt trial step.");

            if ratio > ACCEPT_RATIO {
                p = p_new;
                r = r_new;
                cost = cost_new;
                lambda *= (1.0_f64 / 3.0).max(1.0 - (2.0 * ratio - 1.0).powi(3));

                if cost == 0.0 {
                    return finish(&f, x, p, cost, iter, Termination::ZeroResidual);
                }
                if reduction_small {
                    return finish(&f, x, p, cost, iter, Termination::RelativeReduction);
                }
                if step_small {
                    return finish(&f, x, p, cost, iter, Termination::StepSize);
                }
                break;
            }

            if reduction_small {
                return finish(&f, x, p, cost, iter, Termination::RelativeReduction);
            }
            if step_small {
                return finish(&f, x, p, cost, iter, Termination::StepSize);
            }
            lambda *= 4.0;
            if lambda > MAX_DAMPING {
                return Err(EosError::Convergence {
                    iterations: iter,
                    reason: "no step reduces the residuals".into(),
                });
            }
        }
    }

    Err(EosError::Convergence {
        iterations: opts.max_iterations,
        reason: "iteration budget exhausted".into(),
    })
}

/// Parameter covariance `s² (JᵀJ)⁻¹` with `s² = rss / (n - k)`.
///
/// Returns `None` with no residual degrees of freedom or a singular `JᵀJ`.
pub fn covariance(jac: &DMatrix<f64>, rss: f64) -> Option<DMatrix<f64>> {
    let (n, k) = jac.shape();
    if n <= k {
        return None;
    }
    let s2 = rss / (n - k) as f64;
    let inv = jac.tr_mul(jac).try_inverse()?;
    let cov = inv * s2;
    cov.iter().all(|v| v.is_finite()).then_some(cov)
}

fn finish<F>(
    f: &F,
    x: &[f64],
    p: DVector<f64>,
    rss: f64,
    iterations: usize,
    termination: Termination,
) -> Result<NonlinearFit, EosError>
where
    F: Fn(f64, &[f64]) -> f64,
{
    debug!(iterations, rss, ?termination, "Nonlinear fit converged.");
    let covariance = jacobian(f, x, p.as_slice()).and_then(|jac| covariance(&jac, rss));
    Ok(NonlinearFit {
        params: p.iter().copied().collect(),
        rss,
        iterations,
        termination,
        covariance,
    })
}

fn residuals<F>(f: &F, x: &[f64], y: &[f64], p: &[f64]) -> DVector<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    DVector::from_iterator(x.len(), x.iter().zip(y).map(|(&xi, &yi)| f(xi, p) - yi))
}

fn jacobian<F>(f: &F, x: &[f64], p: &[f64]) -> Option<DMatrix<f64>>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut jac = DMatrix::<f64>::zeros(x.len(), p.len());
    let mut work = p.to_vec();
    for j in 0..p.len() {
        let h = EPS_CBRT * p[j].abs().max(1.0);
        for (i, &xi) in x.iter().enumerate() {
            work[j] = p[j] + h;
            let up = f(xi, &work);
            work[j] = p[j] - h;
            let down = f(xi, &work);
            jac[(i, j)] = (up - down) / (2.0 * h);
        }
        work[j] = p[j];
    }
    jac.iter().all(|v| v.is_finite()).then_some(jac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp_model(x: f64, p: &[f64]) -> f64 {
        p[0] * (p[1] * x).exp()
    }

    #[test]
    fn recovers_exponential_from_rough_guess() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y: Vec<f64> = x.iter().map(|&v| exp_model(v, &[2.0, -0.7])).collect();

        let fit = fit_nonlinear(exp_model, &x, &y, &[1.0, 0.0], &SolverOptions::default()).unwrap();
        assert!((fit.params[0] - 2.0).abs() < 1e-8, "{:?}", fit.params);
        assert!((fit.params[1] + 0.7).abs() < 1e-8, "{:?}", fit.params);
        assert!(fit.rss < 1e-16);
    }

    #[test]
    fn exact_guess_terminates_immediately() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y: Vec<f64> = x.iter().map(|&v| exp_model(v, &[1.5, 0.2])).collect();
        let fit = fit_nonlinear(exp_model, &x, &y, &[1.5, 0.2], &SolverOptions::default()).unwrap();
        assert_eq!(fit.iterations, 0);
        assert_eq!(fit.params, vec![1.5, 0.2]);
    }

    #[test]
    fn iteration_budget_is_a_convergence_error() {
        let x: Vec<f64> = (0..10).map(|i| i as f64 * 0.3).collect();
        let y: Vec<f64> = x.iter().map(|&v| exp_model(v, &[2.0, -0.7])).collect();
        let opts = SolverOptions {
            max_iterations: 1,
            ..SolverOptions::default()
        };
        let err = fit_nonlinear(exp_model, &x, &y, &[1.0, 0.0], &opts).unwrap_err();
        assert!(matches!(err, EosError::Convergence { iterations: 1, .. }));
    }

    #[test]
    fn non_finite_start_is_a_convergence_error() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let err = fit_nonlinear(|v, p| (v - p[0]).ln() * p[1], &x, &y, &[10.0, 1.0], &SolverOptions::default())
            .unwrap_err();
        assert!(matches!(err, EosError::Convergence { iterations: 0, .. }));
    }

    #[test]
    fn noisy_line_reports_covariance() {
        let x: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| 1.0 + 0.5 * v + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();
        let fit = fit_nonlinear(|v, p| p[0] + p[1] * v, &x, &y, &[0.0, 0.0], &SolverOptions::default())
            .unwrap();
        let cov = fit.covariance.expect("covariance");
        assert_eq!(cov.shape(), (2, 2));
        assert!(cov[(0, 0)] > 0.0 && cov[(1, 1)] > 0.0);
        assert!((fit.params[1] - 0.5).abs() < 1e-2);
    }
}
