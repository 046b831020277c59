//! Closed-form polynomial fits: the default `sj` path and the `p3` regression.
//!
//! `sj` fits `E(t) = c0 + c1 t + c2 t² + c3 t³` with `t = V^(-1/3)`. The
//! equilibrium is a root of `dE/dt` with positive curvature, and the change of
//! variable gives the bulk modulus directly:
//!
//! ```text
//! B = V d²E/dV² = t^5 · E''(t) / 9      (at dE/dt = 0)
//! ```
//!
//! No nonlinear solve is involved, so the path cannot fail to converge; it can
//! only find no minimum or be numerically singular.

use nalgebra::DMatrix;
use tracing::{debug, warn};

use crate::domain::{Advisory, SampleSet};
use crate::error::EosError;
use crate::fit::nonlinear::covariance;
use crate::math::{Polynomial, vandermonde};

/// Result of the `sj` fit.
#[derive(Debug, Clone)]
pub struct SjFit {
    /// `E(t)` with `t = V^(-1/3)`.
    pub poly: Polynomial,
    /// Selected stationary point `t*`.
    pub t0: f64,
    pub v0: f64,
    pub e0: f64,
    pub bulk_modulus: f64,
    pub advisory: Option<Advisory>,
}

/// Result of the linear `p3` regression.
#[derive(Debug, Clone)]
pub struct CubicFit {
    /// `[c0, c1, c2, c3]` in plain powers of `V`.
    pub coeffs: Vec<f64>,
    pub covariance: Option<DMatrix<f64>>,
}

/// Fit the `sj` cubic in `V^(-1/3)` and extract `(V0, E0, B)`.
pub fn fit_sjeos(samples: &SampleSet) -> Result<SjFit, EosError> {
    let t: Vec<f64> = samples.volumes().iter().map(|&v| v.powf(-1.0 / 3.0)).collect();
    let poly = Polynomial::fit(&t, samples.energies(), 3).ok_or_else(|| {
        EosError::DegenerateFit("Cubic fit in V^(-1/3) is singular (need at least 4 distinct volumes).".into())
    })?;

    let d1 = poly.derivative();
    let d2 = d1.derivative();
    let roots = d1
        .real_roots()
        .ok_or_else(|| EosError::DegenerateFit("Derivative of the cubic has unexpected degree.".into()))?;

    let (lo, hi) = samples.volume_range();
    let distance = |v: f64| {
        if v < lo {
            lo - v
        } else if v > hi {
            v - hi
        } else {
            0.0
        }
    };

    // Roots are ascending, so a strict comparison keeps the first of equal distances.
    let mut best: Option<(f64, f64)> = None;
    for &t in &roots {
        if !(t > 0.0 && d2.eval(t) > 0.0) {
            continue;
        }
        let d = distance(t.powi(-3));
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((t, d));
        }
    }
    let Some((t0, _)) = best else {
        return Err(EosError::NoMinimum(
            "the fitted E(V^(-1/3)) cubic has no positive root with positive curvature".into(),
        ));
    };

    let v0 = t0.powi(-3);
    let e0 = poly.eval(t0);
    let bulk_modulus = t0.powi(5) * d2.eval(t0) / 9.0;

    let advisory = if lo <= v0 && v0 <= hi {
        None
    } else {
        let advisory = Advisory::MinimumOutsideSamples { v0, v_min: lo, v_max: hi };
        warn!(%advisory, "Equilibrium volume is extrapolated.");
        Some(advisory)
    };
    debug!(v0, e0, bulk_modulus, "sj fit complete.");

    Ok(SjFit {
        poly,
        t0,
        v0,
        e0,
        bulk_modulus,
        advisory,
    })
}

/// Linear least-squares cubic in `V` for the `p3` model.
pub fn fit_cubic(samples: &SampleSet) -> Result<CubicFit, EosError> {
    let poly = Polynomial::fit(samples.volumes(), samples.energies(), 3).ok_or_else(|| {
        EosError::DegenerateFit("Cubic fit in V is singular (need at least 4 distinct volumes).".into())
    })?;

    let rss: f64 = samples.iter().map(|(v, e)| (poly.eval(v) - e).powi(2)).sum();
    let u: Vec<f64> = samples.volumes().iter().map(|&v| poly.to_scaled(v)).collect();
    let covariance = covariance(&vandermonde(&u, 3), rss).map(|cov_u| {
        let m = poly.monomial_map();
        &m * cov_u * m.transpose()
    });

    Ok(CubicFit {
        coeffs: poly.to_monomial(),
        covariance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `E(t) = e0 + k (t - t0)^2 + m (t - t0)^3`, a genuine minimum at `t0` when `k > 0`.
    fn sj_samples(volumes: &[f64], v0: f64, e0: f64, k: f64, m: f64) -> SampleSet {
        let t0 = v0.powf(-1.0 / 3.0);
        let energies: Vec<f64> = volumes
            .iter()
            .map(|&v| {
                let dt = v.powf(-1.0 / 3.0) - t0;
                e0 + k * dt * dt + m * dt * dt * dt
            })
            .collect();
        SampleSet::new(volumes.to_vec(), energies).unwrap()
    }

    #[test]
    fn recovers_known_cubic_in_inverse_cube_root() {
        let volumes = [10.0, 10.5, 11.0, 11.5, 12.0, 12.5, 13.0, 13.5, 14.0];
        let (v0, e0, k, m) = (12.0, -3.5, 150.0, -400.0);
        let s = sj_samples(&volumes, v0, e0, k, m);

        let fit = fit_sjeos(&s).unwrap();
        let t0 = v0.powf(-1.0 / 3.0);
        let expected_b = t0.powi(5) * 2.0 * k / 9.0;

        assert!((fit.v0 - v0).abs() < 1e-6 * v0, "v0={}", fit.v0);
        assert!((fit.e0 - e0).abs() < 1e-9, "e0={}", fit.e0);
        assert!((fit.bulk_modulus - expected_b).abs() < 1e-6 * expected_b, "B={}", fit.bulk_modulus);
        assert!(fit.advisory.is_none());
    }

    #[test]
    fn monotonic_data_has_no_minimum() {
        let volumes = [8.0, 9.0, 10.0, 11.0, 12.0];
        let energies: Vec<f64> = volumes.iter().map(|&v| -v).collect();
        let s = SampleSet::new(volumes.to_vec(), energies).unwrap();
        assert!(matches!(fit_sjeos(&s), Err(EosError::NoMinimum(_))));
    }

    #[test]
    fn linear_in_t_has_no_minimum() {
        let volumes = [8.0_f64, 9.0, 10.0, 11.0, 12.0];
        let energies: Vec<f64> = volumes.iter().map(|&v| v.powf(-1.0 / 3.0)).collect();
        let s = SampleSet::new(volumes.to_vec(), energies).unwrap();
        assert!(matches!(fit_sjeos(&s), Err(EosError::NoMinimum(_))));
    }

    #[test]
    fn extrapolated_minimum_is_flagged() {
        let volumes = [8.0, 8.5, 9.0, 9.5, 10.0];
        let s = sj_samples(&volumes, 12.0, -1.0, 150.0, 0.0);
        let fit = fit_sjeos(&s).unwrap();
        assert!((fit.v0 - 12.0).abs() < 1e-6);
        assert!(matches!(fit.advisory, Some(Advisory::MinimumOutsideSamples { .. })));
    }

    #[test]
    fn repeated_volumes_are_degenerate() {
        let s = SampleSet::new(vec![10.0, 11.0, 12.0, 12.0, 11.0], vec![1.0, 0.5, 0.7, 0.7, 0.5]).unwrap();
        assert!(matches!(fit_sjeos(&s), Err(EosError::DegenerateFit(_))));
    }

    #[test]
    fn cubic_regression_recovers_coefficients() {
        let truth = [40.0, -9.0, 0.6, -0.01];
        let volumes: Vec<f64> = (0..9).map(|i| 10.0 + 0.5 * i as f64).collect();
        let energies: Vec<f64> = volumes
            .iter()
            .map(|&v| truth[0] + truth[1] * v + truth[2] * v * v + truth[3] * v * v * v)
            .collect();
        let s = SampleSet::new(volumes, energies).unwrap();

        let fit = fit_cubic(&s).unwrap();
        for (a, b) in fit.coeffs.iter().zip(truth.iter()) {
            assert!((a - b).abs() < 1e-6 * (1.0 + b.abs()), "{a} vs {b}");
        }
        let cov = fit.covariance.expect("covariance");
        assert_eq!(cov.shape(), (4, 4));
    }
}
