//! Parabola pre-fit: a robust starting point for the nonlinear models.
//!
//! A second-order polynomial is deliberately used instead of a higher-order one:
//! on noisy data a quartic is too wiggly, while a parabola has exactly one
//! stationary point and gives stable seeds for `E0`, `B0` and `V0`.

use tracing::{debug, warn};

use crate::domain::{Advisory, EosModel, SampleSet};
use crate::error::EosError;
use crate::math::Polynomial;

/// Curvature below `CURVATURE_RTOL * max|q_k|` (scaled coefficients) is zero.
const CURVATURE_RTOL: f64 = 1e-12;

/// Default seed for `BP`; Anton–Schmidt's exponent `n` sits near -2 instead.
const BP_SEED: f64 = 4.0;
const ANTON_SCHMIDT_N_SEED: f64 = -2.0;

/// Parabola `E ≈ a + bV + cV²` and the initial guess derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParabolaFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Vertex `-b / 2c`.
    pub v_min: f64,
    /// `[E0, B0, BP, V0]` seed for the nonlinear fit.
    pub guess: [f64; 4],
    pub advisory: Option<Advisory>,
}

/// Fit the parabola and build the initial guess for `model`.
pub fn prefit_parabola(samples: &SampleSet, model: EosModel) -> Result<ParabolaFit, EosError> {
    let poly = Polynomial::fit(samples.volumes(), samples.energies(), 2).ok_or_else(|| {
        EosError::DegenerateFit("Parabola pre-fit is singular (need at least 3 distinct volumes).".into())
    })?;

    let q = poly.scaled_coeffs();
    let q_max = q.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if !(q[2].abs() > CURVATURE_RTOL * q_max) {
        return Err(EosError::DegenerateFit(
            "Parabola pre-fit has zero curvature; energies are linear in volume.".into(),
        ));
    }

    let [a, b, c] = match poly.to_monomial().as_slice() {
        &[a, b, c] => [a, b, c],
        _ => return Err(EosError::DegenerateFit("Parabola pre-fit returned wrong degree.".into())),
    };

    // Vertex of the parabola: dE/dV = b + 2cV = 0.
    let v_min = -b / (2.0 * c);
    let (lo, hi) = samples.volume_range();
    let advisory = if lo < v_min && v_min < hi {
        None
    } else {
        let advisory = Advisory::VertexOutsideSamples {
            vertex: v_min,
            v_min: lo,
            v_max: hi,
        };
        warn!(%advisory, "Parabola vertex is outside the sampled volumes.");
        Some(advisory)
    };

    // Energy at the vertex estimates E0; V0 * E'' = 2cV estimates B0.
    let e0 = a + b * v_min + c * v_min * v_min;
    let b0 = 2.0 * c * v_min;
    let bp = match model {
        EosModel::AntonSchmidt => ANTON_SCHMIDT_N_SEED,
        _ => BP_SEED,
    };
    let guess = [e0, b0, bp, v_min];
    debug!(?guess, "Parabola pre-fit seed.");

    Ok(ParabolaFit {
        a,
        b,
        c,
        v_min,
        guess,
        advisory,
    })
}
