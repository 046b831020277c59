//! The equation-of-state engine.
//!
//! [`EquationOfState`] owns a validated [`SampleSet`] and a model choice and
//! moves through a one-way state machine:
//!
//! ```text
//! Unfitted --fit()--> Fitted(FitResult) | Failed(EosError)
//! ```
//!
//! The outcome is computed once and cached; later `fit()` calls hand out the
//! same result (or the same error) without recomputation. Inputs cannot be
//! swapped on an existing engine, so the cache never goes stale.
//!
//! Dispatch:
//! - `sj`: cubic in `V^(-1/3)`, closed-form extraction
//! - `p3`: parabola pre-fit (advisory only), then an exact cubic regression in `V`
//!   and the analytic stationary point
//! - everything else: parabola pre-fit → Levenberg–Marquardt → positional unpack

use std::sync::OnceLock;

use nalgebra::DMatrix;
use tracing::{debug, instrument};

use crate::domain::{EosModel, FitResult, SampleSet, SolverOptions};
use crate::error::EosError;
use crate::fit::{fit_cubic, fit_nonlinear, fit_sjeos, prefit_parabola};
use crate::math::Polynomial;
use crate::models::{EnergyFn, denergy_dv, energy_fn, p3};

#[derive(Debug)]
pub struct EquationOfState {
    samples: SampleSet,
    model: EosModel,
    options: SolverOptions,
    outcome: OnceLock<Result<Fitted, EosError>>,
}

#[derive(Debug, Clone)]
struct Fitted {
    result: FitResult,
    curve: Curve,
}

/// Fitted energy curve, kept alongside the result for `evaluate`.
#[derive(Debug, Clone)]
enum Curve {
    /// `E(t)` with `t = V^(-1/3)`.
    InverseCubeRoot(Polynomial),
    Closed { f: EnergyFn, params: Vec<f64> },
}

impl Curve {
    fn energy(&self, v: f64) -> f64 {
        match self {
            Curve::InverseCubeRoot(poly) => poly.eval(v.powf(-1.0 / 3.0)),
            Curve::Closed { f, params } => f(v, params),
        }
    }
}

impl EquationOfState {
    pub fn new(samples: SampleSet, model: EosModel) -> Self {
        Self::with_options(samples, model, SolverOptions::default())
    }

    pub fn with_options(samples: SampleSet, model: EosModel, options: SolverOptions) -> Self {
        Self {
            samples,
            model,
            options,
            outcome: OnceLock::new(),
        }
    }

    /// Validate raw slices into a [`SampleSet`] and build an engine.
    pub fn from_slices(volumes: &[f64], energies: &[f64], model: EosModel) -> Result<Self, EosError> {
        Ok(Self::new(SampleSet::new(volumes, energies)?, model))
    }

    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    pub fn model(&self) -> EosModel {
        self.model
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Fit the model (once) and return `V0`, `E0`, `B` and diagnostics.
    pub fn fit(&self) -> Result<&FitResult, EosError> {
        match self.outcome.get_or_init(|| self.run()) {
            Ok(fitted) => Ok(&fitted.result),
            Err(err) => Err(err.clone()),
        }
    }

    /// The cached result, if `fit()` has already succeeded.
    pub fn result(&self) -> Option<&FitResult> {
        self.fitted().map(|f| &f.result)
    }

    /// Fitted energy at volume `v`. Requires a successful `fit()`.
    pub fn evaluate(&self, v: f64) -> Result<f64, EosError> {
        self.fitted().map(|f| f.curve.energy(v)).ok_or(EosError::NotFitted)
    }

    /// Fitted energies at each of `volumes`. Requires a successful `fit()`.
    pub fn evaluate_many(&self, volumes: &[f64]) -> Result<Vec<f64>, EosError> {
        let fitted = self.fitted().ok_or(EosError::NotFitted)?;
        Ok(volumes.iter().map(|&v| fitted.curve.energy(v)).collect())
    }

    /// Evenly spaced `(volumes, energies)` across the sampled range, for plotting.
    pub fn curve(&self, points: usize) -> Result<(Vec<f64>, Vec<f64>), EosError> {
        if points < 2 {
            return Err(EosError::InvalidInput(format!("Curve needs at least 2 points, got {points}.")));
        }
        let (lo, hi) = self.samples.volume_range();
        let volumes: Vec<f64> = (0..points)
            .map(|i| lo + (hi - lo) * i as f64 / (points - 1) as f64)
            .collect();
        let energies = self.evaluate_many(&volumes)?;
        Ok((volumes, energies))
    }

    fn fitted(&self) -> Option<&Fitted> {
        self.outcome.get().and_then(|o| o.as_ref().ok())
    }

    #[instrument(level = "debug", skip_all, fields(model = %self.model, n = self.samples.len()))]
    fn run(&self) -> Result<Fitted, EosError> {
        let k = self.model.param_count();
        if self.samples.len() < k {
            return Err(EosError::InvalidInput(format!(
                "Model {} needs at least {k} samples, got {}.",
                self.model,
                self.samples.len()
            )));
        }

        let fitted = match self.model {
            EosModel::Sj => self.fit_sj()?,
            EosModel::P3 => self.fit_p3()?,
            model => self.fit_physical(model)?,
        };
        debug!(
            v0 = fitted.result.v0,
            e0 = fitted.result.e0,
            bulk_modulus = fitted.result.bulk_modulus,
            "Equation of state fitted."
        );
        Ok(fitted)
    }

    fn fit_sj(&self) -> Result<Fitted, EosError> {
        let sj = fit_sjeos(&self.samples)?;
        let curve = Curve::InverseCubeRoot(sj.poly);
        Ok(Fitted {
            result: FitResult {
                model: EosModel::Sj,
                v0: sj.v0,
                e0: sj.e0,
                bulk_modulus: sj.bulk_modulus,
                params: Vec::new(),
                covariance: None,
                rss: self.rss(&curve),
                iterations: None,
                warnings: sj.advisory.into_iter().collect(),
            },
            curve,
        })
    }

    fn fit_p3(&self) -> Result<Fitted, EosError> {
        let prefit = prefit_parabola(&self.samples, EosModel::P3)?;
        let cubic = fit_cubic(&self.samples)?;
        let (v0, e0, bulk_modulus) = p3_stationary_point(&cubic.coeffs)?;

        let curve = Curve::Closed {
            f: |v, c| p3(v, c[0], c[1], c[2], c[3]),
            params: cubic.coeffs.clone(),
        };
        Ok(Fitted {
            result: FitResult {
                model: EosModel::P3,
                v0,
                e0,
                bulk_modulus,
                params: cubic.coeffs,
                covariance: cubic.covariance.as_ref().map(rows),
                rss: self.rss(&curve),
                iterations: None,
                warnings: prefit.advisory.into_iter().collect(),
            },
            curve,
        })
    }

    fn fit_physical(&self, model: EosModel) -> Result<Fitted, EosError> {
        let f = energy_fn(model)
            .ok_or_else(|| EosError::InvalidInput(format!("Model {model} has no parameter vector.")))?;
        let prefit = prefit_parabola(&self.samples, model)?;
        let fit = fit_nonlinear(
            f,
            self.samples.volumes(),
            self.samples.energies(),
            &prefit.guess,
            &self.options,
        )?;

        debug!(
            params = ?model.param_names().iter().zip(&fit.params).collect::<Vec<_>>(),
            termination = ?fit.termination,
            "Nonlinear fit parameters."
        );

        // Positional convention: (E0, B0, BP, V0).
        let p = &fit.params;
        let (e0, bulk_modulus, v0) = (p[0], p[1], p[3]);
        debug!(slope = ?denergy_dv(model, v0, p), "dE/dV at the fitted V0.");

        let curve = Curve::Closed {
            f,
            params: fit.params.clone(),
        };
        Ok(Fitted {
            result: FitResult {
                model,
                v0,
                e0,
                bulk_modulus,
                params: fit.params,
                covariance: fit.covariance.as_ref().map(rows),
                rss: fit.rss,
                iterations: Some(fit.iterations),
                warnings: prefit.advisory.into_iter().collect(),
            },
            curve,
        })
    }

    fn rss(&self, curve: &Curve) -> f64 {
        self.samples.iter().map(|(v, e)| (curve.energy(v) - e).powi(2)).sum()
    }
}

/// Minimum of `E = c0 + c1 V + c2 V² + c3 V³`.
///
/// `dE/dV = c1 + 2 c2 V + 3 c3 V² = 0` is solved on the `+` branch of the
/// quadratic formula, which is the root with `E'' = sqrt(disc) ≥ 0`. For
/// `b > 0` the conjugate form of the same root is used to avoid cancellation.
fn p3_stationary_point(c: &[f64]) -> Result<(f64, f64, f64), EosError> {
    let &[c0, c1, c2, c3] = c else {
        return Err(EosError::DegenerateFit(format!("p3 needs 4 coefficients, got {}.", c.len())));
    };
    let (a, b, cc) = (3.0 * c3, 2.0 * c2, c1);

    let v0 = if a == 0.0 {
        // Pure parabola: a minimum only with positive curvature.
        if b > 0.0 {
            -cc / b
        } else if b < 0.0 {
            return Err(EosError::NoMinimum("p3 curve is a downward parabola".into()));
        } else {
            return Err(EosError::DegenerateFit("p3 curve has no curvature".into()));
        }
    } else {
        let disc = b * b - 4.0 * a * cc;
        if !(disc >= 0.0) {
            return Err(EosError::NoMinimum(format!(
                "p3 derivative has no real root (discriminant {disc:.4e})"
            )));
        }
        let sq = disc.sqrt();
        if b > 0.0 {
            2.0 * cc / (-b - sq)
        } else {
            (-b + sq) / (2.0 * a)
        }
    };

    let e0 = p3(v0, c0, c1, c2, c3);
    let bulk_modulus = (2.0 * c2 + 6.0 * c3 * v0) * v0;
    Ok((v0, e0, bulk_modulus))
}

fn rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}
