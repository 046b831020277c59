//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON alongside a fitted curve
//! - handed to an external plotter

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::EosError;

/// Equation-of-state model.
///
/// `Sj` (the stabilized jellium / inverse-cube-root polynomial) is the default
/// and is fitted in closed form. Every other model is fitted by nonlinear least
/// squares (or, for `P3`, by a linear polynomial regression).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum EosModel {
    /// Cubic polynomial in `V^(-1/3)` (PRB 67, 026103).
    #[default]
    #[serde(alias = "sjeos")]
    #[value(name = "sj", alias = "sjeos")]
    Sj,
    /// Third-order Taylor expansion about the minimum volume.
    #[value(name = "taylor")]
    Taylor,
    /// PRB 28, 5480 (1983).
    #[value(name = "murnaghan")]
    Murnaghan,
    /// Birch, n = 0 case (Mehl, Klein, Papaconstantopoulos).
    #[value(name = "birch")]
    Birch,
    /// PRB 70, 224107.
    #[value(name = "birchmurnaghan")]
    BirchMurnaghan,
    /// PRB 70, 224107.
    #[value(name = "pouriertarantola")]
    PourierTarantola,
    /// PRB 70, 224107.
    #[value(name = "vinet")]
    Vinet,
    /// Intermetallics 11, 23-32 (2003).
    #[value(name = "antonschmidt")]
    AntonSchmidt,
    /// Plain cubic polynomial in `V`.
    #[value(name = "p3")]
    P3,
}

impl EosModel {
    /// All models, default first.
    pub const ALL: [EosModel; 9] = [
        EosModel::Sj,
        EosModel::Taylor,
        EosModel::Murnaghan,
        EosModel::Birch,
        EosModel::BirchMurnaghan,
        EosModel::PourierTarantola,
        EosModel::Vinet,
        EosModel::AntonSchmidt,
        EosModel::P3,
    ];

    /// Lowercase tag used on the command line and in exported files.
    pub fn as_str(self) -> &'static str {
        match self {
            EosModel::Sj => "sj",
            EosModel::Taylor => "taylor",
            EosModel::Murnaghan => "murnaghan",
            EosModel::Birch => "birch",
            EosModel::BirchMurnaghan => "birchmurnaghan",
            EosModel::PourierTarantola => "pouriertarantola",
            EosModel::Vinet => "vinet",
            EosModel::AntonSchmidt => "antonschmidt",
            EosModel::P3 => "p3",
        }
    }

    /// Number of fitted parameters (the `sj` cubic also has four coefficients).
    pub fn param_count(self) -> usize {
        4
    }

    /// Names of the entries of the raw parameter vector, in order.
    ///
    /// Empty for `sj`, whose coefficients stay internal.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            EosModel::Sj => &[],
            EosModel::Taylor => &["E0", "beta", "alpha", "V0"],
            EosModel::AntonSchmidt => &["Einf", "B", "n", "V0"],
            EosModel::P3 => &["c0", "c1", "c2", "c3"],
            EosModel::Murnaghan
            | EosModel::Birch
            | EosModel::BirchMurnaghan
            | EosModel::PourierTarantola
            | EosModel::Vinet => &["E0", "B0", "BP", "V0"],
        }
    }
}

impl fmt::Display for EosModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EosModel {
    type Err = EosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        if tag == "sjeos" {
            return Ok(EosModel::Sj);
        }
        EosModel::ALL
            .into_iter()
            .find(|m| m.as_str() == tag)
            .ok_or_else(|| EosError::InvalidInput(format!("Unknown equation of state '{s}'.")))
    }
}

/// Immutable set of `(volume, energy)` samples.
///
/// Construction validates the invariants once, so downstream fitters can assume
/// equal lengths, at least [`SampleSet::MIN_SAMPLES`] points, finite energies and
/// strictly positive finite volumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet {
    volumes: Vec<f64>,
    energies: Vec<f64>,
}

impl SampleSet {
    /// Minimum number of samples accepted (every model has four parameters).
    pub const MIN_SAMPLES: usize = 4;

    pub fn new(volumes: impl Into<Vec<f64>>, energies: impl Into<Vec<f64>>) -> Result<Self, EosError> {
        let volumes = volumes.into();
        let energies = energies.into();

        if volumes.len() != energies.len() {
            return Err(EosError::InvalidInput(format!(
                "Got {} volumes but {} energies.",
                volumes.len(),
                energies.len()
            )));
        }
        if volumes.len() < Self::MIN_SAMPLES {
            return Err(EosError::InvalidInput(format!(
                "Need at least {} samples, got {}.",
                Self::MIN_SAMPLES,
                volumes.len()
            )));
        }
        if let Some((i, v)) = volumes
            .iter()
            .enumerate()
            .find(|(_, v)| !(v.is_finite() && **v > 0.0))
        {
            return Err(EosError::InvalidInput(format!(
                "Volume #{i} is {v}; volumes must be finite and > 0."
            )));
        }
        if let Some((i, e)) = energies.iter().enumerate().find(|(_, e)| !e.is_finite()) {
            return Err(EosError::InvalidInput(format!("Energy #{i} is {e}; energies must be finite.")));
        }

        Ok(Self { volumes, energies })
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// `(min V, max V)` over the samples.
    pub fn volume_range(&self) -> (f64, f64) {
        self.volumes
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Iterate over `(volume, energy)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.volumes.iter().copied().zip(self.energies.iter().copied())
    }
}

/// Non-fatal diagnostic raised during a fit.
///
/// Advisories never change control flow; they are returned with the result and
/// logged at `warn` level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// The vertex of the pre-fit parabola is not strictly inside the sampled volumes.
    VertexOutsideSamples { vertex: f64, v_min: f64, v_max: f64 },
    /// The fitted equilibrium volume lies outside the sampled volumes.
    MinimumOutsideSamples { v0: f64, v_min: f64, v_max: f64 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::VertexOutsideSamples { vertex, v_min, v_max } => write!(
                f,
                "the minimum volume of a fitted parabola ({vertex:.4}) is not in your volumes \
                 [{v_min:.4}, {v_max:.4}]; you may not have a minimum in your dataset"
            ),
            Advisory::MinimumOutsideSamples { v0, v_min, v_max } => write!(
                f,
                "the fitted equilibrium volume ({v0:.4}) lies outside the sampled volumes \
                 [{v_min:.4}, {v_max:.4}]"
            ),
        }
    }
}

/// Nonlinear solver settings.
///
/// Defaults follow the usual MINPACK-style termination tests, tightened so that
/// noiseless data is recovered to well below typical reporting precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Maximum number of Levenberg–Marquardt iterations (Jacobian evaluations).
    pub max_iterations: usize,
    /// Relative reduction of the sum of squares below which the fit is accepted.
    pub ftol: f64,
    /// Relative step size below which the fit is accepted.
    pub xtol: f64,
    /// Scaled gradient norm below which the fit is accepted.
    pub gtol: f64,
    /// Initial Marquardt damping factor.
    pub initial_damping: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-12,
            initial_damping: 1e-3,
        }
    }
}

/// Outcome of a successful fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: EosModel,
    /// Equilibrium volume.
    pub v0: f64,
    /// Energy reported at the equilibrium (for antonschmidt: `Einf`).
    pub e0: f64,
    /// Bulk modulus in energy/volume units of the input.
    pub bulk_modulus: f64,
    /// Raw fitted parameter vector (see [`EosModel::param_names`]); empty for `sj`.
    pub params: Vec<f64>,
    /// Parameter covariance estimate, row-major, when it could be computed.
    pub covariance: Option<Vec<Vec<f64>>>,
    /// Residual sum of squares of the fitted curve over the samples.
    pub rss: f64,
    /// Nonlinear solver iterations, if the nonlinear path was used.
    pub iterations: Option<usize>,
    pub warnings: Vec<Advisory>,
}

impl FitResult {
    /// `(v0, e0, B)` triple.
    pub fn triple(&self) -> (f64, f64, f64) {
        (self.v0, self.e0, self.bulk_modulus)
    }

    /// One-sigma parameter uncertainties from the covariance diagonal.
    pub fn standard_errors(&self) -> Option<Vec<f64>> {
        self.covariance
            .as_ref()
            .map(|cov| cov.iter().enumerate().map(|(i, row)| row[i].max(0.0).sqrt()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_tags_round_trip_through_from_str() {
        for model in EosModel::ALL {
            assert_eq!(model.as_str().parse::<EosModel>().unwrap(), model);
        }
        assert_eq!("sjeos".parse::<EosModel>().unwrap(), EosModel::Sj);
        assert!("morse".parse::<EosModel>().is_err());
    }

    #[test]
    fn default_model_is_sj() {
        assert_eq!(EosModel::default(), EosModel::Sj);
    }

    #[test]
    fn serde_uses_lowercase_tags() {
        let json = serde_json::to_string(&EosModel::BirchMurnaghan).unwrap();
        assert_eq!(json, "\"birchmurnaghan\"");
        let back: EosModel = serde_json::from_str("\"sjeos\"").unwrap();
        assert_eq!(back, EosModel::Sj);
    }

    #[test]
    fn sample_set_rejects_bad_input() {
        assert!(matches!(
            SampleSet::new(vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 2.0, 3.0]),
            Err(EosError::InvalidInput(_))
        ));
        assert!(matches!(
            SampleSet::new(vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]),
            Err(EosError::InvalidInput(_))
        ));
        assert!(matches!(
            SampleSet::new(vec![1.0, 0.0, 3.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]),
            Err(EosError::InvalidInput(_))
        ));
        assert!(matches!(
            SampleSet::new(vec![1.0, 2.0, 3.0, 4.0], vec![1.0, f64::NAN, 3.0, 4.0]),
            Err(EosError::InvalidInput(_))
        ));
    }

    #[test]
    fn sample_set_range() {
        let s = SampleSet::new(vec![12.0, 10.0, 14.0, 11.0], vec![0.0; 4]).unwrap();
        assert_eq!(s.volume_range(), (10.0, 14.0));
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn standard_errors_from_covariance_diagonal() {
        let result = FitResult {
            model: EosModel::Murnaghan,
            v0: 1.0,
            e0: 0.0,
            bulk_modulus: 1.0,
            params: vec![0.0; 2],
            covariance: Some(vec![vec![4.0, 0.1], vec![0.1, 9.0]]),
            rss: 0.0,
            iterations: Some(1),
            warnings: Vec::new(),
        };
        assert_eq!(result.standard_errors().unwrap(), vec![2.0, 3.0]);
    }
}
