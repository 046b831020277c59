//! Closed-form energy models `E(V; p)`.
//!
//! Every function is pure: no state, no clamping. Inputs outside a model's
//! physical domain (negative base to a fractional power, log of a non-positive
//! number, `BP = 1` in Murnaghan/Vinet) produce NaN or infinity, which the
//! fitters treat as a failed evaluation.

use crate::domain::EosModel;

/// Energy function over a 4-entry parameter slice.
pub type EnergyFn = fn(f64, &[f64]) -> f64;

/// Third-order Taylor expansion about the minimum volume.
pub fn taylor(v: f64, e0: f64, beta: f64, alpha: f64, v0: f64) -> f64 {
    let dv = v - v0;
    e0 + beta / 2.0 * dv * dv / v0 + alpha / 6.0 * dv * dv * dv / v0
}

pub fn murnaghan(v: f64, e0: f64, b0: f64, bp: f64, v0: f64) -> f64 {
    e0 + b0 * v / bp * ((v0 / v).powf(bp) / (bp - 1.0) + 1.0) - v0 * b0 / (bp - 1.0)
}

pub fn birch(v: f64, e0: f64, b0: f64, bp: f64, v0: f64) -> f64 {
    let x = (v0 / v).powf(2.0 / 3.0) - 1.0;
    e0 + 9.0 / 8.0 * b0 * v0 * x * x + 9.0 / 16.0 * b0 * v0 * (bp - 4.0) * x * x * x
}

pub fn birch_murnaghan(v: f64, e0: f64, b0: f64, bp: f64, v0: f64) -> f64 {
    let eta = (v0 / v).powf(1.0 / 3.0);
    let x = eta * eta - 1.0;
    e0 + 9.0 * b0 * v0 / 16.0 * x * x * (6.0 + bp * x - 4.0 * eta * eta)
}

pub fn pourier_tarantola(v: f64, e0: f64, b0: f64, bp: f64, v0: f64) -> f64 {
    let eta = (v / v0).powf(1.0 / 3.0);
    let s = -3.0 * eta.ln();
    e0 + b0 * v0 * s * s / 6.0 * (3.0 + s * (bp - 2.0))
}

pub fn vinet(v: f64, e0: f64, b0: f64, bp: f64, v0: f64) -> f64 {
    let eta = (v / v0).powf(1.0 / 3.0);
    let k = bp - 1.0;
    e0 + 2.0 * b0 * v0 / (k * k)
        * (2.0 - (5.0 + 3.0 * bp * (eta - 1.0) - 3.0 * eta) * (-3.0 * k * (eta - 1.0) / 2.0).exp())
}

/// Anton–Schmidt form. `e_inf` is the (formal) energy at infinite separation and
/// `n` is typically close to `-2`.
pub fn anton_schmidt(v: f64, e_inf: f64, b: f64, n: f64, v0: f64) -> f64 {
    let x = v / v0;
    b * v0 / (n + 1.0) * x.powf(n + 1.0) * (x.ln() - 1.0 / (n + 1.0)) + e_inf
}

pub fn p3(v: f64, c0: f64, c1: f64, c2: f64, c3: f64) -> f64 {
    c0 + v * (c1 + v * (c2 + v * c3))
}

/// Look up the energy function for a model.
///
/// Returns `None` for `sj`, which is not parametrised by a closed-form vector.
pub fn energy_fn(model: EosModel) -> Option<EnergyFn> {
    let f: EnergyFn = match model {
        EosModel::Sj => return None,
        EosModel::Taylor => |v, p| taylor(v, p[0], p[1], p[2], p[3]),
        EosModel::Murnaghan => |v, p| murnaghan(v, p[0], p[1], p[2], p[3]),
        EosModel::Birch => |v, p| birch(v, p[0], p[1], p[2], p[3]),
        EosModel::BirchMurnaghan => |v, p| birch_murnaghan(v, p[0], p[1], p[2], p[3]),
        EosModel::PourierTarantola => |v, p| pourier_tarantola(v, p[0], p[1], p[2], p[3]),
        EosModel::Vinet => |v, p| vinet(v, p[0], p[1], p[2], p[3]),
        EosModel::AntonSchmidt => |v, p| anton_schmidt(v, p[0], p[1], p[2], p[3]),
        EosModel::P3 => |v, p| p3(v, p[0], p[1], p[2], p[3]),
    };
    Some(f)
}

/// Evaluate `E(V)` for the given model and parameter vector.
///
/// # Panics
/// Panics if `params` has fewer than 4 entries. Callers should size these
/// vectors with [`EosModel::param_count`].
pub fn energy(model: EosModel, v: f64, params: &[f64]) -> Option<f64> {
    energy_fn(model).map(|f| f(v, params))
}

/// Central-difference `dE/dV`, step relative to `v`.
pub fn denergy_dv(model: EosModel, v: f64, params: &[f64]) -> Option<f64> {
    let f = energy_fn(model)?;
    let h = 1e-5 * v.abs().max(1.0);
    Some((f(v + h, params) - f(v - h, params)) / (2.0 * h))
}
