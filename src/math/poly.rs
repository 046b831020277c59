//! Polynomials on a centred, scaled abscissa.
//!
//! A [`Polynomial`] stores coefficients `q_k` of
//!
//! ```text
//! P(x) = Σ q_k · u^k,    u = (x - center) / scale
//! ```
//!
//! Fitting in `u ∈ [-1, 1]` keeps the Vandermonde system well conditioned even
//! when the samples span a narrow window far from the origin (typical for
//! volumes, and even more so for `V^(-1/3)`). Derivatives and roots are computed
//! in `u` and mapped back, so no conditioning is lost on the way out.
//! [`Polynomial::to_monomial`] expands to plain powers of `x` when raw
//! coefficients must be reported.

use nalgebra::{DMatrix, DVector};

use crate::math::ols::{solve_least_squares, vandermonde};

#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
    center: f64,
    scale: f64,
}

impl Polynomial {
    /// Plain polynomial in `x` with ascending coefficients.
    pub fn from_monomial(coeffs: Vec<f64>) -> Self {
        Self {
            coeffs,
            center: 0.0,
            scale: 1.0,
        }
    }

    /// Least-squares fit of a polynomial of the given degree.
    ///
    /// Returns `None` when the abscissae do not span an interval, there are
    /// fewer distinct abscissae than coefficients, or the solve is not finite.
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Option<Self> {
        if x.len() != y.len() || x.len() <= degree {
            return None;
        }
        let (lo, hi) = x
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let center = 0.5 * (lo + hi);
        let scale = 0.5 * (hi - lo);
        if !(scale.is_finite() && scale > 0.0) {
            return None;
        }

        let u: Vec<f64> = x.iter().map(|&v| (v - center) / scale).collect();
        let design = vandermonde(&u, degree);
        let rhs = DVector::from_column_slice(y);
        let q = solve_least_squares(&design, &rhs)?;

        Some(Self {
            coeffs: q.iter().copied().collect(),
            center,
            scale,
        })
    }

    /// Coefficients in the scaled variable `u`, ascending.
    pub fn scaled_coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Map `x` to the scaled variable `u`.
    pub fn to_scaled(&self, x: f64) -> f64 {
        (x - self.center) / self.scale
    }

    /// Map the scaled variable `u` back to `x`.
    pub fn from_scaled(&self, u: f64) -> f64 {
        self.center + self.scale * u
    }

    /// Evaluate `P(x)` (Horner).
    pub fn eval(&self, x: f64) -> f64 {
        let u = self.to_scaled(x);
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * u + c)
    }

    /// First derivative `dP/dx`, on the same abscissa mapping.
    pub fn derivative(&self) -> Self {
        let coeffs = if self.coeffs.len() <= 1 {
            vec![0.0]
        } else {
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, &c)| k as f64 * c / self.scale)
                .collect()
        };
        Self {
            coeffs,
            center: self.center,
            scale: self.scale,
        }
    }

    /// Real roots in `x`, ascending.
    ///
    /// Supports degree ≤ 2 in closed form, which covers the derivative of a
    /// cubic. Returns `None` for higher degrees. A polynomial that is
    /// identically zero has no isolated roots and yields an empty list.
    pub fn real_roots(&self) -> Option<Vec<f64>> {
        let mut q: &[f64] = &self.coeffs;
        while let Some((&last, rest)) = q.split_last() {
            if last != 0.0 {
                break;
            }
            q = rest;
        }

        let mut roots_u = match q.len() {
            0 | 1 => Vec::new(),
            2 => vec![-q[0] / q[1]],
            3 => quadratic_roots(q[2], q[1], q[0]),
            _ => return None,
        };
        roots_u.sort_by(|a, b| a.total_cmp(b));
        Some(roots_u.into_iter().map(|u| self.from_scaled(u)).collect())
    }

    /// Expand into ascending coefficients of plain powers of `x`.
    pub fn to_monomial(&self) -> Vec<f64> {
        // Σ_k q_k s^-k (x - m)^k = Σ_k q_k s^-k Σ_j C(k,j) x^j (-m)^(k-j)
        let n = self.coeffs.len();
        let mut out = vec![0.0; n];
        for (k, &q) in self.coeffs.iter().enumerate() {
            let a = q / self.scale.powi(k as i32);
            let mut binom = 1.0;
            for j in 0..=k {
                out[j] += a * binom * (-self.center).powi((k - j) as i32);
                binom = binom * (k - j) as f64 / (j + 1) as f64;
            }
        }
        out
    }

    /// Linear map from scaled coefficients to monomial coefficients.
    ///
    /// Column `k` holds the monomial expansion of `u^k`, so a covariance `C_u`
    /// of the scaled coefficients maps to `M C_u Mᵀ`.
    pub fn monomial_map(&self) -> DMatrix<f64> {
        let n = self.coeffs.len();
        let mut m = DMatrix::<f64>::zeros(n, n);
        for k in 0..n {
            let mut unit = vec![0.0; n];
            unit[k] = 1.0;
            let basis = Self {
                coeffs: unit,
                center: self.center,
                scale: self.scale,
            };
            m.set_column(k, &DVector::from_vec(basis.to_monomial()));
        }
        m
    }
}

/// Real roots of `a u^2 + b u + c` with `a != 0`, using the cancellation-free form.
fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let disc = b * b - 4.0 * a * c;
    if !disc.is_finite() || disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    let q = -0.5 * (b + b.signum() * sq);
    if q == 0.0 {
        // b == 0 and c == 0: double root at zero.
        return vec![0.0, 0.0];
    }
    vec![q / a, c / q]
}
