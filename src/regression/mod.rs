//! Power-law curve fitting for dose and burst-kinetics relationships.
//!
//! Fits `y = a·x^b + c` to paired observations by damped non-linear least
//! squares with an optional robust loss, and scores the fit with the plain
//! coefficient of determination. Non-convergence is a normal outcome encoded
//! as NaN fields in the result, never an error.

use crate::error::{Result, StatsError};

mod least_squares;

/// Robust loss functions, mirroring the classic `least_squares` set.
///
/// The loss is applied to `z = (r / f_scale)²` for each residual `r`; `rho`
/// is the loss term itself and `weight` its derivative `rho'(z)`, used to
/// reweight residuals in the normal equations so outliers lose influence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Loss {
    /// Plain squared error: rho(z) = z.
    #[default]
    Linear,
    /// Smooth L1: rho(z) = 2((1 + z)^1/2 − 1).
    SoftL1,
    /// Huber: rho(z) = z for z ≤ 1, else 2 z^1/2 − 1.
    Huber,
    /// Cauchy: rho(z) = ln(1 + z).
    Cauchy,
    /// Arctan: rho(z) = arctan(z).
    Arctan,
}

impl Loss {
    /// The loss term for a scaled squared residual z.
    pub fn rho(self, z: f64) -> f64 {
        match self {
            Loss::Linear => z,
            Loss::SoftL1 => 2.0 * ((1.0 + z).sqrt() - 1.0),
            Loss::Huber => {
                if z <= 1.0 {
                    z
                } else {
                    2.0 * z.sqrt() - 1.0
                }
            }
            Loss::Cauchy => z.ln_1p(),
            Loss::Arctan => z.atan(),
        }
    }

    /// rho'(z), the per-residual weight in the reweighted normal equations.
    pub fn weight(self, z: f64) -> f64 {
        match self {
            Loss::Linear => 1.0,
            Loss::SoftL1 => 1.0 / (1.0 + z).sqrt(),
            Loss::Huber => {
                if z <= 1.0 {
                    1.0
                } else {
                    1.0 / z.sqrt()
                }
            }
            Loss::Cauchy => 1.0 / (1.0 + z),
            Loss::Arctan => 1.0 / (1.0 + z * z),
        }
    }
}

/// Configuration for [`fit_power_law`].
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub loss: Loss,
    /// Scale separating the inlier and outlier residual regimes of the robust
    /// loss; has no effect for [`Loss::Linear`].
    pub f_scale: f64,
    /// Cap on residual-function evaluations (Jacobian evaluations count).
    pub max_nfev: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            loss: Loss::Linear,
            f_scale: 1.0,
            max_nfev: 5000,
        }
    }
}

/// Result of a power-law fit: either all four fields are finite, or the fit
/// did not converge and all four are NaN. Partial results are never produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveFit {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Coefficient of determination of the model's predictions against the
    /// observed y values (not loss-adjusted).
    pub r2: f64,
}

impl CurveFit {
    /// The all-NaN result reported for a fit that did not converge.
    pub fn not_converged() -> Self {
        Self {
            a: f64::NAN,
            b: f64::NAN,
            c: f64::NAN,
            r2: f64::NAN,
        }
    }

    /// Whether the fit converged to a usable result.
    pub fn is_converged(&self) -> bool {
        self.a.is_finite() && self.b.is_finite() && self.c.is_finite() && self.r2.is_finite()
    }

    // Enforces the all-or-nothing invariant: any non-finite field degrades the
    // whole result to not-converged.
    fn from_solution(a: f64, b: f64, c: f64, r2: f64) -> Self {
        let fit = Self { a, b, c, r2 };
        if fit.is_converged() {
            fit
        } else {
            Self::not_converged()
        }
    }
}

/// The power-law model `a·x^b + c`.
///
/// Fractional powers of negative x follow `f64::powf` semantics and yield NaN;
/// such points silently degrade the fit rather than raising an error.
pub fn power_function(x: f64, a: f64, b: f64, c: f64) -> f64 {
    a * x.powf(b) + c
}

/// Fit `y = a·x^b + c` to paired samples by robust damped least squares.
///
/// Parameters start at `(a, b, c) = (1, 1, 0)`. The solve minimizes the robust
/// loss of the residuals `a·x^b + c − y` under the configured `f_scale`, with
/// residual evaluations capped at `options.max_nfev`. On convergence the fitted
/// coefficients and the R² of predicted-vs-actual y are returned; otherwise all
/// four fields are NaN. Fewer data points than free parameters cannot certify a
/// solution and reports as non-convergence.
///
/// # Arguments
///
/// * `x`, `y` - Equal-length paired observations
/// * `options` - Loss selector, robust scale, and evaluation cap
///
/// # Returns
///
/// `Result<CurveFit>` - The fit, or [`StatsError::InputLengthMismatch`] when
/// the sequences differ in length. Non-convergence is not an error.
pub fn fit_power_law(x: &[f64], y: &[f64], options: &FitOptions) -> Result<CurveFit> {
    if x.len() != y.len() {
        return Err(StatsError::InputLengthMismatch {
            x_len: x.len(),
            y_len: y.len(),
        });
    }

    let residuals = |p: &[f64]| -> Vec<f64> {
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| power_function(xi, p[0], p[1], p[2]) - yi)
            .collect()
    };

    let solution = least_squares::solve_robust(
        residuals,
        &[1.0, 1.0, 0.0],
        options.loss,
        options.f_scale,
        options.max_nfev,
    );

    match solution {
        Some(p) => {
            let predicted: Vec<f64> = x
                .iter()
                .map(|&xi| power_function(xi, p[0], p[1], p[2]))
                .collect();
            let r2 = r2_score(y, &predicted)?;
            Ok(CurveFit::from_solution(p[0], p[1], p[2], r2))
        }
        None => {
            log::debug!(
                "power-law fit did not converge within {} residual evaluations",
                options.max_nfev
            );
            Ok(CurveFit::not_converged())
        }
    }
}

/// Coefficient of determination, `1 − SS_res / SS_tot`.
///
/// Returns NaN when the actual values have zero variance (SS_tot = 0).
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.len() != predicted.len() {
        return Err(StatsError::InputLengthMismatch {
            x_len: actual.len(),
            y_len: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (&a, &p) in actual.iter().zip(predicted) {
        ss_res += (a - p) * (a - p);
        ss_tot += (a - mean) * (a - mean);
    }

    // Zero-variance actuals leave the score undefined for any residual.
    if ss_tot == 0.0 {
        return Ok(f64::NAN);
    }
    Ok(1.0 - ss_res / ss_tot)
}
