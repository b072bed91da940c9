//! Damped (Levenberg-Marquardt style) least-squares solver with robust
//! loss reweighting and a forward-difference Jacobian.

use ndarray::Array2;

use super::Loss;

const FTOL: f64 = 1e-10;
const XTOL: f64 = 1e-10;
const GTOL: f64 = 1e-10;
const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e12;

/// Minimize the robust loss of a residual vector over the parameters.
///
/// Returns the solution when the solve converges (small gradient, small cost
/// reduction, or small step), and `None` when it does not: fewer residuals than
/// parameters, non-finite costs or Jacobian entries, damping exhaustion, or the
/// evaluation cap running out. Every call of `residuals` counts against
/// `max_nfev`, including the Jacobian's difference evaluations.
pub(crate) fn solve_robust<F>(
    residuals: F,
    p0: &[f64],
    loss: Loss,
    f_scale: f64,
    max_nfev: usize,
) -> Option<Vec<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = p0.len();
    let mut p = p0.to_vec();
    let mut nfev = 0usize;

    let mut r = residuals(&p);
    nfev += 1;
    let m = r.len();
    // Underdetermined systems cannot certify a solution.
    if m < n {
        return None;
    }

    let mut cost = robust_cost(&r, loss, f_scale);
    if !cost.is_finite() {
        return None;
    }

    let mut damping = 1e-3;

    while nfev + n < max_nfev {
        let jac = forward_difference_jacobian(&residuals, &p, &r, &mut nfev);
        if jac.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let weights: Vec<f64> = r
            .iter()
            .map(|&ri| loss.weight((ri / f_scale) * (ri / f_scale)).max(0.0))
            .collect();

        // Gradient of the robust cost, g = J^T (w ∘ r).
        let mut gradient = vec![0.0; n];
        for i in 0..m {
            let wr = weights[i] * r[i];
            for j in 0..n {
                gradient[j] += jac[[i, j]] * wr;
            }
        }
        if gradient.iter().all(|g| g.abs() < GTOL) {
            return Some(p);
        }

        // Reweighted normal-equations matrix J^T W J, flat row-major.
        let mut normal = vec![0.0; n * n];
        for i in 0..m {
            for j in 0..n {
                let wj = weights[i] * jac[[i, j]];
                for k in 0..n {
                    normal[j * n + k] += wj * jac[[i, k]];
                }
            }
        }

        let neg_gradient: Vec<f64> = gradient.iter().map(|g| -g).collect();

        // Damped step, inflating the damping until the cost drops.
        loop {
            if nfev >= max_nfev {
                return None;
            }

            let mut damped = normal.clone();
            for j in 0..n {
                damped[j * n + j] += damping * normal[j * n + j].max(MIN_DAMPING);
            }
            let step = solve_symmetric_system(&damped, &neg_gradient, n);
            let trial: Vec<f64> = p.iter().zip(&step).map(|(pi, si)| pi + si).collect();
            let trial_r = residuals(&trial);
            nfev += 1;
            let trial_cost = robust_cost(&trial_r, loss, f_scale);

            if trial_cost.is_finite() && trial_cost < cost {
                let cost_drop = cost - trial_cost;
                let step_norm = euclidean_norm(&step);
                let p_norm = euclidean_norm(&trial);
                p = trial;
                r = trial_r;
                cost = trial_cost;
                damping = (damping * 0.25).max(MIN_DAMPING);
                if cost_drop <= FTOL * cost || step_norm <= XTOL * (XTOL + p_norm) {
                    return Some(p);
                }
                break;
            }

            damping *= 4.0;
            if damping > MAX_DAMPING {
                return None;
            }
        }
    }

    None
}

/// Two-point forward-difference Jacobian, one residual evaluation per column.
fn forward_difference_jacobian<F>(
    residuals: &F,
    p: &[f64],
    r0: &[f64],
    nfev: &mut usize,
) -> Array2<f64>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let m = r0.len();
    let n = p.len();
    let rel_step = f64::EPSILON.sqrt();
    let mut jac = Array2::zeros((m, n));

    for j in 0..n {
        let h = rel_step * p[j].abs().max(1.0);
        let mut shifted = p.to_vec();
        shifted[j] += h;
        let r_shifted = residuals(&shifted);
        *nfev += 1;
        for i in 0..m {
            jac[[i, j]] = (r_shifted[i] - r0[i]) / h;
        }
    }

    jac
}

fn robust_cost(r: &[f64], loss: Loss, f_scale: f64) -> f64 {
    let scale_sq = f_scale * f_scale;
    0.5 * scale_sq
        * r.iter()
            .map(|&ri| loss.rho((ri / f_scale) * (ri / f_scale)))
            .sum::<f64>()
}

fn euclidean_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cholesky solve of a symmetric positive-definite system. A non-positive
/// pivot is clamped to keep the factorization defined; the damping loop above
/// rejects any step that does not reduce the cost.
fn solve_symmetric_system(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut l = vec![0.0; n * n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i * n + j];
            for k in 0..j {
                sum -= l[i * n + k] * l[j * n + k];
            }
            if i == j {
                // A non-positive pivot means the damped matrix lost positive
                // definiteness; clamp it so the factorization stays defined.
                if sum <= 0.0 {
                    sum = 1e-12;
                }
                l[i * n + j] = sum.sqrt();
            } else {
                l[i * n + j] = sum / l[j * n + j];
            }
        }
    }

    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i * n + j] * y[j];
        }
        y[i] = sum / l[i * n + i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j * n + i] * x[j];
        }
        x[i] = sum / l[i * n + i];
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn recovers_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y: Vec<f64> = x.iter().map(|&xi| 2.0 * xi + 1.0).collect();
        let residuals =
            |p: &[f64]| -> Vec<f64> { x.iter().zip(&y).map(|(&xi, &yi)| p[0] * xi + p[1] - yi).collect() };

        let p = solve_robust(residuals, &[0.0, 0.0], Loss::Linear, 1.0, 1000).unwrap();
        assert_abs_diff_eq!(p[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn underdetermined_system_is_rejected() {
        let residuals = |p: &[f64]| -> Vec<f64> { vec![p[0] + p[1] - 1.0] };
        assert!(solve_robust(residuals, &[0.0, 0.0], Loss::Linear, 1.0, 1000).is_none());
    }

    #[test]
    fn non_finite_residuals_fail_the_solve() {
        let residuals = |_: &[f64]| -> Vec<f64> { vec![f64::NAN, 1.0, 2.0] };
        assert!(solve_robust(residuals, &[0.0, 0.0], Loss::Linear, 1.0, 1000).is_none());
    }

    #[test]
    fn evaluation_cap_is_respected() {
        // A residual the solver can never reduce below tolerance within 3 evals.
        let x = [1.0, 2.0, 3.0, 4.0];
        let residuals = |p: &[f64]| -> Vec<f64> {
            x.iter().map(|&xi| (p[0] * xi).exp() - xi.powi(3)).collect()
        };
        assert!(solve_robust(residuals, &[0.0, 0.0], Loss::Linear, 1.0, 3).is_none());
    }

    #[test]
    fn non_definite_system_still_yields_finite_solution() {
        // Singular [[1, 1], [1, 1]]: the clamped pivot keeps the solve defined.
        let a = [1.0, 1.0, 1.0, 1.0];
        let b = [2.0, 2.0];
        let x = solve_symmetric_system(&a, &b, 2);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn cholesky_solve_matches_direct_inverse() {
        // [[4, 2], [2, 3]] x = [10, 8] has solution [1.75, 1.5]
        let a = [4.0, 2.0, 2.0, 3.0];
        let b = [10.0, 8.0];
        let x = solve_symmetric_system(&a, &b, 2);
        assert_abs_diff_eq!(x[0], 1.75, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 1.5, epsilon = 1e-12);
    }
}
