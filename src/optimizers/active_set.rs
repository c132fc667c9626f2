//! # Active-Set QP
//!
//! $$
//! \min_{\mathbf{w}} \tfrac12 \mathbf{w}^\top \Sigma \mathbf{w}
//! \quad \text{s.t.}\quad A\mathbf{w} = \mathbf{b},\ \mathbf{w} \ge 0
//! $$
//!
//! Primal active-set method for convex quadratic programs with equality rows and
//! non-negativity bounds. Each iteration solves the equality-constrained problem on
//! the free variables through its KKT system.

use nalgebra::DMatrix;
use nalgebra::DVector;
use tracing::debug;
use tracing::warn;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::portfolio::mat_vec_mul;

const MAX_ITERS: usize = 500;
const STEP_TOL: f64 = 1e-12;
const MULTIPLIER_TOL: f64 = 1e-10;

/// Linear equality `coeffs' w = rhs`.
#[derive(Clone, Debug)]
pub(crate) struct Equality {
  pub coeffs: Vec<f64>,
  pub rhs: f64,
}

impl Equality {
  pub fn new(coeffs: Vec<f64>, rhs: f64) -> Self {
    Self { coeffs, rhs }
  }

  pub fn budget(n: usize) -> Self {
    Self::new(vec![1.0; n], 1.0)
  }
}

/// Solve the equality-constrained subproblem on `free` variables.
///
/// Returns the free-variable solution and the equality multipliers.
fn solve_kkt(
  cov: &[Vec<f64>],
  equalities: &[Equality],
  free: &[usize],
) -> Result<(Vec<f64>, Vec<f64>)> {
  let nf = free.len();
  let m = equalities.len();
  let dim = nf + m;

  let mut kkt = DMatrix::<f64>::zeros(dim, dim);
  for (a, &i) in free.iter().enumerate() {
    for (b, &j) in free.iter().enumerate() {
      kkt[(a, b)] = cov[i][j];
    }
    for (k, eq) in equalities.iter().enumerate() {
      kkt[(a, nf + k)] = eq.coeffs[i];
      kkt[(nf + k, a)] = eq.coeffs[i];
    }
  }

  let mut rhs = DVector::<f64>::zeros(dim);
  for (k, eq) in equalities.iter().enumerate() {
    rhs[nf + k] = eq.rhs;
  }

  let sol = match kkt.clone().lu().solve(&rhs) {
    Some(sol) if sol.iter().all(|v| v.is_finite()) => sol,
    _ => kkt
      .svd(true, true)
      .solve(&rhs, 1e-14)
      .map_err(|e| AnalyticsError::Optimization(format!("KKT system solve failed: {e}")))?,
  };

  // The system is written with +A', so the multipliers of `A w = b` are negated.
  let x = sol.rows(0, nf).iter().copied().collect();
  let lambda = sol.rows(nf, m).iter().map(|v| -v).collect();
  Ok((x, lambda))
}

/// Minimize `w' cov w` over `w >= 0` subject to `equalities`, starting from the
/// feasible point `start`.
pub(crate) fn solve(cov: &[Vec<f64>], equalities: &[Equality], start: &[f64]) -> Result<Vec<f64>> {
  let n = start.len();
  let mut w = start.to_vec();
  let mut bound = vec![false; n];

  for iter in 0..MAX_ITERS {
    let free: Vec<usize> = (0..n).filter(|&i| !bound[i]).collect();
    if free.is_empty() {
      return Err(AnalyticsError::Optimization(
        "active set fixed every weight at zero".to_string(),
      ));
    }

    let (x, lambda) = solve_kkt(cov, equalities, &free)?;
    let step: Vec<f64> = free.iter().zip(&x).map(|(&i, xi)| xi - w[i]).collect();
    let step_norm = step.iter().fold(0.0_f64, |acc, p| acc.max(p.abs()));

    if step_norm < STEP_TOL {
      let grad = mat_vec_mul(cov, &w);
      let release = (0..n)
        .filter(|&i| bound[i])
        .map(|i| {
          let nu = grad[i]
            - equalities
              .iter()
              .zip(&lambda)
              .map(|(eq, l)| l * eq.coeffs[i])
              .sum::<f64>();
          (i, nu)
        })
        .filter(|(_, nu)| *nu < -MULTIPLIER_TOL)
        .min_by(|a, b| a.1.total_cmp(&b.1));

      match release {
        Some((i, _)) => bound[i] = false,
        None => {
          debug!(
            iterations = iter + 1,
            bound = bound.iter().filter(|b| **b).count(),
            "active-set converged"
          );
          return Ok(w);
        }
      }
      continue;
    }

    let mut alpha = 1.0;
    let mut blocking = None;
    for (&i, &p) in free.iter().zip(&step) {
      if p < 0.0 {
        let ratio = -w[i] / p;
        if ratio < alpha {
          alpha = ratio;
          blocking = Some(i);
        }
      }
    }

    for (&i, &p) in free.iter().zip(&step) {
      w[i] += alpha * p;
    }
    if let Some(i) = blocking {
      w[i] = 0.0;
      bound[i] = true;
    }
  }

  warn!(max_iters = MAX_ITERS, "active-set did not converge, returning last feasible point");
  Ok(w)
}
