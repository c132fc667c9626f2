//! # Softmax Search
//!
//! $$
//! w_i = \frac{e^{x_i - \max_j x_j}}{\sum_k e^{x_k - \max_j x_j}}
//! $$
//!
//! Derivative-free search over the probability simplex. Unconstrained logits are fed
//! through softmax and minimized with Nelder-Mead.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::solver::neldermead::NelderMead;
use tracing::debug;

const SD_TOLERANCE: f64 = 1e-10;
const MAX_ITERS: u64 = 5000;

pub(crate) fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if !sum.is_finite() || sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Logits whose softmax reproduces `w`, floored so corner weights stay finite.
pub(crate) fn logits(w: &[f64]) -> Vec<f64> {
  w.iter().map(|&v| v.max(1e-12).ln()).collect()
}

struct SoftmaxCost<F> {
  objective: F,
}

impl<F> CostFunction for SoftmaxCost<F>
where
  F: Fn(&[f64]) -> f64,
{
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
    let value = (self.objective)(&softmax(x));
    Ok(if value.is_finite() { value } else { f64::MAX })
  }
}

/// Minimize `objective(w)` over long-only, fully invested `w`, starting at `start`.
///
/// Falls back to `start` when the solver cannot be built or fails.
pub(crate) fn minimize_on_simplex<F>(objective: F, start: &[f64]) -> Vec<f64>
where
  F: Fn(&[f64]) -> f64,
{
  let n = start.len();
  let x0 = logits(start);
  let mut simplex = Vec::with_capacity(n + 1);
  simplex.push(x0.clone());
  for i in 0..n {
    let mut point = x0.clone();
    point[i] += 1.0;
    simplex.push(point);
  }

  let cost = SoftmaxCost { objective };
  let solver = match NelderMead::new(simplex).with_sd_tolerance(SD_TOLERANCE) {
    Ok(solver) => solver,
    Err(e) => {
      debug!(error = %e, "nelder-mead setup failed");
      return start.to_vec();
    }
  };

  match Executor::new(cost, solver)
    .configure(|state| state.max_iters(MAX_ITERS))
    .run()
  {
    Ok(res) => {
      debug!(
        iterations = res.state.iter,
        best_cost = res.state.best_cost,
        "nelder-mead finished"
      );
      res
        .state
        .best_param
        .map(|x| softmax(&x))
        .unwrap_or_else(|| start.to_vec())
    }
    Err(e) => {
      debug!(error = %e, "nelder-mead failed");
      start.to_vec()
    }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  #[test]
  fn softmax_is_on_simplex() {
    let w = softmax(&[1.0, -2.0, 0.5, 700.0]);
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert!(w.iter().all(|v| (0.0..=1.0).contains(v)));
  }

  #[test]
  fn logits_invert_softmax() {
    let w = vec![0.2, 0.3, 0.5];
    let back = softmax(&logits(&w));
    for (a, b) in w.iter().zip(&back) {
      assert_abs_diff_eq!(a, b, epsilon = 1e-12);
    }
  }

  #[test]
  fn minimizes_distance_to_interior_target() {
    let target = [0.6, 0.3, 0.1];
    let w = minimize_on_simplex(
      |w| w.iter().zip(&target).map(|(a, b)| (a - b).powi(2)).sum(),
      &[1.0 / 3.0; 3],
    );
    for (a, b) in w.iter().zip(&target) {
      assert_abs_diff_eq!(a, b, epsilon = 1e-3);
    }
  }
}
