//! # Mean-Variance
//!
//! $$
//! \min_{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1} \mathbf{w}^\top\Sigma\mathbf{w}
//! \qquad
//! \max_{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1} \frac{\mathbf{w}^\top\mu-r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Long-only minimum-variance, tangency and maximum-return allocations.

use nalgebra::DVector;
use tracing::debug;
use tracing::warn;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::portfolio::dot;
use crate::portfolio::quad_form;
use crate::portfolio::validate_weights;
use crate::stats::DEFAULT_RIDGE;
use crate::stats::check_square;
use crate::stats::is_positive_definite;
use crate::stats::regularize_cov;
use crate::stats::to_dmatrix;
use crate::types::WEIGHT_TOLERANCE;
use super::active_set::Equality;
use super::active_set;
use super::simplex::minimize_on_simplex;

/// Fewer assets than this leaves nothing to optimize.
pub const MIN_ASSETS: usize = 2;

const SYMMETRY_TOLERANCE: f64 = 1e-10;
const TIE_TOLERANCE: f64 = 1e-9;
const FLAT_RETURNS: f64 = 1e-12;

pub(crate) fn check_asset_count(n: usize) -> Result<()> {
  if n < MIN_ASSETS {
    return Err(AnalyticsError::Optimization(format!(
      "at least {MIN_ASSETS} assets are required, got {n}"
    )));
  }
  Ok(())
}

pub(crate) fn check_returns(expected_returns: &[f64], n: usize) -> Result<()> {
  if expected_returns.len() != n {
    return Err(AnalyticsError::InvalidInput(format!(
      "{} expected returns for {n} assets",
      expected_returns.len()
    )));
  }
  if expected_returns.iter().any(|m| !m.is_finite()) {
    return Err(AnalyticsError::InvalidInput(
      "expected returns contain non-finite entries".to_string(),
    ));
  }
  Ok(())
}

/// Validate a covariance matrix and make it positive definite.
///
/// A matrix that already factors is returned unchanged; otherwise the default ridge is
/// added to the diagonal once.
pub(crate) fn prepare_covariance(cov: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
  check_asset_count(cov.len())?;
  check_square(cov)?;

  let n = cov.len();
  for i in 0..n {
    for j in (i + 1)..n {
      let scale = cov[i][j].abs().max(cov[j][i].abs()).max(1.0);
      if (cov[i][j] - cov[j][i]).abs() > SYMMETRY_TOLERANCE * scale {
        return Err(AnalyticsError::InvalidInput(format!(
          "covariance matrix is not symmetric at ({i}, {j})"
        )));
      }
    }
  }

  if is_positive_definite(cov) {
    return Ok(cov.to_vec());
  }

  warn!(
    assets = n,
    ridge = DEFAULT_RIDGE,
    "covariance matrix is not positive definite, adding ridge"
  );
  let ridged = regularize_cov(cov, DEFAULT_RIDGE);
  if is_positive_definite(&ridged) {
    Ok(ridged)
  } else {
    Err(AnalyticsError::Optimization(
      "covariance matrix is not positive definite after regularization".to_string(),
    ))
  }
}

/// Snap dust to zero and renormalize onto the simplex.
pub fn clean_weights(weights: &[f64]) -> Vec<f64> {
  let snapped: Vec<f64> = weights
    .iter()
    .map(|&w| if w < WEIGHT_TOLERANCE { 0.0 } else { w })
    .collect();
  let total: f64 = snapped.iter().sum();
  if total <= 0.0 {
    return vec![1.0 / weights.len() as f64; weights.len()];
  }
  snapped.iter().map(|w| w / total).collect()
}

/// Clip negative solver noise and rescale onto the simplex.
pub(crate) fn normalize_nonnegative(weights: &[f64]) -> Result<Vec<f64>> {
  if weights.iter().any(|v| !v.is_finite()) {
    return Err(AnalyticsError::Optimization(
      "solver returned non-finite weights".to_string(),
    ));
  }
  let clipped: Vec<f64> = weights.iter().map(|v| v.max(0.0)).collect();
  let total: f64 = clipped.iter().sum();
  if !total.is_finite() || total <= 0.0 {
    return Err(AnalyticsError::Optimization(format!(
      "solver returned weights with total {total}"
    )));
  }
  Ok(clipped.iter().map(|v| v / total).collect())
}

/// `Sigma^{-1} 1` normalized to sum to one. Weights may be negative.
pub fn unconstrained_minimum_variance(cov: &[Vec<f64>]) -> Result<Vec<f64>> {
  let cov = prepare_covariance(cov)?;
  let n = cov.len();
  let chol = to_dmatrix(&cov)
    .cholesky()
    .ok_or_else(|| AnalyticsError::Optimization("Cholesky factorization failed".to_string()))?;
  let x = chol.solve(&DVector::from_element(n, 1.0));
  let total = x.sum();
  if !total.is_finite() || total.abs() < 1e-15 {
    return Err(AnalyticsError::Optimization(
      "degenerate unconstrained minimum-variance solution".to_string(),
    ));
  }
  Ok(x.iter().map(|v| v / total).collect())
}

/// Long-only, fully invested minimum-variance weights.
///
/// On the assets it holds, the result coincides with the unconstrained minimum-variance
/// portfolio of that subset.
pub fn minimum_variance(cov: &[Vec<f64>]) -> Result<Vec<f64>> {
  let cov = prepare_covariance(cov)?;
  let n = cov.len();
  let w = active_set::solve(&cov, &[Equality::budget(n)], &vec![1.0 / n as f64; n])?;
  let w = clean_weights(&normalize_nonnegative(&w)?);
  validate_weights(&w)?;
  debug!(assets = n, variance = quad_form(&cov, &w), "minimum variance solved");
  Ok(w)
}

/// Minimum-variance weights earning exactly `target`. `cov` must already be prepared.
pub(crate) fn minimum_variance_for_target(
  expected_returns: &[f64],
  cov: &[Vec<f64>],
  target: f64,
) -> Result<Vec<f64>> {
  let n = cov.len();
  let (lo, hi) = extreme_indices(expected_returns);
  let (mu_lo, mu_hi) = (expected_returns[lo], expected_returns[hi]);

  if mu_hi - mu_lo < FLAT_RETURNS {
    let w = active_set::solve(cov, &[Equality::budget(n)], &vec![1.0 / n as f64; n])?;
    return normalize_nonnegative(&w).map(|w| clean_weights(&w));
  }

  let target = target.clamp(mu_lo, mu_hi);

  // At either end only the assets sharing the extreme return are feasible.
  if let Some(extreme) = [mu_lo, mu_hi]
    .into_iter()
    .find(|e| (target - e).abs() < FLAT_RETURNS)
  {
    let members: Vec<usize> = (0..n)
      .filter(|&i| (expected_returns[i] - extreme).abs() < FLAT_RETURNS)
      .collect();
    let sub: Vec<Vec<f64>> = members
      .iter()
      .map(|&i| members.iter().map(|&j| cov[i][j]).collect())
      .collect();
    let m = members.len();
    let sub_w = active_set::solve(&sub, &[Equality::budget(m)], &vec![1.0 / m as f64; m])?;
    let mut w = vec![0.0; n];
    for (&i, v) in members.iter().zip(clean_weights(&normalize_nonnegative(&sub_w)?)) {
      w[i] = v;
    }
    return Ok(w);
  }

  let theta = (target - mu_lo) / (mu_hi - mu_lo);
  let mut start = vec![0.0; n];
  start[lo] += 1.0 - theta;
  start[hi] += theta;

  let equalities = [
    Equality::budget(n),
    Equality::new(expected_returns.to_vec(), target),
  ];
  normalize_nonnegative(&active_set::solve(cov, &equalities, &start)?)
}

fn extreme_indices(values: &[f64]) -> (usize, usize) {
  let mut lo = 0;
  let mut hi = 0;
  for (i, v) in values.iter().enumerate() {
    if *v < values[lo] {
      lo = i;
    }
    if *v > values[hi] {
      hi = i;
    }
  }
  (lo, hi)
}

fn sharpe(w: &[f64], expected_returns: &[f64], cov: &[Vec<f64>], risk_free: f64) -> f64 {
  let vol = quad_form(cov, w).max(0.0).sqrt();
  if vol < 1e-15 {
    return f64::NEG_INFINITY;
  }
  (dot(w, expected_returns) - risk_free) / vol
}

/// Long-only tangency portfolio.
///
/// When some asset beats the risk-free rate the problem is solved exactly as
/// `min y' Sigma y` subject to `(mu - rf)' y = 1, y >= 0`, then rescaled. Otherwise the
/// Sharpe ratio is negative everywhere and a softmax Nelder-Mead search picks the least
/// negative allocation.
pub fn maximum_sharpe(expected_returns: &[f64], cov: &[Vec<f64>], risk_free: f64) -> Result<Vec<f64>> {
  let cov = prepare_covariance(cov)?;
  let n = cov.len();
  check_returns(expected_returns, n)?;

  let excess: Vec<f64> = expected_returns.iter().map(|m| m - risk_free).collect();
  let (_, best) = extreme_indices(&excess);

  if excess[best] > 0.0 {
    let mut start = vec![0.0; n];
    start[best] = 1.0 / excess[best];
    let y = active_set::solve(&cov, &[Equality::new(excess, 1.0)], &start)?;
    let w = clean_weights(&normalize_nonnegative(&y)?);
    validate_weights(&w)?;
    debug!(
      assets = n,
      sharpe = sharpe(&w, expected_returns, &cov, risk_free),
      "maximum sharpe solved"
    );
    return Ok(w);
  }

  debug!(risk_free, "no asset beats the risk-free rate, searching numerically");
  let mut candidates = corners(n);
  candidates.push(vec![1.0 / n as f64; n]);
  candidates.push(minimum_variance(&cov)?);

  let score = |w: &[f64]| sharpe(w, expected_returns, &cov, risk_free);
  let start = best_of(&candidates, score);
  let refined = minimize_on_simplex(|w| -score(w), &start);
  candidates.push(refined);
  let w = clean_weights(&best_of(&candidates, score));
  validate_weights(&w)?;
  Ok(w)
}

/// Every unit vector of length `n`.
pub(crate) fn corners(n: usize) -> Vec<Vec<f64>> {
  (0..n)
    .map(|i| {
      let mut w = vec![0.0; n];
      w[i] = 1.0;
      w
    })
    .collect()
}

/// Highest scoring candidate. NaN scores lose.
pub(crate) fn best_of<F>(candidates: &[Vec<f64>], score: F) -> Vec<f64>
where
  F: Fn(&[f64]) -> f64,
{
  candidates
    .iter()
    .map(|w| {
      let s = score(w);
      (w, if s.is_nan() { f64::NEG_INFINITY } else { s })
    })
    .max_by(|a, b| a.1.total_cmp(&b.1))
    .map(|(w, _)| w.clone())
    .unwrap_or_default()
}

/// All weight on the highest expected return, split evenly across near ties.
pub fn maximum_return(expected_returns: &[f64]) -> Result<Vec<f64>> {
  let n = expected_returns.len();
  check_asset_count(n)?;
  check_returns(expected_returns, n)?;

  let best = expected_returns
    .iter()
    .cloned()
    .fold(f64::NEG_INFINITY, f64::max);
  let winners: Vec<bool> = expected_returns
    .iter()
    .map(|m| best - m <= TIE_TOLERANCE)
    .collect();
  let count = winners.iter().filter(|w| **w).count() as f64;

  let w: Vec<f64> = winners
    .iter()
    .map(|&w| if w { 1.0 / count } else { 0.0 })
    .collect();
  validate_weights(&w)?;
  Ok(w)
}
