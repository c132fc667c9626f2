//! # Portfolio Metrics
//!
//! $$
//! \mu_p = \mathbf{w}^\top \mu, \qquad \sigma_p = \sqrt{\mathbf{w}^\top \Sigma \mathbf{w}}
//! $$
//!
//! Combine a weight vector with asset statistics into portfolio-level metrics.

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::metrics::ratios::downside_deviation;
use crate::stats::check_rectangular;
use crate::stats::check_square;
use crate::types::PortfolioMetrics;
use crate::types::WEIGHT_TOLERANCE;

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub(crate) fn mat_vec_mul(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
  mat.iter().map(|row| dot(row, v)).collect()
}

pub(crate) fn quad_form(cov: &[Vec<f64>], w: &[f64]) -> f64 {
  dot(w, &mat_vec_mul(cov, w))
}

/// Check the long-only, fully invested invariant.
pub fn validate_weights(weights: &[f64]) -> Result<()> {
  if weights.is_empty() {
    return Err(AnalyticsError::InvalidWeights("empty weight vector".to_string()));
  }
  if let Some((idx, w)) = weights
    .iter()
    .enumerate()
    .find(|(_, w)| !w.is_finite() || **w < 0.0 || **w > 1.0 + WEIGHT_TOLERANCE)
  {
    return Err(AnalyticsError::InvalidWeights(format!(
      "weight {idx} is {w}, expected a value in [0, 1]"
    )));
  }
  let total: f64 = weights.iter().sum();
  if (total - 1.0).abs() > WEIGHT_TOLERANCE {
    return Err(AnalyticsError::InvalidWeights(format!(
      "weights sum to {total}, expected 1"
    )));
  }
  Ok(())
}

/// Daily return series of a weighted combination of aligned asset returns.
pub fn portfolio_daily_returns(weights: &[f64], returns_matrix: &[Vec<f64>]) -> Result<Vec<f64>> {
  let n_obs = check_rectangular(returns_matrix)?;
  if returns_matrix.len() != weights.len() {
    return Err(AnalyticsError::InvalidInput(format!(
      "{} weights for {} return series",
      weights.len(),
      returns_matrix.len()
    )));
  }

  Ok(
    (0..n_obs)
      .map(|t| {
        weights
          .iter()
          .zip(returns_matrix)
          .map(|(w, row)| w * row[t])
          .sum()
      })
      .collect(),
  )
}

/// Expected return, volatility, Sharpe and (when daily returns are supplied) Sortino
/// of a candidate allocation. All inputs are annualized; `risk_free` is a decimal.
pub fn portfolio_metrics(
  weights: &[f64],
  expected_returns: &[f64],
  cov: &[Vec<f64>],
  returns_matrix: Option<&[Vec<f64>]>,
  risk_free: f64,
) -> Result<PortfolioMetrics> {
  validate_weights(weights)?;
  check_square(cov)?;
  if expected_returns.len() != weights.len() || cov.len() != weights.len() {
    return Err(AnalyticsError::InvalidInput(format!(
      "{} weights, {} expected returns, {}x{} covariance",
      weights.len(),
      expected_returns.len(),
      cov.len(),
      cov.len()
    )));
  }

  let expected_return = dot(weights, expected_returns);
  let volatility = quad_form(cov, weights).max(0.0).sqrt();
  let sharpe_ratio = (volatility > 1e-15).then(|| (expected_return - risk_free) / volatility);

  let sortino_ratio = match returns_matrix {
    // Numerator is the model expected return, not the realized daily mean.
    Some(rows) => downside_deviation(&portfolio_daily_returns(weights, rows)?)
      .filter(|dd| *dd > 0.0)
      .map(|dd| (expected_return - risk_free) / dd),
    None => None,
  };

  Ok(PortfolioMetrics {
    expected_return,
    volatility,
    sharpe_ratio,
    sortino_ratio,
  })
}
