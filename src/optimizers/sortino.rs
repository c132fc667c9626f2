//! # Maximum Sortino
//!
//! $$
//! \max_{\mathbf{w}\in\Delta} \frac{\mathbf{w}^\top\mu-r_f}{\mathrm{DD}\!\left(R\,\mathbf{w}\right)}
//! $$
//!
//! The downside deviation depends on the realized path of the portfolio, so each
//! candidate weight vector is re-evaluated against the aligned daily returns.

use std::f64::consts::FRAC_PI_2;

use tracing::debug;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::metrics::ratios::downside_deviation;
use crate::portfolio::dot;
use crate::portfolio::portfolio_daily_returns;
use crate::portfolio::validate_weights;
use crate::stats::check_rectangular;
use super::mean_variance::best_of;
use super::mean_variance::check_asset_count;
use super::mean_variance::check_returns;
use super::mean_variance::clean_weights;
use super::mean_variance::corners;
use super::simplex::minimize_on_simplex;

/// Sortino ratio mapped through `atan`. Allocations without downside score above
/// `pi / 2` when their excess return is positive, ordered by that excess.
fn sortino_score(w: &[f64], expected_returns: &[f64], returns_matrix: &[Vec<f64>], risk_free: f64) -> f64 {
  let excess = dot(w, expected_returns) - risk_free;
  let Ok(daily) = portfolio_daily_returns(w, returns_matrix) else {
    return f64::NEG_INFINITY;
  };
  match downside_deviation(&daily).filter(|dd| *dd > 0.0) {
    Some(dd) => (excess / dd).atan(),
    None if excess > 0.0 => FRAC_PI_2 + excess,
    None if excess < 0.0 => -FRAC_PI_2 + excess,
    None => 0.0,
  }
}

/// Long-only weights maximizing the Sortino ratio of the portfolio's daily returns.
///
/// `returns_matrix` holds one aligned daily return row per asset.
pub fn maximum_sortino(
  expected_returns: &[f64],
  returns_matrix: &[Vec<f64>],
  risk_free: f64,
) -> Result<Vec<f64>> {
  let n = returns_matrix.len();
  check_asset_count(n)?;
  check_returns(expected_returns, n)?;
  let n_obs = check_rectangular(returns_matrix)?;
  if n_obs < 2 {
    return Err(AnalyticsError::insufficient(2, n_obs));
  }

  let score = |w: &[f64]| sortino_score(w, expected_returns, returns_matrix, risk_free);

  let mut candidates = corners(n);
  candidates.push(vec![1.0 / n as f64; n]);

  let from_equal = minimize_on_simplex(|w| -score(w), &vec![1.0 / n as f64; n]);
  let restart = minimize_on_simplex(|w| -score(w), &from_equal);
  candidates.push(from_equal);
  candidates.push(restart);

  let w = clean_weights(&best_of(&candidates, score));
  validate_weights(&w)?;
  debug!(assets = n, observations = n_obs, sortino = score(&w), "maximum sortino solved");
  Ok(w)
}
