use statrs::statistics::Statistics;

use crate::error::Result;
use crate::returns::align_return_series;
use crate::returns::check_positive_prices;
use crate::returns::daily_returns;
use crate::types::TRADING_DAYS;

const VARIANCE_FLOOR: f64 = 1e-18;

/// Sensitivity of asset returns to benchmark returns.
///
/// Ragged inputs are truncated to their common tail. `None` when the benchmark is
/// empty, fewer than two paired observations remain, or the benchmark has no variance.
pub fn beta(asset_returns: &[f64], benchmark_returns: &[f64]) -> Option<f64> {
  if benchmark_returns.is_empty() || asset_returns.is_empty() {
    return None;
  }

  let aligned = align_return_series(&[asset_returns.to_vec(), benchmark_returns.to_vec()]);
  let (asset, bench) = (&aligned[0], &aligned[1]);
  if bench.len() < 2 {
    return None;
  }

  let var_b = bench.iter().variance();
  if !var_b.is_finite() || var_b < VARIANCE_FLOOR {
    return None;
  }

  Some(asset.iter().covariance(bench.iter()) / var_b)
}

/// Annualized Sharpe ratio of a daily return series.
pub fn sharpe_ratio_from_returns(returns: &[f64], risk_free: f64) -> Option<f64> {
  if returns.len() < 2 {
    return None;
  }

  let mean = returns.iter().mean() * TRADING_DAYS;
  let sd = returns.iter().std_dev() * TRADING_DAYS.sqrt();
  if !sd.is_finite() || sd <= 0.0 {
    return None;
  }

  Some((mean - risk_free) / sd)
}

/// Daily returns of a close series, or `None` when fewer than two closes exist.
fn close_returns(prices: &[f64]) -> Result<Option<Vec<f64>>> {
  check_positive_prices(prices)?;
  if prices.len() < 2 {
    return Ok(None);
  }
  daily_returns(prices).map(Some)
}

/// Annualized Sharpe ratio of a close series. `risk_free` is a decimal annual rate.
///
/// Malformed closes fail with `InvalidInput`; a series too short or too flat to
/// measure is `Ok(None)`.
pub fn sharpe_ratio(prices: &[f64], risk_free: f64) -> Result<Option<f64>> {
  Ok(close_returns(prices)?.and_then(|r| sharpe_ratio_from_returns(&r, risk_free)))
}

/// Annualized downside deviation: root mean square of the negative daily returns
/// (threshold zero, averaged over the negative observations), times sqrt(252).
///
/// `None` when no return is below zero.
pub fn downside_deviation(returns: &[f64]) -> Option<f64> {
  let (sum_sq, count) = returns
    .iter()
    .filter(|r| **r < 0.0)
    .fold((0.0, 0usize), |(s, c), r| (s + r * r, c + 1));

  if count == 0 {
    return None;
  }

  Some((sum_sq / count as f64).sqrt() * TRADING_DAYS.sqrt())
}

/// Annualized Sortino ratio of a daily return series.
pub fn sortino_ratio_from_returns(returns: &[f64], risk_free: f64) -> Option<f64> {
  if returns.is_empty() {
    return None;
  }

  let dd = downside_deviation(returns)?;
  if dd <= 0.0 {
    return None;
  }

  let mean = returns.iter().mean() * TRADING_DAYS;
  Some((mean - risk_free) / dd)
}

/// Annualized Sortino ratio of a close series. `Ok(None)` without downside observations.
pub fn sortino_ratio(prices: &[f64], risk_free: f64) -> Result<Option<f64>> {
  Ok(close_returns(prices)?.and_then(|r| sortino_ratio_from_returns(&r, risk_free)))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;
  use crate::error::AnalyticsError;

  #[test]
  fn beta_of_identical_series_is_one() {
    let r = vec![0.01, -0.02, 0.015, 0.004, -0.006, 0.011];
    assert_relative_eq!(beta(&r, &r).unwrap(), 1.0, epsilon = 1e-9);
  }

  #[test]
  fn beta_scales_with_leverage() {
    let bench = vec![0.01, -0.02, 0.015, 0.004, -0.006, 0.011];
    let asset: Vec<f64> = bench.iter().map(|r| 2.0 * r).collect();
    assert_relative_eq!(beta(&asset, &bench).unwrap(), 2.0, epsilon = 1e-9);
  }

  #[test]
  fn beta_without_benchmark_is_none() {
    assert_eq!(beta(&[0.01, 0.02], &[]), None);
    assert_eq!(beta(&[0.01, 0.02], &[0.01]), None);
    assert_eq!(beta(&[0.01, 0.02, 0.03], &[0.01, 0.01, 0.01]), None);
  }

  #[test]
  fn beta_aligns_ragged_series_on_tail() {
    let bench = vec![0.01, -0.02, 0.015, 0.004];
    let asset = vec![0.5, 0.01, -0.02, 0.015, 0.004];
    assert_relative_eq!(beta(&asset, &bench).unwrap(), 1.0, epsilon = 1e-9);
  }

  #[test]
  fn sharpe_requires_two_points() {
    assert_eq!(sharpe_ratio(&[100.0], 0.0).unwrap(), None);
    assert_eq!(sharpe_ratio(&[], 0.0).unwrap(), None);
  }

  #[test]
  fn sharpe_matches_manual_computation() {
    let prices = [100.0, 101.0, 100.5, 102.0, 101.0, 103.0];
    let r = daily_returns(&prices).unwrap();
    let n = r.len() as f64;
    let mean = r.iter().sum::<f64>() / n;
    let var = r.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let expected = (mean * 252.0 - 0.02) / (var.sqrt() * 252.0_f64.sqrt());
    assert_relative_eq!(
      sharpe_ratio(&prices, 0.02).unwrap().unwrap(),
      expected,
      epsilon = 1e-9
    );
  }

  #[test]
  fn sharpe_of_flat_series_is_none() {
    assert_eq!(sharpe_ratio(&[100.0, 100.0, 100.0], 0.0).unwrap(), None);
  }

  #[test]
  fn downside_deviation_uses_negative_returns_only() {
    let dd = downside_deviation(&[0.02, -0.01, 0.03, -0.03]).unwrap();
    let expected = ((0.0001 + 0.0009) / 2.0_f64).sqrt() * 252.0_f64.sqrt();
    assert_abs_diff_eq!(dd, expected, epsilon = 1e-12);
  }

  #[test]
  fn sortino_without_downside_is_none() {
    assert_eq!(sortino_ratio(&[100.0, 101.0, 102.0, 103.0], 0.0).unwrap(), None);
  }

  #[test]
  fn sortino_exceeds_sharpe_for_upside_skew() {
    let prices = [100.0, 103.0, 102.5, 106.0, 105.8, 110.0, 109.9];
    let sharpe = sharpe_ratio(&prices, 0.0).unwrap().unwrap();
    let sortino = sortino_ratio(&prices, 0.0).unwrap().unwrap();
    assert!(sortino > sharpe);
  }

  #[test]
  fn ratios_reject_malformed_closes() {
    for prices in [[100.0, -50.0, 20.0], [0.0, 10.0, 5.0], [100.0, f64::NAN, 50.0]] {
      assert!(matches!(
        sharpe_ratio(&prices, 0.0),
        Err(AnalyticsError::InvalidInput(_))
      ));
      assert!(matches!(
        sortino_ratio(&prices, 0.0),
        Err(AnalyticsError::InvalidInput(_))
      ));
    }
  }
}
