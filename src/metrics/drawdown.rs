use crate::error::Result;
use crate::returns::check_positive_prices;

/// Drawdown from the running peak at every step, as a fraction of that peak.
///
/// Fails with `InvalidInput` on a non-positive or non-finite close.
pub fn drawdown_series(prices: &[f64]) -> Result<Vec<f64>> {
  check_positive_prices(prices)?;
  let mut peak = f64::NEG_INFINITY;
  Ok(
    prices
      .iter()
      .map(|&p| {
        peak = peak.max(p);
        (peak - p) / peak
      })
      .collect(),
  )
}

/// Largest peak-to-trough decline, as a positive fraction (0.25 = 25%).
///
/// Single forward pass over the running peak; `Ok(None)` on empty input.
pub fn max_drawdown(prices: &[f64]) -> Result<Option<f64>> {
  if prices.is_empty() {
    return Ok(None);
  }
  Ok(Some(
    drawdown_series(prices)?.into_iter().fold(0.0, f64::max),
  ))
}
