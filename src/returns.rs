//! # Return Series
//!
//! $$
//! r_i = \frac{P_{i+1}-P_i}{P_i}
//! $$
//!
//! Price-to-return conversion and date alignment across assets.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::types::AssetKey;
use crate::types::PriceSeries;

/// Minimum number of common dates for a multi-asset alignment.
pub const MIN_OVERLAP: usize = 30;

fn check_prices(prices: &[f64]) -> Result<()> {
  if prices.len() < 2 {
    return Err(AnalyticsError::insufficient(2, prices.len()));
  }
  check_positive_prices(prices)
}

/// Every close must be positive and finite.
pub(crate) fn check_positive_prices(prices: &[f64]) -> Result<()> {
  if let Some(bad) = prices.iter().find(|p| !p.is_finite() || **p <= 0.0) {
    return Err(AnalyticsError::InvalidInput(format!(
      "prices must be positive and finite, got {bad}"
    )));
  }
  Ok(())
}

/// Simple arithmetic return per adjacent pair of prices.
pub fn daily_returns(prices: &[f64]) -> Result<Vec<f64>> {
  check_prices(prices)?;
  Ok(prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect())
}

/// Continuously compounded return per adjacent pair of prices.
pub fn log_returns(prices: &[f64]) -> Result<Vec<f64>> {
  check_prices(prices)?;
  Ok(prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Keep only the dates present in every series. Requires [`MIN_OVERLAP`] common dates.
pub fn align_series(
  series: &BTreeMap<AssetKey, PriceSeries>,
) -> Result<BTreeMap<AssetKey, PriceSeries>> {
  align_series_min(series, MIN_OVERLAP)
}

/// [`align_series`] with an explicit minimum overlap.
pub fn align_series_min(
  series: &BTreeMap<AssetKey, PriceSeries>,
  min_overlap: usize,
) -> Result<BTreeMap<AssetKey, PriceSeries>> {
  let mut iter = series.values();
  let Some(first) = iter.next() else {
    return Err(AnalyticsError::InvalidInput(
      "no series supplied for alignment".to_string(),
    ));
  };

  let mut common: BTreeSet<NaiveDate> = first.iter().map(|p| p.date).collect();
  for s in iter {
    let dates: BTreeSet<NaiveDate> = s.iter().map(|p| p.date).collect();
    common.retain(|d| dates.contains(d));
  }

  debug!(
    assets = series.len(),
    common = common.len(),
    "aligned price series"
  );

  if common.len() < min_overlap {
    return Err(AnalyticsError::InsufficientOverlap {
      common: common.len(),
      required: min_overlap,
    });
  }

  Ok(
    series
      .iter()
      .map(|(key, s)| {
        let points = s
          .iter()
          .filter(|p| common.contains(&p.date))
          .copied()
          .collect();
        (key.clone(), PriceSeries::from_unchecked(points))
      })
      .collect(),
  )
}

/// Daily returns of already aligned series, one row per asset in key order.
pub fn returns_matrix(
  aligned: &BTreeMap<AssetKey, PriceSeries>,
) -> Result<(Vec<AssetKey>, Vec<Vec<f64>>)> {
  let mut assets = Vec::with_capacity(aligned.len());
  let mut rows = Vec::with_capacity(aligned.len());
  let mut expected_len = None;

  for (key, series) in aligned {
    let row = daily_returns(&series.closes())?;
    match expected_len {
      None => expected_len = Some(row.len()),
      Some(len) if len != row.len() => {
        return Err(AnalyticsError::InvalidInput(format!(
          "series for {key} has {} returns, expected {len}; align before building the matrix",
          row.len()
        )));
      }
      Some(_) => {}
    }
    assets.push(key.clone());
    rows.push(row);
  }

  Ok((assets, rows))
}

/// Truncate return series to their common tail length.
pub fn align_return_series(all_returns: &[Vec<f64>]) -> Vec<Vec<f64>> {
  let min_len = all_returns.iter().map(|r| r.len()).min().unwrap_or(0);
  all_returns
    .iter()
    .map(|r| r[r.len() - min_len..].to_vec())
    .collect()
}
