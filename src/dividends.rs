//! # Dividend Adjustment
//!
//! $$
//! \tilde P_t = P_t \prod_{k:\,t < t_k}\left(1-\frac{D_k}{P_{t_k}}\right)
//! $$
//!
//! Total-return price series and percentage rebasing.

use tracing::debug;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::types::DividendRecord;
use crate::types::PriceDataPoint;
use crate::types::PriceSeries;

/// Scale every close before each ex-dividend date by `1 - dividend / reference_close`.
///
/// The reference close is the close on the dividend date, or the last close before it
/// when the date is not a trading day. Events are applied earliest first and compound
/// backward. Events with no earlier close, or dated after the last close, are ignored.
pub fn dividend_adjusted_prices(
  prices: &PriceSeries,
  dividends: &[DividendRecord],
) -> Result<PriceSeries> {
  if dividends.is_empty() {
    return Ok(prices.clone());
  }

  if let Some(bad) = dividends
    .iter()
    .find(|d| !d.amount.is_finite() || d.amount < 0.0)
  {
    return Err(AnalyticsError::InvalidInput(format!(
      "dividend on {} must be non-negative, got {}",
      bad.date, bad.amount
    )));
  }

  let mut events = dividends.to_vec();
  events.sort_by_key(|d| d.date);

  let points = prices.points();
  let Some(last) = points.last() else {
    return Ok(prices.clone());
  };

  let mut factors = vec![1.0; points.len()];
  let mut applied = 0usize;
  for event in events.iter().filter(|d| d.amount > 0.0 && d.date <= last.date) {
    let prior = points.partition_point(|p| p.date < event.date);
    if prior == 0 {
      continue;
    }

    let reference = if points[prior].date == event.date {
      points[prior].close
    } else {
      points[prior - 1].close
    };
    let factor = 1.0 - event.amount / reference;
    if factor <= 0.0 {
      return Err(AnalyticsError::InvalidInput(format!(
        "dividend of {} on {} is not smaller than the close {}",
        event.amount, event.date, reference
      )));
    }

    for f in &mut factors[..prior] {
      *f *= factor;
    }
    applied += 1;
  }

  debug!(
    events = dividends.len(),
    applied, "dividend adjustment applied"
  );

  Ok(PriceSeries::from_unchecked(
    points
      .iter()
      .zip(factors)
      .map(|(p, f)| PriceDataPoint::new(p.date, p.close * f))
      .collect(),
  ))
}

/// Rebase a series so its first close is exactly 100.
pub fn normalize_to_percentage(prices: &PriceSeries) -> Result<PriceSeries> {
  let first = prices
    .first()
    .ok_or_else(|| AnalyticsError::insufficient(1, 0))?
    .close;

  Ok(PriceSeries::from_unchecked(
    prices
      .iter()
      .enumerate()
      .map(|(idx, p)| {
        let value = if idx == 0 {
          100.0
        } else {
          p.close / first * 100.0
        };
        PriceDataPoint::new(p.date, value)
      })
      .collect(),
  ))
}

/// Dividend-adjusted series rebased to 100.
pub fn total_return_index(
  prices: &PriceSeries,
  dividends: &[DividendRecord],
) -> Result<PriceSeries> {
  normalize_to_percentage(&dividend_adjusted_prices(prices, dividends)?)
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;

  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
  }

  fn flat() -> PriceSeries {
    PriceSeries::from_daily_closes(day(1), &[100.0, 100.0, 100.0, 100.0]).unwrap()
  }

  #[test]
  fn no_dividends_returns_input_unchanged() {
    let prices = flat();
    assert_eq!(dividend_adjusted_prices(&prices, &[]).unwrap(), prices);
  }

  #[test]
  fn single_dividend_scales_prior_closes() {
    let adjusted =
      dividend_adjusted_prices(&flat(), &[DividendRecord::new(day(3), 2.0)]).unwrap();
    let closes = adjusted.closes();
    assert_abs_diff_eq!(closes[0], 98.0, epsilon = 1e-12);
    assert_abs_diff_eq!(closes[1], 98.0, epsilon = 1e-12);
    assert_abs_diff_eq!(closes[2], 100.0);
    assert_abs_diff_eq!(closes[3], 100.0);
    assert_eq!(adjusted.dates(), flat().dates());
  }

  #[test]
  fn dividends_compound_backward_in_date_order() {
    let adjusted = dividend_adjusted_prices(
      &flat(),
      &[
        DividendRecord::new(day(4), 5.0),
        DividendRecord::new(day(2), 10.0),
      ],
    )
    .unwrap();
    let closes = adjusted.closes();
    assert_abs_diff_eq!(closes[0], 100.0 * 0.9 * 0.95, epsilon = 1e-12);
    assert_abs_diff_eq!(closes[1], 95.0, epsilon = 1e-12);
    assert_abs_diff_eq!(closes[2], 95.0, epsilon = 1e-12);
    assert_abs_diff_eq!(closes[3], 100.0);
  }

  #[test]
  fn dividend_on_non_trading_day_uses_previous_close() {
    let prices = PriceSeries::new(vec![
      PriceDataPoint::new(day(1), 50.0),
      PriceDataPoint::new(day(4), 100.0),
    ])
    .unwrap();
    let adjusted = dividend_adjusted_prices(&prices, &[DividendRecord::new(day(2), 5.0)]).unwrap();
    assert_abs_diff_eq!(adjusted.closes()[0], 45.0, epsilon = 1e-12);
  }

  #[test]
  fn out_of_range_dividends_are_ignored() {
    let prices = flat();
    let adjusted = dividend_adjusted_prices(
      &prices,
      &[
        DividendRecord::new(day(1), 1.0),
        DividendRecord::new(day(20), 1.0),
      ],
    )
    .unwrap();
    assert_eq!(adjusted, prices);
  }

  #[test]
  fn oversized_or_negative_dividend_is_rejected() {
    assert!(dividend_adjusted_prices(&flat(), &[DividendRecord::new(day(2), 100.0)]).is_err());
    assert!(dividend_adjusted_prices(&flat(), &[DividendRecord::new(day(2), -1.0)]).is_err());
  }

  #[test]
  fn normalized_series_starts_at_one_hundred() {
    let prices = PriceSeries::from_daily_closes(day(1), &[37.3, 40.0, 18.65]).unwrap();
    let norm = normalize_to_percentage(&prices).unwrap();
    let closes = norm.closes();
    assert_eq!(closes[0], 100.0);
    assert_abs_diff_eq!(closes[2], 50.0, epsilon = 1e-12);
    assert!(normalize_to_percentage(&PriceSeries::default()).is_err());
  }

  #[test]
  fn total_return_index_reflects_reinvested_dividend() {
    let index = total_return_index(&flat(), &[DividendRecord::new(day(3), 2.0)]).unwrap();
    let closes = index.closes();
    assert_eq!(closes[0], 100.0);
    assert_abs_diff_eq!(closes[3], 100.0 / 0.98, epsilon = 1e-9);
  }
}
