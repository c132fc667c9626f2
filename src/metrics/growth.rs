use chrono::Months;
use serde::Deserialize;
use serde::Serialize;

use crate::types::PriceSeries;

const DAYS_PER_YEAR: f64 = 365.25;

/// Compound annual growth rates over the standard lookback windows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CagrWindows {
  pub one_year: Option<f64>,
  pub three_year: Option<f64>,
  pub five_year: Option<f64>,
  /// Over the whole series, using elapsed calendar days.
  pub since_inception: Option<f64>,
}

/// `end / start - 1` over the whole close series.
pub fn total_return(prices: &[f64]) -> Option<f64> {
  match (prices.first(), prices.last()) {
    (Some(&start), Some(&end)) if prices.len() >= 2 && start > 0.0 => Some(end / start - 1.0),
    _ => None,
  }
}

/// Compound annual growth rate over the trailing `years`.
///
/// The window ends at the last point and starts at the last point dated on or before
/// `end - years`. `None` when the series does not reach back that far.
pub fn cagr(prices: &PriceSeries, years: u32) -> Option<f64> {
  if years == 0 || prices.len() < 2 {
    return None;
  }

  let end = prices.last()?;
  let cutoff = end.date.checked_sub_months(Months::new(years.checked_mul(12)?))?;
  let points = prices.points();
  let idx = points.partition_point(|p| p.date <= cutoff);
  if idx == 0 {
    return None;
  }
  let start = &points[idx - 1];

  Some((end.close / start.close).powf(1.0 / years as f64) - 1.0)
}

fn cagr_since_inception(prices: &PriceSeries) -> Option<f64> {
  let (start, end) = (prices.first()?, prices.last()?);
  let days = (end.date - start.date).num_days();
  if days <= 0 {
    return None;
  }
  let years = days as f64 / DAYS_PER_YEAR;
  Some((end.close / start.close).powf(1.0 / years) - 1.0)
}

/// 1Y/3Y/5Y and since-inception growth rates in one pass.
pub fn cagr_windows(prices: &PriceSeries) -> CagrWindows {
  CagrWindows {
    one_year: cagr(prices, 1),
    three_year: cagr(prices, 3),
    five_year: cagr(prices, 5),
    since_inception: cagr_since_inception(prices),
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use chrono::NaiveDate;

  use super::*;
  use crate::types::PriceDataPoint;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn yearly(closes: &[(i32, f64)]) -> PriceSeries {
    PriceSeries::new(
      closes
        .iter()
        .map(|&(y, c)| PriceDataPoint::new(date(y, 6, 30), c))
        .collect(),
    )
    .unwrap()
  }

  #[test]
  fn cagr_over_exact_window() {
    let series = yearly(&[(2019, 100.0), (2020, 110.0), (2021, 121.0), (2022, 133.1)]);
    assert_relative_eq!(cagr(&series, 3).unwrap(), 0.1, epsilon = 1e-12);
    assert_relative_eq!(cagr(&series, 1).unwrap(), 0.1, epsilon = 1e-12);
  }

  #[test]
  fn cagr_does_not_extrapolate_short_history() {
    let series = yearly(&[(2021, 100.0), (2022, 120.0)]);
    assert_eq!(cagr(&series, 3), None);
    assert_eq!(cagr(&series, 0), None);
  }

  #[test]
  fn cagr_with_huge_horizon_is_none() {
    let series = yearly(&[(2021, 100.0), (2022, 120.0)]);
    assert_eq!(cagr(&series, u32::MAX), None);
    assert_eq!(cagr(&series, u32::MAX / 12 + 1), None);
  }

  #[test]
  fn cagr_uses_last_point_before_cutoff() {
    let series = PriceSeries::new(vec![
      PriceDataPoint::new(date(2021, 6, 25), 80.0),
      PriceDataPoint::new(date(2021, 6, 28), 100.0),
      PriceDataPoint::new(date(2021, 7, 2), 90.0),
      PriceDataPoint::new(date(2022, 6, 30), 150.0),
    ])
    .unwrap();
    assert_relative_eq!(cagr(&series, 1).unwrap(), 0.5, epsilon = 1e-12);
  }

  #[test]
  fn total_return_of_close_series() {
    assert_relative_eq!(total_return(&[50.0, 60.0, 75.0]).unwrap(), 0.5);
    assert_eq!(total_return(&[50.0]), None);
  }

  #[test]
  fn windows_bundle_reports_missing_horizons() {
    let series = yearly(&[(2020, 100.0), (2021, 110.0), (2022, 121.0)]);
    let w = cagr_windows(&series);
    assert!(w.one_year.is_some());
    assert_eq!(w.three_year, None);
    assert_eq!(w.five_year, None);
    assert_relative_eq!(w.since_inception.unwrap(), 0.1, epsilon = 1e-3);
  }
}
