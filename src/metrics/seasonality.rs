use std::collections::BTreeMap;

use chrono::Datelike;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::types::PriceDataPoint;
use crate::types::PriceSeries;

/// Move from the first to the last trading day of one calendar month in one year.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeasonalityObservation {
  pub year: i32,
  pub start_date: NaiveDate,
  pub end_date: NaiveDate,
  pub start_price: f64,
  pub end_price: f64,
  /// Percent change, e.g. 2.5 for +2.5%.
  pub return_pct: f64,
}

/// Aggregate of every occurrence of one calendar month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeasonality {
  /// 1 = January ... 12 = December.
  pub month: u32,
  /// Ordered by year.
  pub observations: Vec<SeasonalityObservation>,
  /// `None` when the month never occurs with at least two trading days.
  pub mean_return_pct: Option<f64>,
  pub count: usize,
}

impl MonthlySeasonality {
  fn empty(month: u32) -> Self {
    Self {
      month,
      observations: Vec::new(),
      mean_return_pct: None,
      count: 0,
    }
  }
}

/// Average first-to-last-trading-day change for each calendar month across all years.
///
/// A (year, month) bucket with a single trading day yields no observation.
pub fn monthly_seasonality(prices: &PriceSeries) -> [MonthlySeasonality; 12] {
  let mut buckets: BTreeMap<(i32, u32), (PriceDataPoint, PriceDataPoint)> = BTreeMap::new();
  for p in prices {
    buckets
      .entry((p.date.year(), p.date.month()))
      .and_modify(|(first, last)| {
        if p.date < first.date {
          *first = *p;
        }
        if p.date > last.date {
          *last = *p;
        }
      })
      .or_insert((*p, *p));
  }

  let mut months: [MonthlySeasonality; 12] =
    std::array::from_fn(|i| MonthlySeasonality::empty(i as u32 + 1));

  for ((year, month), (first, last)) in buckets {
    if first.date == last.date {
      continue;
    }
    months[month as usize - 1]
      .observations
      .push(SeasonalityObservation {
        year,
        start_date: first.date,
        end_date: last.date,
        start_price: first.close,
        end_price: last.close,
        return_pct: (last.close - first.close) / first.close * 100.0,
      });
  }

  for m in months.iter_mut() {
    m.count = m.observations.len();
    if m.count > 0 {
      let total: f64 = m.observations.iter().map(|o| o.return_pct).sum();
      m.mean_return_pct = Some(total / m.count as f64);
    }
  }

  months
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn series() -> PriceSeries {
    PriceSeries::new(vec![
      PriceDataPoint::new(date(2022, 1, 3), 100.0),
      PriceDataPoint::new(date(2022, 1, 14), 95.0),
      PriceDataPoint::new(date(2022, 1, 31), 110.0),
      PriceDataPoint::new(date(2022, 2, 1), 111.0),
      PriceDataPoint::new(date(2023, 1, 2), 200.0),
      PriceDataPoint::new(date(2023, 1, 31), 190.0),
    ])
    .unwrap()
  }

  #[test]
  fn january_averages_across_years() {
    let months = monthly_seasonality(&series());
    let jan = &months[0];
    assert_eq!(jan.month, 1);
    assert_eq!(jan.count, 2);
    assert_eq!(jan.observations[0].year, 2022);
    assert_abs_diff_eq!(jan.observations[0].return_pct, 10.0, epsilon = 1e-12);
    assert_abs_diff_eq!(jan.observations[1].return_pct, -5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(jan.mean_return_pct.unwrap(), 2.5, epsilon = 1e-12);
  }

  #[test]
  fn single_day_months_have_no_observation() {
    let months = monthly_seasonality(&series());
    assert_eq!(months[1].month, 2);
    assert_eq!(months[1].count, 0);
    assert_eq!(months[1].mean_return_pct, None);
  }

  #[test]
  fn every_month_is_reported() {
    let months = monthly_seasonality(&PriceSeries::default());
    assert_eq!(
      months.iter().map(|m| m.month).collect::<Vec<_>>(),
      (1..=12).collect::<Vec<_>>()
    );
  }
}
