//! # Types
//!
//! $$
//! r_i = \frac{P_{i+1}-P_i}{P_i}
//! $$
//!
//! Value objects shared by every stage of the engine. All of them are created
//! fresh per computation and never mutated after construction.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::portfolio::validate_weights;

/// Trading days per year used wherever a statistic is annualized.
pub const TRADING_DAYS: f64 = 252.0;

/// Tolerance for the sum-to-one weight invariant.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Opaque asset identifier (ticker symbol).
pub type AssetKey = String;

/// Single daily close.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceDataPoint {
  pub date: NaiveDate,
  pub close: f64,
}

impl PriceDataPoint {
  pub fn new(date: NaiveDate, close: f64) -> Self {
    Self { date, close }
  }
}

/// Chronologically ordered close series with strictly increasing dates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceDataPoint>", into = "Vec<PriceDataPoint>")]
pub struct PriceSeries {
  points: Vec<PriceDataPoint>,
}

impl PriceSeries {
  /// Build a series, rejecting unsorted or duplicate dates and non-positive closes.
  pub fn new(points: Vec<PriceDataPoint>) -> Result<Self> {
    for (idx, p) in points.iter().enumerate() {
      if !p.close.is_finite() || p.close <= 0.0 {
        return Err(AnalyticsError::InvalidInput(format!(
          "close on {} must be positive and finite, got {}",
          p.date, p.close
        )));
      }
      if idx > 0 && points[idx - 1].date >= p.date {
        return Err(AnalyticsError::InvalidInput(format!(
          "dates must be strictly increasing: {} follows {}",
          p.date,
          points[idx - 1].date
        )));
      }
    }

    Ok(Self { points })
  }

  /// Series of closes on consecutive calendar days starting at `start`.
  pub fn from_daily_closes(start: NaiveDate, closes: &[f64]) -> Result<Self> {
    let points = closes
      .iter()
      .zip(start.iter_days())
      .map(|(&close, date)| PriceDataPoint::new(date, close))
      .collect();
    Self::new(points)
  }

  /// Callers guarantee the series invariants already hold.
  pub(crate) fn from_unchecked(points: Vec<PriceDataPoint>) -> Self {
    Self { points }
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  pub fn points(&self) -> &[PriceDataPoint] {
    &self.points
  }

  pub fn iter(&self) -> std::slice::Iter<'_, PriceDataPoint> {
    self.points.iter()
  }

  pub fn first(&self) -> Option<&PriceDataPoint> {
    self.points.first()
  }

  pub fn last(&self) -> Option<&PriceDataPoint> {
    self.points.last()
  }

  pub fn closes(&self) -> Vec<f64> {
    self.points.iter().map(|p| p.close).collect()
  }

  pub fn dates(&self) -> Vec<NaiveDate> {
    self.points.iter().map(|p| p.date).collect()
  }
}

impl TryFrom<Vec<PriceDataPoint>> for PriceSeries {
  type Error = AnalyticsError;

  fn try_from(points: Vec<PriceDataPoint>) -> Result<Self> {
    Self::new(points)
  }
}

impl From<PriceSeries> for Vec<PriceDataPoint> {
  fn from(series: PriceSeries) -> Self {
    series.points
  }
}

impl<'a> IntoIterator for &'a PriceSeries {
  type Item = &'a PriceDataPoint;
  type IntoIter = std::slice::Iter<'a, PriceDataPoint>;

  fn into_iter(self) -> Self::IntoIter {
    self.points.iter()
  }
}

/// Discrete cash dividend, in currency units per share.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
  pub date: NaiveDate,
  pub amount: f64,
}

impl DividendRecord {
  pub fn new(date: NaiveDate, amount: f64) -> Self {
    Self { date, amount }
  }
}

/// Long-only, fully invested allocation keyed by asset.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PortfolioWeights {
  assets: Vec<AssetKey>,
  weights: Vec<f64>,
}

impl PortfolioWeights {
  /// Pair asset keys with weights, checking non-negativity and the sum-to-one invariant.
  pub fn new(assets: Vec<AssetKey>, weights: Vec<f64>) -> Result<Self> {
    if assets.len() != weights.len() {
      return Err(AnalyticsError::InvalidWeights(format!(
        "{} assets but {} weights",
        assets.len(),
        weights.len()
      )));
    }
    validate_weights(&weights)?;

    Ok(Self { assets, weights })
  }

  pub fn len(&self) -> usize {
    self.weights.len()
  }

  pub fn is_empty(&self) -> bool {
    self.weights.is_empty()
  }

  pub fn assets(&self) -> &[AssetKey] {
    &self.assets
  }

  pub fn weights(&self) -> &[f64] {
    &self.weights
  }

  /// Weight for `asset`, if it is part of the allocation.
  pub fn get(&self, asset: &str) -> Option<f64> {
    self
      .assets
      .iter()
      .position(|a| a == asset)
      .map(|idx| self.weights[idx])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
    self
      .assets
      .iter()
      .map(String::as_str)
      .zip(self.weights.iter().copied())
  }

  pub fn to_map(&self) -> BTreeMap<AssetKey, f64> {
    self
      .assets
      .iter()
      .cloned()
      .zip(self.weights.iter().copied())
      .collect()
  }
}

/// Annualized statistics of a candidate portfolio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
  /// `w' mu`.
  pub expected_return: f64,
  /// `sqrt(w' Sigma w)`, never negative.
  pub volatility: f64,
  /// `None` when volatility is zero.
  pub sharpe_ratio: Option<f64>,
  /// `None` when no return series was supplied or the portfolio has no downside days.
  pub sortino_ratio: Option<f64>,
}

/// Weights together with their metrics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationResult {
  pub weights: PortfolioWeights,
  pub metrics: PortfolioMetrics,
}

/// One point of an efficient frontier. Weights follow the asset order of the inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EfficientFrontierPoint {
  pub expected_return: f64,
  pub volatility: f64,
  pub weights: Vec<f64>,
}

/// Frontier points labelled with the assets their weights refer to.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EfficientFrontier {
  pub assets: Vec<AssetKey>,
  /// Sorted ascending by volatility, Pareto filtered.
  pub points: Vec<EfficientFrontierPoint>,
}

impl EfficientFrontier {
  /// Keyed weights of the point at `idx`.
  pub fn weights_at(&self, idx: usize) -> Result<PortfolioWeights> {
    let point = self.points.get(idx).ok_or_else(|| {
      AnalyticsError::InvalidInput(format!(
        "frontier has {} points, index {idx} requested",
        self.points.len()
      ))
    })?;
    PortfolioWeights::new(self.assets.clone(), point.weights.clone())
  }
}

/// Market whose risk-free rate applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
  #[default]
  Us,
  Pk,
}

/// Caller-owned risk-free rates, in percent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskFreeRates {
  pub us: f64,
  pub pk: f64,
}

impl RiskFreeRates {
  pub fn new(us: f64, pk: f64) -> Self {
    Self { us, pk }
  }

  /// Rate for `market` as a decimal (4.5 -> 0.045).
  pub fn decimal(&self, market: Market) -> f64 {
    match market {
      Market::Us => self.us / 100.0,
      Market::Pk => self.pk / 100.0,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
  }

  #[test]
  fn price_series_rejects_unsorted_dates() {
    let err = PriceSeries::new(vec![
      PriceDataPoint::new(day(2), 10.0),
      PriceDataPoint::new(day(1), 11.0),
    ])
    .unwrap_err();
    assert!(matches!(err, AnalyticsError::InvalidInput(_)));
  }

  #[test]
  fn price_series_rejects_duplicate_dates_and_bad_closes() {
    assert!(PriceSeries::new(vec![
      PriceDataPoint::new(day(1), 10.0),
      PriceDataPoint::new(day(1), 11.0),
    ])
    .is_err());
    assert!(PriceSeries::new(vec![PriceDataPoint::new(day(1), 0.0)]).is_err());
    assert!(PriceSeries::new(vec![PriceDataPoint::new(day(1), f64::NAN)]).is_err());
  }

  #[test]
  fn daily_closes_use_consecutive_days() {
    let series = PriceSeries::from_daily_closes(day(30), &[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(
      series.dates(),
      vec![day(30), day(31), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()]
    );
  }

  #[test]
  fn portfolio_weights_validate_invariants() {
    let assets = vec!["AAA".to_string(), "BBB".to_string()];
    assert!(PortfolioWeights::new(assets.clone(), vec![0.4, 0.6]).is_ok());
    assert!(matches!(
      PortfolioWeights::new(assets.clone(), vec![0.5, 0.6]),
      Err(AnalyticsError::InvalidWeights(_))
    ));
    assert!(matches!(
      PortfolioWeights::new(assets.clone(), vec![1.2, -0.2]),
      Err(AnalyticsError::InvalidWeights(_))
    ));
    assert!(PortfolioWeights::new(assets, vec![1.0]).is_err());
  }

  #[test]
  fn portfolio_weights_lookup_by_key() {
    let w = PortfolioWeights::new(vec!["AAA".into(), "BBB".into()], vec![0.25, 0.75]).unwrap();
    assert_eq!(w.get("BBB"), Some(0.75));
    assert_eq!(w.get("CCC"), None);
    assert_eq!(w.to_map().len(), 2);
  }

  #[test]
  fn risk_free_rates_convert_percent_to_decimal() {
    let rates = RiskFreeRates::new(4.5, 12.0);
    assert!((rates.decimal(Market::Us) - 0.045).abs() < 1e-12);
    assert!((rates.decimal(Market::Pk) - 0.12).abs() < 1e-12);
  }
}
