//! # Portfolio Engine
//!
//! $$
//! \mathbf{w}^\* = \operatorname{Optimize}(\mu, \Sigma + \epsilon I, R)
//! $$
//!
//! High-level orchestration from keyed price series to weights, metrics and frontier.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::frontier::generate_frontier;
use crate::optimizers::Objective;
use crate::optimizers::optimize_with_objective;
use crate::portfolio::portfolio_metrics;
use crate::returns::MIN_OVERLAP;
use crate::returns::align_series_min;
use crate::returns::returns_matrix;
use crate::stats::DEFAULT_RIDGE;
use crate::stats::covariance_matrix_min;
use crate::stats::mean_return;
use crate::stats::regularize_cov;
use crate::types::AssetKey;
use crate::types::EfficientFrontier;
use crate::types::OptimizationResult;
use crate::types::PortfolioMetrics;
use crate::types::PortfolioWeights;
use crate::types::PriceSeries;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioEngineConfig {
  /// Objective used by [`PortfolioEngine::optimize`].
  pub objective: Objective,
  /// Annual risk-free rate as a decimal.
  pub risk_free: f64,
  /// Diagonal loading added to the sample covariance.
  pub ridge: f64,
  /// Target returns sampled by [`PortfolioEngine::frontier`].
  pub frontier_points: usize,
  /// Minimum number of common dates across the universe.
  pub min_overlap: usize,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      objective: Objective::MinimumVariance,
      risk_free: 0.0,
      ridge: DEFAULT_RIDGE,
      frontier_points: 50,
      min_overlap: MIN_OVERLAP,
    }
  }
}

/// Aligned, annualized inputs shared by every objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreparedUniverse {
  /// Asset order of every row and column below.
  pub assets: Vec<AssetKey>,
  /// One row of daily returns per asset.
  pub returns_matrix: Vec<Vec<f64>>,
  pub expected_returns: Vec<f64>,
  /// Regularized annualized covariance.
  pub cov: Vec<Vec<f64>>,
}

/// Single entry-point engine for allocation workflows.
#[derive(Clone, Debug, Default)]
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
}

impl PortfolioEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: PortfolioEngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  /// Align the series, derive daily returns, expected returns and a regularized
  /// covariance matrix.
  pub fn prepare(&self, series: &BTreeMap<AssetKey, PriceSeries>) -> Result<PreparedUniverse> {
    if !self.config.ridge.is_finite() || self.config.ridge < 0.0 {
      return Err(AnalyticsError::InvalidInput(format!(
        "ridge must be non-negative, got {}",
        self.config.ridge
      )));
    }

    let aligned = align_series_min(series, self.config.min_overlap)?;
    let (assets, rows) = returns_matrix(&aligned)?;
    let expected_returns = rows
      .iter()
      .map(|r| mean_return(r))
      .collect::<Result<Vec<_>>>()?;
    let cov = regularize_cov(
      &covariance_matrix_min(&rows, self.config.min_overlap.saturating_sub(1))?,
      self.config.ridge,
    );

    debug!(
      assets = assets.len(),
      observations = rows.first().map_or(0, Vec::len),
      "universe prepared"
    );

    Ok(PreparedUniverse {
      assets,
      returns_matrix: rows,
      expected_returns,
      cov,
    })
  }

  /// Optimize the configured objective and report the resulting metrics.
  pub fn optimize(&self, universe: &PreparedUniverse) -> Result<OptimizationResult> {
    self.optimize_with(self.config.objective, universe)
  }

  /// Optimize an explicit objective, ignoring the configured one.
  pub fn optimize_with(
    &self,
    objective: Objective,
    universe: &PreparedUniverse,
  ) -> Result<OptimizationResult> {
    let w = optimize_with_objective(
      objective,
      &universe.expected_returns,
      &universe.cov,
      Some(universe.returns_matrix.as_slice()),
      self.config.risk_free,
    )?;
    let weights = PortfolioWeights::new(universe.assets.clone(), w)?;
    let metrics = self.metrics(universe, &weights)?;
    debug!(%objective, ?metrics, "optimization finished");
    Ok(OptimizationResult { weights, metrics })
  }

  /// Prepare and optimize in one call.
  pub fn optimize_prices(
    &self,
    series: &BTreeMap<AssetKey, PriceSeries>,
  ) -> Result<OptimizationResult> {
    self.optimize(&self.prepare(series)?)
  }

  /// Metrics of an arbitrary allocation over the universe.
  pub fn metrics(
    &self,
    universe: &PreparedUniverse,
    weights: &PortfolioWeights,
  ) -> Result<PortfolioMetrics> {
    if weights.assets() != universe.assets.as_slice() {
      return Err(AnalyticsError::InvalidInput(
        "weights are not keyed in universe order".to_string(),
      ));
    }
    portfolio_metrics(
      weights.weights(),
      &universe.expected_returns,
      &universe.cov,
      Some(universe.returns_matrix.as_slice()),
      self.config.risk_free,
    )
  }

  /// Long-only efficient frontier of the universe.
  pub fn frontier(&self, universe: &PreparedUniverse) -> Result<EfficientFrontier> {
    let points = generate_frontier(
      &universe.expected_returns,
      &universe.cov,
      self.config.frontier_points,
    )?;
    Ok(EfficientFrontier {
      assets: universe.assets.clone(),
      points,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;

  use super::*;

  fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
  }

  fn wave(len: usize, amplitude: f64, drift: f64, phase: usize) -> Vec<f64> {
    (0..len)
      .map(|i| {
        let t = (i + phase) as f64;
        100.0 * (1.0 + drift * t + amplitude * (t * 0.7).sin())
      })
      .collect()
  }

  fn universe() -> BTreeMap<AssetKey, PriceSeries> {
    let mut series = BTreeMap::new();
    series.insert(
      "AAA".to_string(),
      PriceSeries::from_daily_closes(start(), &wave(60, 0.02, 0.001, 0)).unwrap(),
    );
    series.insert(
      "BBB".to_string(),
      PriceSeries::from_daily_closes(start(), &wave(60, 0.05, 0.003, 2)).unwrap(),
    );
    series.insert(
      "CCC".to_string(),
      PriceSeries::from_daily_closes(start(), &wave(60, 0.01, 0.0005, 5)).unwrap(),
    );
    series
  }

  #[test]
  fn prepare_builds_consistent_shapes() {
    let engine = PortfolioEngine::default();
    let u = engine.prepare(&universe()).unwrap();
    assert_eq!(u.assets, vec!["AAA", "BBB", "CCC"]);
    assert_eq!(u.returns_matrix.len(), 3);
    assert!(u.returns_matrix.iter().all(|r| r.len() == 59));
    assert_eq!(u.expected_returns.len(), 3);
    assert_eq!(u.cov.len(), 3);
  }

  #[test]
  fn every_objective_yields_valid_weights() {
    let engine = PortfolioEngine::default();
    let u = engine.prepare(&universe()).unwrap();
    for objective in [
      Objective::MinimumVariance,
      Objective::MaximumSharpe,
      Objective::MaximumSortino,
      Objective::MaximumReturn,
    ] {
      let result = engine.optimize_with(objective, &u).unwrap();
      let total: f64 = result.weights.weights().iter().sum();
      assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);
      assert!(result.metrics.volatility > 0.0);
    }
  }

  #[test]
  fn short_history_is_rejected() {
    let mut series = universe();
    series.insert(
      "DDD".to_string(),
      PriceSeries::from_daily_closes(start(), &wave(10, 0.01, 0.0, 0)).unwrap(),
    );
    let err = PortfolioEngine::default().prepare(&series).unwrap_err();
    assert!(matches!(err, AnalyticsError::InsufficientOverlap { .. }));
  }

  #[test]
  fn frontier_is_labelled_with_universe_assets() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      frontier_points: 12,
      ..Default::default()
    });
    let u = engine.prepare(&universe()).unwrap();
    let frontier = engine.frontier(&u).unwrap();
    assert_eq!(frontier.assets, u.assets);
    assert!(!frontier.points.is_empty());
    let w = frontier.weights_at(0).unwrap();
    assert_eq!(w.assets(), u.assets.as_slice());
  }

  #[test]
  fn negative_ridge_is_rejected() {
    let engine = PortfolioEngine::new(PortfolioEngineConfig {
      ridge: -1.0,
      ..Default::default()
    });
    assert!(engine.prepare(&universe()).is_err());
  }
}
