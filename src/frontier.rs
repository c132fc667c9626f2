//! # Efficient Frontier
//!
//! $$
//! \sigma(r^\*) = \min_{\mathbf{w}\in\Delta,\ \mathbf{w}^\top\mu = r^\*} \sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}
//! $$
//!
//! Sweep of target returns between the lowest and highest expected asset return,
//! reduced to its non-dominated boundary.

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use tracing::debug;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::optimizers::mean_variance::check_asset_count;
use crate::optimizers::mean_variance::check_returns;
use crate::optimizers::minimum_variance_for_target;
use crate::optimizers::prepare_covariance;
use crate::portfolio::dot;
use crate::portfolio::quad_form;
use crate::portfolio::validate_weights;
use crate::types::EfficientFrontierPoint;

/// Points whose volatilities differ by less than this are treated as one.
pub const FRONTIER_VOL_TOLERANCE: f64 = 1e-3;

const FLAT_RETURNS: f64 = 1e-12;

fn point(
  weights: Vec<f64>,
  expected_returns: &[f64],
  cov: &[Vec<f64>],
) -> Result<EfficientFrontierPoint> {
  validate_weights(&weights)?;
  Ok(EfficientFrontierPoint {
    expected_return: dot(&weights, expected_returns),
    volatility: quad_form(cov, &weights).max(0.0).sqrt(),
    weights,
  })
}

/// Long-only efficient frontier sampled at `point_count` evenly spaced target returns.
///
/// Each target is solved independently in parallel. The result is Pareto filtered and
/// ordered by ascending volatility.
pub fn generate_frontier(
  expected_returns: &[f64],
  cov: &[Vec<f64>],
  point_count: usize,
) -> Result<Vec<EfficientFrontierPoint>> {
  check_asset_count(expected_returns.len())?;
  if point_count < 2 {
    return Err(AnalyticsError::InvalidInput(format!(
      "a frontier needs at least 2 points, got {point_count}"
    )));
  }
  let cov = prepare_covariance(cov)?;
  check_returns(expected_returns, cov.len())?;

  let lo = expected_returns.iter().cloned().fold(f64::INFINITY, f64::min);
  let hi = expected_returns
    .iter()
    .cloned()
    .fold(f64::NEG_INFINITY, f64::max);

  if hi - lo < FLAT_RETURNS {
    debug!("expected returns are flat, frontier collapses to one point");
    let w = minimum_variance_for_target(expected_returns, &cov, lo)?;
    return Ok(vec![point(w, expected_returns, &cov)?]);
  }

  let step = (hi - lo) / (point_count - 1) as f64;
  let raw = (0..point_count)
    .into_par_iter()
    .map(|k| {
      let target = if k == point_count - 1 { hi } else { lo + step * k as f64 };
      minimum_variance_for_target(expected_returns, &cov, target)
        .and_then(|w| point(w, expected_returns, &cov))
    })
    .collect::<Result<Vec<_>>>()?;

  let filtered = pareto_filter(raw, FRONTIER_VOL_TOLERANCE);
  debug!(
    requested = point_count,
    kept = filtered.len(),
    "efficient frontier generated"
  );
  Ok(filtered)
}

fn dominates(q: &EfficientFrontierPoint, p: &EfficientFrontierPoint) -> bool {
  (q.volatility <= p.volatility && q.expected_return > p.expected_return)
    || (q.expected_return >= p.expected_return && q.volatility < p.volatility)
}

/// Keep the best return per volatility bucket, then drop dominated points.
///
/// Buckets are formed greedily in ascending volatility: a point joins the current
/// bucket when it lies within `vol_tolerance` of the bucket's first point.
pub fn pareto_filter(
  mut points: Vec<EfficientFrontierPoint>,
  vol_tolerance: f64,
) -> Vec<EfficientFrontierPoint> {
  points.retain(|p| p.volatility.is_finite() && p.expected_return.is_finite());
  points.sort_by_key(|p| (OrderedFloat(p.volatility), OrderedFloat(-p.expected_return)));

  let mut grouped: Vec<EfficientFrontierPoint> = Vec::with_capacity(points.len());
  let mut anchor = f64::NEG_INFINITY;
  for p in points {
    match grouped.last_mut() {
      Some(best) if p.volatility - anchor < vol_tolerance => {
        if p.expected_return > best.expected_return {
          *best = p;
        }
      }
      _ => {
        anchor = p.volatility;
        grouped.push(p);
      }
    }
  }

  let keep: Vec<bool> = grouped
    .iter()
    .map(|p| !grouped.iter().any(|q| dominates(q, p)))
    .collect();

  let mut frontier: Vec<EfficientFrontierPoint> = grouped
    .into_iter()
    .zip(keep)
    .filter_map(|(p, k)| k.then_some(p))
    .collect();
  frontier.sort_by_key(|p| OrderedFloat(p.volatility));
  frontier
}
