//! # Portfolio Optimizers
//!
//! $$
//! \mathbf{w}^\* \in \Delta = \{\mathbf{w} : \mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1\}
//! $$
//!
//! Long-only, fully invested allocation under four objectives.

mod active_set;
pub mod mean_variance;
mod simplex;
pub mod sortino;
pub mod types;

pub(crate) use mean_variance::minimum_variance_for_target;
pub(crate) use mean_variance::prepare_covariance;
pub use mean_variance::clean_weights;
pub use mean_variance::maximum_return;
pub use mean_variance::maximum_sharpe;
pub use mean_variance::minimum_variance;
pub use mean_variance::unconstrained_minimum_variance;
pub use mean_variance::MIN_ASSETS;
pub use sortino::maximum_sortino;
pub use types::Objective;

use crate::error::AnalyticsError;
use crate::error::Result;

/// Solve `objective` on annualized inputs.
///
/// `returns_matrix` is only read by [`Objective::MaximumSortino`], which fails without it.
pub fn optimize_with_objective(
  objective: Objective,
  expected_returns: &[f64],
  cov: &[Vec<f64>],
  returns_matrix: Option<&[Vec<f64>]>,
  risk_free: f64,
) -> Result<Vec<f64>> {
  match objective {
    Objective::MinimumVariance => minimum_variance(cov),
    Objective::MaximumSharpe => maximum_sharpe(expected_returns, cov, risk_free),
    Objective::MaximumSortino => {
      let rows = returns_matrix.ok_or_else(|| {
        AnalyticsError::InvalidInput("maximum Sortino needs the daily returns matrix".to_string())
      })?;
      maximum_sortino(expected_returns, rows, risk_free)
    }
    Objective::MaximumReturn => maximum_return(expected_returns),
  }
}
