//! # Optimizer Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta} \frac{\mathbf{w}^\top\mu-r_f}{\sigma_p}
//! $$
//!
//! Objectives supported by the long-only optimizers.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::error::AnalyticsError;

/// Portfolio objective. Every variant is long-only and fully invested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
  /// Minimize `w' Sigma w`.
  #[default]
  MinimumVariance,
  /// Tangency portfolio.
  MaximumSharpe,
  /// Excess return over downside deviation of the portfolio's daily returns.
  MaximumSortino,
  /// All weight on the highest expected return.
  MaximumReturn,
}

impl FromStr for Objective {
  type Err = AnalyticsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "min-variance" | "minimum-variance" | "minvar" => Ok(Self::MinimumVariance),
      "max-sharpe" | "maximum-sharpe" | "sharpe" | "tangency" => Ok(Self::MaximumSharpe),
      "max-sortino" | "maximum-sortino" | "sortino" => Ok(Self::MaximumSortino),
      "max-return" | "maximum-return" => Ok(Self::MaximumReturn),
      other => Err(AnalyticsError::InvalidInput(format!(
        "unknown objective '{other}'"
      ))),
    }
  }
}

impl fmt::Display for Objective {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Objective::MinimumVariance => write!(f, "Minimum variance"),
      Objective::MaximumSharpe => write!(f, "Maximum Sharpe"),
      Objective::MaximumSortino => write!(f, "Maximum Sortino"),
      Objective::MaximumReturn => write!(f, "Maximum return"),
    }
  }
}
