//! # Errors
//!
//! Error kinds raised by the analytics engine.

use thiserror::Error;

/// Main error type for the analytics engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
  #[error("insufficient data: required at least {required} observations, got {actual}")]
  InsufficientData { required: usize, actual: usize },

  #[error("insufficient overlap: {common} common dates, at least {required} required")]
  InsufficientOverlap { common: usize, required: usize },

  #[error("optimization error: {0}")]
  Optimization(String),

  #[error("invalid weights: {0}")]
  InvalidWeights(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),
}

impl AnalyticsError {
  pub(crate) fn insufficient(required: usize, actual: usize) -> Self {
    Self::InsufficientData { required, actual }
  }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
