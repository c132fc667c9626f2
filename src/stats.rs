//! # Statistics
//!
//! $$
//! \hat\Sigma_{ij} = \frac{252}{n-1}\sum_{t=1}^{n}(r_{i,t}-\bar r_i)(r_{j,t}-\bar r_j)
//! $$
//!
//! Annualized mean, sample covariance (Bessel-corrected) and ridge regularization.

use nalgebra::DMatrix;
use statrs::statistics::Statistics;

use crate::error::AnalyticsError;
use crate::error::Result;
use crate::returns::MIN_OVERLAP;
use crate::types::TRADING_DAYS;

/// Default ridge added to the covariance diagonal, in annualized variance units.
pub const DEFAULT_RIDGE: f64 = 1e-4;

/// Arithmetic mean of a daily return series, annualized by 252.
pub fn mean_return(returns: &[f64]) -> Result<f64> {
  if returns.is_empty() {
    return Err(AnalyticsError::insufficient(1, 0));
  }
  Ok(returns.iter().mean() * TRADING_DAYS)
}

/// Sample standard deviation of daily returns, annualized by sqrt(252).
pub fn annualized_volatility(returns: &[f64]) -> Result<f64> {
  if returns.len() < 2 {
    return Err(AnalyticsError::insufficient(2, returns.len()));
  }
  Ok(returns.iter().std_dev() * TRADING_DAYS.sqrt())
}

pub(crate) fn check_rectangular(returns_matrix: &[Vec<f64>]) -> Result<usize> {
  let n_obs = returns_matrix.first().map(|r| r.len()).unwrap_or(0);
  if let Some((idx, row)) = returns_matrix
    .iter()
    .enumerate()
    .find(|(_, row)| row.len() != n_obs)
  {
    return Err(AnalyticsError::InvalidInput(format!(
      "returns matrix row {idx} has {} observations, expected {n_obs}",
      row.len()
    )));
  }
  Ok(n_obs)
}

/// Annualized sample covariance of a rectangular returns matrix (one row per asset).
///
/// Requires the daily returns of at least [`MIN_OVERLAP`] aligned closes.
pub fn covariance_matrix(returns_matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
  covariance_matrix_min(returns_matrix, MIN_OVERLAP - 1)
}

/// [`covariance_matrix`] with an explicit minimum number of return observations
/// (never below two).
pub fn covariance_matrix_min(
  returns_matrix: &[Vec<f64>],
  min_observations: usize,
) -> Result<Vec<Vec<f64>>> {
  let n_obs = check_rectangular(returns_matrix)?;
  if returns_matrix.is_empty() {
    return Ok(Vec::new());
  }
  let required = min_observations.max(2);
  if n_obs < required {
    return Err(AnalyticsError::insufficient(required, n_obs));
  }

  let n = returns_matrix.len();
  let mut cov = vec![vec![0.0; n]; n];
  for i in 0..n {
    for j in i..n {
      let c = returns_matrix[i]
        .iter()
        .covariance(returns_matrix[j].iter())
        * TRADING_DAYS;
      cov[i][j] = c;
      cov[j][i] = c;
    }
  }

  Ok(cov)
}

/// Add `epsilon` to every diagonal entry.
pub fn regularize_cov(cov: &[Vec<f64>], epsilon: f64) -> Vec<Vec<f64>> {
  cov
    .iter()
    .enumerate()
    .map(|(i, row)| {
      let mut row = row.clone();
      if let Some(d) = row.get_mut(i) {
        *d += epsilon;
      }
      row
    })
    .collect()
}

/// Pearson correlation implied by a covariance matrix.
pub fn correlation_matrix(cov: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
  check_square(cov)?;
  let n = cov.len();
  let sd: Vec<f64> = (0..n).map(|i| cov[i][i].max(0.0).sqrt()).collect();

  let mut corr = vec![vec![0.0; n]; n];
  for i in 0..n {
    for j in 0..n {
      let denom = sd[i] * sd[j];
      corr[i][j] = if i == j {
        1.0
      } else if denom > 1e-15 {
        (cov[i][j] / denom).clamp(-1.0, 1.0)
      } else {
        0.0
      };
    }
  }

  Ok(corr)
}

pub(crate) fn check_square(cov: &[Vec<f64>]) -> Result<()> {
  let n = cov.len();
  if let Some(row) = cov.iter().find(|row| row.len() != n) {
    return Err(AnalyticsError::InvalidInput(format!(
      "covariance matrix must be square: {n} rows but a row of length {}",
      row.len()
    )));
  }
  if cov.iter().flatten().any(|v| !v.is_finite()) {
    return Err(AnalyticsError::InvalidInput(
      "covariance matrix contains non-finite entries".to_string(),
    ));
  }
  Ok(())
}

pub(crate) fn to_dmatrix(cov: &[Vec<f64>]) -> DMatrix<f64> {
  let n = cov.len();
  DMatrix::from_fn(n, n, |i, j| cov[i][j])
}

/// Whether a square matrix admits a Cholesky factorization with pivots that are
/// not negligible relative to its largest diagonal entry.
pub fn is_positive_definite(cov: &[Vec<f64>]) -> bool {
  if check_square(cov).is_err() || cov.is_empty() {
    return false;
  }

  let Some(chol) = to_dmatrix(cov).cholesky() else {
    return false;
  };
  let scale = (0..cov.len()).map(|i| cov[i][i]).fold(0.0, f64::max);
  let l = chol.l();
  (0..cov.len()).all(|j| l[(j, j)] * l[(j, j)] > PIVOT_TOLERANCE * scale)
}

const PIVOT_TOLERANCE: f64 = 1e-12;

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn mean_return_is_annualized() {
    let m = mean_return(&[0.01, -0.005, 0.002, 0.001]).unwrap();
    assert_relative_eq!(m, 0.002 * 252.0, epsilon = 1e-12);
    assert!(mean_return(&[]).is_err());
  }

  #[test]
  fn covariance_uses_bessel_correction() {
    let x = vec![0.01, 0.02, 0.03];
    let cov = covariance_matrix_min(&[x.clone()], 2).unwrap();
    // Sample variance of [0.01, 0.02, 0.03] is 1e-4.
    assert_relative_eq!(cov[0][0], 1e-4 * 252.0, epsilon = 1e-12);
  }

  #[test]
  fn covariance_is_symmetric() {
    let m = vec![
      vec![0.01, -0.02, 0.015, 0.003, -0.007],
      vec![0.002, 0.011, -0.004, 0.009, 0.001],
      vec![-0.013, 0.006, 0.008, -0.002, 0.012],
    ];
    let cov = covariance_matrix_min(&m, 2).unwrap();
    for i in 0..3 {
      for j in 0..3 {
        assert_eq!(cov[i][j], cov[j][i]);
      }
    }
  }

  #[test]
  fn covariance_rejects_ragged_and_short_input() {
    assert!(matches!(
      covariance_matrix(&[vec![0.1, 0.2], vec![0.1]]),
      Err(AnalyticsError::InvalidInput(_))
    ));
    assert!(matches!(
      covariance_matrix_min(&[vec![0.1], vec![0.2]], 0),
      Err(AnalyticsError::InsufficientData { .. })
    ));
  }

  #[test]
  fn covariance_needs_a_month_of_aligned_closes() {
    let row = |n: usize| (0..n).map(|t| 0.001 * (t % 7) as f64 - 0.003).collect::<Vec<f64>>();
    assert!(matches!(
      covariance_matrix(&[row(28), row(28)]),
      Err(AnalyticsError::InsufficientData { .. })
    ));
    assert_eq!(covariance_matrix(&[row(29), row(29)]).unwrap().len(), 2);
  }

  #[test]
  fn ridge_only_touches_the_diagonal() {
    let cov = vec![vec![0.04, 0.01], vec![0.01, 0.09]];
    let reg = regularize_cov(&cov, 1e-3);
    assert_abs_diff_eq!(reg[0][0], 0.041, epsilon = 1e-15);
    assert_abs_diff_eq!(reg[1][1], 0.091, epsilon = 1e-15);
    assert_eq!(reg[0][1], cov[0][1]);
    assert_eq!(reg[1][0], cov[1][0]);
  }

  #[test]
  fn ridge_restores_positive_definiteness() {
    let singular = vec![vec![0.04, 0.04], vec![0.04, 0.04]];
    assert!(!is_positive_definite(&singular));
    assert!(is_positive_definite(&regularize_cov(&singular, DEFAULT_RIDGE)));
  }

  #[test]
  fn correlation_from_covariance() {
    let cov = vec![vec![0.04, 0.006], vec![0.006, 0.09]];
    let corr = correlation_matrix(&cov).unwrap();
    assert_abs_diff_eq!(corr[0][1], 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(corr[1][1], 1.0);
  }
}
