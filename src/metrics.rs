//! # Risk Metrics
//!
//! $$
//! S = \frac{\bar r_{ann} - r_f}{\sigma_{ann}}, \qquad
//! \beta = \frac{\operatorname{Cov}(r_a, r_b)}{\operatorname{Var}(r_b)}
//! $$
//!
//! Single-asset risk/return statistics. A statistic that cannot be computed is
//! reported as `None`, never as a substituted default.

pub mod drawdown;
pub mod growth;
pub mod ratios;
pub mod seasonality;

pub use drawdown::drawdown_series;
pub use drawdown::max_drawdown;
pub use growth::cagr;
pub use growth::cagr_windows;
pub use growth::total_return;
pub use growth::CagrWindows;
pub use ratios::beta;
pub use ratios::downside_deviation;
pub use ratios::sharpe_ratio;
pub use ratios::sharpe_ratio_from_returns;
pub use ratios::sortino_ratio;
pub use ratios::sortino_ratio_from_returns;
pub use seasonality::monthly_seasonality;
pub use seasonality::MonthlySeasonality;
pub use seasonality::SeasonalityObservation;
