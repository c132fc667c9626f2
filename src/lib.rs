//! # folio-analytics
//!
//! $$
//! P_t \;\longrightarrow\; r_t \;\longrightarrow\; (\mu, \Sigma) \;\longrightarrow\; \mathbf{w}^\*
//! $$
//!
//! Portfolio analytics and long-only optimization over daily close series.
//!
//! Every routine is a pure function over value types: returns and alignment in
//! [`returns`], annualized moments in [`stats`], single-asset risk measures in
//! [`metrics`], total-return adjustment in [`dividends`], allocation in
//! [`optimizers`] and [`frontier`], and portfolio-level metrics in [`portfolio`].
//! [`engine::PortfolioEngine`] strings them together for keyed price series.
//!
//! Annualization assumes [`types::TRADING_DAYS`] trading days per year throughout.

pub mod dividends;
pub mod engine;
pub mod error;
pub mod frontier;
pub mod metrics;
pub mod optimizers;
pub mod portfolio;
pub mod returns;
pub mod stats;
pub mod types;

pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use engine::PreparedUniverse;
pub use error::AnalyticsError;
pub use error::Result;
pub use frontier::generate_frontier;
pub use optimizers::Objective;
pub use types::AssetKey;
pub use types::DividendRecord;
pub use types::EfficientFrontier;
pub use types::EfficientFrontierPoint;
pub use types::OptimizationResult;
pub use types::PortfolioMetrics;
pub use types::PortfolioWeights;
pub use types::PriceDataPoint;
pub use types::PriceSeries;
pub use types::RiskFreeRates;
