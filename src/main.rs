use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use folio_analytics::AssetKey;
use folio_analytics::Objective;
use folio_analytics::PortfolioEngine;
use folio_analytics::PortfolioEngineConfig;
use folio_analytics::PriceSeries;
use folio_analytics::RiskFreeRates;
use folio_analytics::metrics::cagr_windows;
use folio_analytics::metrics::max_drawdown;
use folio_analytics::metrics::sharpe_ratio;
use folio_analytics::metrics::sortino_ratio;
use folio_analytics::types::Market;
use prettytable::Cell;
use prettytable::Table;
use prettytable::row;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Normal;

const DAYS: usize = 756;

/// Geometric Brownian motion closes sampled once per trading day.
fn gbm_closes(rng: &mut StdRng, s0: f64, mu: f64, sigma: f64) -> Result<Vec<f64>> {
  let dt = 1.0 / 252.0;
  let normal = Normal::new(0.0, 1.0)?;
  let mut closes = Vec::with_capacity(DAYS);
  let mut s = s0;
  for _ in 0..DAYS {
    closes.push(s);
    let z: f64 = normal.sample(rng);
    s *= ((mu - 0.5 * sigma * sigma) * dt + sigma * dt.sqrt() * z).exp();
  }
  Ok(closes)
}

fn pct(x: Option<f64>) -> String {
  x.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn ratio(x: Option<f64>) -> String {
  x.map_or_else(|| "N/A".to_string(), |v| format!("{v:.3}"))
}

fn main() -> Result<()> {
  let mut rng = StdRng::seed_from_u64(42);
  let start = NaiveDate::from_ymd_opt(2021, 1, 4).ok_or_else(|| anyhow::anyhow!("bad date"))?;
  let rates = RiskFreeRates::new(4.5, 12.0);
  let risk_free = rates.decimal(Market::Us);

  let params = [
    ("BOND", 100.0, 0.03, 0.05),
    ("GOLD", 1800.0, 0.05, 0.15),
    ("SPY", 380.0, 0.09, 0.18),
    ("TECH", 120.0, 0.14, 0.32),
  ];

  let mut universe: BTreeMap<AssetKey, PriceSeries> = BTreeMap::new();
  for (key, s0, mu, sigma) in params {
    let closes = gbm_closes(&mut rng, s0, mu, sigma)?;
    universe.insert(key.to_string(), PriceSeries::from_daily_closes(start, &closes)?);
  }

  let mut assets = Table::new();
  assets.add_row(row!["Asset", "Sharpe", "Sortino", "Max DD", "CAGR 1Y", "CAGR 3Y"]);
  for (key, series) in &universe {
    let closes = series.closes();
    let cagr = cagr_windows(series);
    assets.add_row(row![
      key,
      ratio(sharpe_ratio(&closes, risk_free)?),
      ratio(sortino_ratio(&closes, risk_free)?),
      pct(max_drawdown(&closes)?),
      pct(cagr.one_year),
      pct(cagr.three_year),
    ]);
  }
  assets.printstd();

  let engine = PortfolioEngine::new(PortfolioEngineConfig {
    risk_free,
    frontier_points: 30,
    ..Default::default()
  });
  let prepared = engine.prepare(&universe)?;

  let mut allocations = Table::new();
  let mut header = row!["Objective", "Return", "Vol", "Sharpe", "Sortino"];
  for asset in &prepared.assets {
    header.add_cell(Cell::new(asset));
  }
  allocations.add_row(header);

  for objective in [
    Objective::MinimumVariance,
    Objective::MaximumSharpe,
    Objective::MaximumSortino,
    Objective::MaximumReturn,
  ] {
    let result = engine.optimize_with(objective, &prepared)?;
    let mut line = row![
      objective,
      pct(Some(result.metrics.expected_return)),
      pct(Some(result.metrics.volatility)),
      ratio(result.metrics.sharpe_ratio),
      ratio(result.metrics.sortino_ratio),
    ];
    for (_, w) in result.weights.iter() {
      line.add_cell(Cell::new(&format!("{:.1}%", w * 100.0)));
    }
    allocations.add_row(line);
  }
  allocations.printstd();

  let frontier = engine.frontier(&prepared)?;
  let mut curve = Table::new();
  curve.add_row(row!["Vol", "Return"]);
  for p in &frontier.points {
    curve.add_row(row![pct(Some(p.volatility)), pct(Some(p.expected_return))]);
  }
  curve.printstd();

  Ok(())
}
