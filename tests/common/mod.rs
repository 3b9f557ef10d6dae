#![allow(dead_code)]

use chrono::NaiveDate;
use portsim::domain::allocation::{AllocationTarget, AssetUniverse};
use portsim::domain::error::PortsimError;
use portsim::domain::pipeline::PipelineResult;
use portsim::domain::price_table::PriceTable;
use portsim::domain::sampler::PortfolioTable;
use portsim::domain::simulation::AssetPaths;
use portsim::ports::allocation_port::AllocationPort;
use portsim::ports::data_port::PriceDataPort;
use portsim::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;

pub struct MockPricePort {
    pub prices: Option<PriceTable>,
}

impl MockPricePort {
    pub fn new(prices: PriceTable) -> Self {
        Self {
            prices: Some(prices),
        }
    }

    pub fn failing() -> Self {
        Self { prices: None }
    }
}

impl PriceDataPort for MockPricePort {
    fn load_prices(&self) -> Result<PriceTable, PortsimError> {
        self.prices.clone().ok_or_else(|| PortsimError::Data {
            source_name: "mock".into(),
            reason: "price feed unavailable".into(),
        })
    }
}

pub struct MockAllocationPort {
    pub allocations: HashMap<(String, String), AllocationTarget>,
    pub universe: AssetUniverse,
}

impl MockAllocationPort {
    pub fn new(universe: AssetUniverse) -> Self {
        Self {
            allocations: HashMap::new(),
            universe,
        }
    }

    pub fn with_allocation(mut self, regime: &str, strategy: &str, target: AllocationTarget) -> Self {
        self.allocations
            .insert((regime.to_string(), strategy.to_string()), target);
        self
    }
}

impl AllocationPort for MockAllocationPort {
    fn load_allocation(
        &self,
        regime: &str,
        strategy: &str,
    ) -> Result<AllocationTarget, PortsimError> {
        self.allocations
            .get(&(regime.to_string(), strategy.to_string()))
            .cloned()
            .ok_or_else(|| PortsimError::ConfigInvalid {
                section: "allocation".into(),
                key: "regime".into(),
                reason: format!("no allocation for {} / {}", regime, strategy),
            })
    }

    fn load_universe(&self) -> Result<AssetUniverse, PortsimError> {
        Ok(self.universe.clone())
    }
}

/// Records what would have been written instead of touching the filesystem.
#[derive(Default)]
pub struct RecordingReportPort {
    pub portfolios: RefCell<Vec<PortfolioTable>>,
    pub asset_paths: RefCell<Vec<AssetPaths>>,
    pub best_ids: RefCell<Vec<usize>>,
}

impl ReportPort for RecordingReportPort {
    fn write_portfolios(&self, portfolios: &PortfolioTable) -> Result<PathBuf, PortsimError> {
        self.portfolios.borrow_mut().push(portfolios.clone());
        Ok(PathBuf::from("portfolios.csv"))
    }

    fn write_asset_paths(&self, paths: &AssetPaths) -> Result<PathBuf, PortsimError> {
        self.asset_paths.borrow_mut().push(paths.clone());
        Ok(PathBuf::from("asset_paths.csv"))
    }

    fn write_scores(&self, result: &PipelineResult) -> Result<Vec<PathBuf>, PortsimError> {
        self.best_ids.borrow_mut().push(result.scores.best_id);
        Ok(vec![PathBuf::from("scores.csv")])
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Deterministic, strictly positive price series with a drift and a wobble.
pub fn price_series(start_price: f64, drift: f64, count: usize) -> Vec<Option<f64>> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            Some(start_price * (drift * t).exp() * (1.0 + 0.02 * (t * 0.7).sin()))
        })
        .collect()
}

/// Daily prices for `assets`, starting 2020-01-01.
pub fn make_prices(assets: &[(&str, f64, f64)], count: usize) -> PriceTable {
    let start = date(2020, 1, 1);
    let dates = (0..count)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();
    let names = assets.iter().map(|(a, _, _)| a.to_string()).collect();
    let columns = assets
        .iter()
        .map(|(_, price, drift)| price_series(*price, *drift, count))
        .collect();
    PriceTable::new(dates, names, columns).unwrap()
}

pub fn stocks_bonds_universe() -> AssetUniverse {
    AssetUniverse::new()
        .with_class("Stocks", &["A", "B", "C"])
        .with_class("Bonds", &["D", "E"])
}

pub fn stocks_bonds_allocation() -> AllocationTarget {
    AllocationTarget::new().with("Stocks", 60.0).with("Bonds", 40.0)
}

pub fn stocks_bonds_prices(count: usize) -> PriceTable {
    make_prices(
        &[
            ("A", 100.0, 0.0008),
            ("B", 40.0, 0.0004),
            ("C", 250.0, -0.0002),
            ("D", 95.0, 0.0001),
            ("E", 60.0, 0.00015),
        ],
        count,
    )
}

pub fn names(assets: &[&str]) -> Vec<String> {
    assets.iter().map(|a| a.to_string()).collect()
}
