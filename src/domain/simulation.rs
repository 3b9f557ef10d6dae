//! Bootstrapped path simulation.
//!
//! Daily log-returns are resampled with replacement from each asset's own
//! history; no distribution is assumed. Each simulated path starts at `1.0`
//! and compounds `exp(r)` for every drawn return. Paths are averaged
//! elementwise into one expected path per asset.

use crate::domain::error::PortsimError;
use crate::domain::price_table::{log_returns, PriceTable};
use log::{info, warn};
use rand::Rng;
use std::collections::BTreeMap;

pub const DEFAULT_NUM_SIMULATIONS: usize = 30;
pub const DEFAULT_NUM_DAYS: usize = 252;

/// Average simulated path per asset. Every path has `num_days + 1` points.
pub type AssetPaths = BTreeMap<String, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimulationConfig {
    pub num_simulations: usize,
    pub num_days: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_simulations: DEFAULT_NUM_SIMULATIONS,
            num_days: DEFAULT_NUM_DAYS,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), PortsimError> {
        if self.num_simulations < 1 {
            return Err(PortsimError::invalid(
                "simulation",
                "num_simulations",
                "num_simulations must be at least 1",
            ));
        }
        if self.num_days < 1 {
            return Err(PortsimError::invalid(
                "simulation",
                "num_days",
                "num_days must be at least 1",
            ));
        }
        Ok(())
    }
}

/// One bootstrapped trajectory of `num_days + 1` points starting at `1.0`.
///
/// Empty `returns` give a flat path; [`simulate`] skips such assets before
/// this point.
pub fn bootstrap_path<R: Rng + ?Sized>(returns: &[f64], num_days: usize, rng: &mut R) -> Vec<f64> {
    if returns.is_empty() {
        return vec![1.0; num_days + 1];
    }
    let mut path = Vec::with_capacity(num_days + 1);
    let mut value = 1.0_f64;
    path.push(value);
    for _ in 0..num_days {
        let r = returns[rng.gen_range(0..returns.len())];
        value *= r.exp();
        path.push(value);
    }
    path
}

/// Elementwise mean of `config.num_simulations` bootstrapped trajectories.
pub fn average_path<R: Rng + ?Sized>(
    returns: &[f64],
    config: &SimulationConfig,
    rng: &mut R,
) -> Vec<f64> {
    let mut sum = vec![0.0_f64; config.num_days + 1];
    for _ in 0..config.num_simulations {
        let path = bootstrap_path(returns, config.num_days, rng);
        for (acc, v) in sum.iter_mut().zip(path) {
            *acc += v;
        }
    }
    let n = config.num_simulations as f64;
    sum.iter_mut().for_each(|v| *v /= n);
    sum
}

/// Simulate every column of `prices`.
///
/// Assets without a single valid log-return are left out of the result; a
/// missing key means "not simulated", never an error.
pub fn simulate<R: Rng + ?Sized>(
    prices: &PriceTable,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<AssetPaths, PortsimError> {
    config.validate()?;

    let mut paths = AssetPaths::new();
    for (asset, column) in prices.iter_columns() {
        let returns = log_returns(column);
        if returns.is_empty() {
            warn!("skipping {}: no valid return history", asset);
            continue;
        }
        paths.insert(asset.to_string(), average_path(&returns, config, rng));
    }

    info!(
        "simulated {} of {} assets ({} runs x {} days)",
        paths.len(),
        prices.assets().len(),
        config.num_simulations,
        config.num_days
    );
    Ok(paths)
}

/// Parallel variant of [`simulate`].
///
/// One seed per asset is drawn from `rng` up front, in column order, and each
/// asset runs on its own `StdRng`. The result for a given `rng` state does not
/// depend on thread scheduling.
#[cfg(feature = "parallel")]
pub fn simulate_parallel<R: Rng + ?Sized>(
    prices: &PriceTable,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<AssetPaths, PortsimError> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rayon::prelude::*;

    config.validate()?;

    let jobs: Vec<(&str, &[Option<f64>], u64)> = prices
        .iter_columns()
        .map(|(asset, column)| (asset, column, rng.r#gen::<u64>()))
        .collect();

    let results: Vec<(String, Option<Vec<f64>>)> = jobs
        .into_par_iter()
        .map(|(asset, column, seed)| {
            let returns = log_returns(column);
            if returns.is_empty() {
                return (asset.to_string(), None);
            }
            let mut local = StdRng::seed_from_u64(seed);
            (
                asset.to_string(),
                Some(average_path(&returns, config, &mut local)),
            )
        })
        .collect();

    let mut paths = AssetPaths::new();
    for (asset, path) in results {
        match path {
            Some(p) => {
                paths.insert(asset, p);
            }
            None => warn!("skipping {}: no valid return history", asset),
        }
    }
    info!(
        "simulated {} of {} assets in parallel",
        paths.len(),
        prices.assets().len()
    );
    Ok(paths)
}
