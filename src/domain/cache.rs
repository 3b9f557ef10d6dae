//! Memoization of the two expensive, randomized steps.
//!
//! A cached result is returned as-is on a later request with the same inputs,
//! without drawing from the random source again. Keys capture every input
//! that influences the result; floats are keyed by their bit pattern.

use crate::domain::allocation::{AllocationTarget, AssetUniverse};
use crate::domain::price_table::PriceTable;
use crate::domain::sampler::{PortfolioTable, SamplerConfig};
use crate::domain::simulation::{AssetPaths, SimulationConfig};
use log::debug;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// Key for a generated [`PortfolioTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortfolioKey {
    allocation: Vec<(String, u64)>,
    universe: Vec<(String, Vec<String>)>,
    num_portfolios: usize,
    min_weight: u64,
    max_weight: u64,
    strict: bool,
}

impl PortfolioKey {
    pub fn new(
        allocation: &AllocationTarget,
        universe: &AssetUniverse,
        config: &SamplerConfig,
    ) -> Self {
        Self {
            allocation: allocation
                .iter()
                .map(|(class, pct)| (class.to_string(), pct.to_bits()))
                .collect(),
            universe: universe
                .iter()
                .map(|(class, assets)| (class.to_string(), assets.to_vec()))
                .collect(),
            num_portfolios: config.num_portfolios,
            min_weight: config.min_weight.to_bits(),
            max_weight: config.max_weight.to_bits(),
            strict: config.strict,
        }
    }
}

/// Key for simulated [`AssetPaths`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimulationKey {
    prices: u64,
    config: SimulationConfig,
}

impl SimulationKey {
    pub fn new(prices: &PriceTable, config: &SimulationConfig) -> Self {
        Self {
            prices: prices.fingerprint(),
            config: *config,
        }
    }
}

/// Keyed store of computed values with hit/miss counters.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    label: &'static str,
    entries: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K: Eq + Hash, V> MemoCache<K, V> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// A failed computation stores nothing.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, compute: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.hits += 1;
                debug!("{} cache hit", self.label);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                self.misses += 1;
                let value = compute()?;
                Ok(entry.insert(value))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub type PortfolioCache = MemoCache<PortfolioKey, PortfolioTable>;
pub type SimulationCache = MemoCache<SimulationKey, AssetPaths>;
