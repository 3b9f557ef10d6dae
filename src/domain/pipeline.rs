//! One end-to-end run: sample portfolios, simulate their assets, score.

use crate::domain::allocation::{AllocationTarget, AssetUniverse};
use crate::domain::cache::{PortfolioCache, PortfolioKey, SimulationCache, SimulationKey};
use crate::domain::error::PortsimError;
use crate::domain::price_table::PriceTable;
use crate::domain::sampler::{PortfolioTable, SamplerConfig};
use crate::domain::scoring::{self, ScoreTable};
use crate::domain::simulation::{AssetPaths, SimulationConfig};
use log::{debug, info, warn};
use rand::Rng;

#[cfg(feature = "parallel")]
use crate::domain::sampler::generate_parallel as generate_portfolios;
#[cfg(not(feature = "parallel"))]
use crate::domain::sampler::generate as generate_portfolios;
#[cfg(feature = "parallel")]
use crate::domain::simulation::simulate_parallel as simulate_assets;
#[cfg(not(feature = "parallel"))]
use crate::domain::simulation::simulate as simulate_assets;

/// Materialized inputs of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInputs {
    pub prices: PriceTable,
    pub allocation: AllocationTarget,
    pub universe: AssetUniverse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub portfolios: PortfolioTable,
    pub paths: AssetPaths,
    pub scores: ScoreTable,
}

impl PipelineResult {
    /// Non-zero weights of the best portfolio, in column order.
    pub fn best_weights(&self) -> Vec<(&str, f64)> {
        self.portfolios
            .weights_of(self.scores.best_id)
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .collect()
    }
}

/// Runs the sampler, simulator and scorer, memoizing the first two.
#[derive(Debug)]
pub struct Pipeline {
    portfolios: PortfolioCache,
    simulations: SimulationCache,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            portfolios: PortfolioCache::new("portfolio"),
            simulations: SimulationCache::new("simulation"),
        }
    }

    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        allocation: &AllocationTarget,
        universe: &AssetUniverse,
        config: &SamplerConfig,
        rng: &mut R,
    ) -> Result<&PortfolioTable, PortsimError> {
        let key = PortfolioKey::new(allocation, universe, config);
        self.portfolios
            .get_or_try_insert_with(key, || generate_portfolios(allocation, universe, config, rng))
    }

    pub fn simulate<R: Rng + ?Sized>(
        &mut self,
        prices: &PriceTable,
        config: &SimulationConfig,
        rng: &mut R,
    ) -> Result<&AssetPaths, PortsimError> {
        let key = SimulationKey::new(prices, config);
        self.simulations
            .get_or_try_insert_with(key, || simulate_assets(prices, config, rng))
    }

    /// Generate, simulate the assets the portfolios can hold, then score.
    ///
    /// Both configurations are validated before the first random draw.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        inputs: &RunInputs,
        sampler: &SamplerConfig,
        simulation: &SimulationConfig,
        rng: &mut R,
    ) -> Result<PipelineResult, PortsimError> {
        sampler.validate()?;
        simulation.validate()?;

        let portfolios = self
            .generate(&inputs.allocation, &inputs.universe, sampler, rng)?
            .clone();

        let prices = inputs.prices.restrict_to(portfolios.assets());
        let missing = portfolios.assets().len() - prices.assets().len();
        if missing > 0 {
            warn!("{} portfolio assets have no price column", missing);
        }

        let paths = self.simulate(&prices, simulation, rng)?.clone();
        let scores = scoring::score(&paths, &portfolios)?;

        info!(
            "pipeline complete: best portfolio #{} of {}",
            scores.best_id,
            portfolios.len()
        );
        debug!(
            "cache hits/misses: portfolios {}/{}, simulations {}/{}",
            self.portfolios.hits(),
            self.portfolios.misses(),
            self.simulations.hits(),
            self.simulations.misses()
        );
        Ok(PipelineResult {
            portfolios,
            paths,
            scores,
        })
    }

    pub fn cached_portfolio_tables(&self) -> usize {
        self.portfolios.len()
    }

    pub fn cached_simulations(&self) -> usize {
        self.simulations.len()
    }

    /// Forget every memoized result.
    pub fn reset(&mut self) {
        self.portfolios.clear();
        self.simulations.clear();
    }
}
