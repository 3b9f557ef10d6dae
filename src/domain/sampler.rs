//! Randomized, constraint-satisfying portfolio generation.
//!
//! For each portfolio and each asset class, weight is handed out in random
//! slices of at least `min_weight` to randomly picked assets until the class
//! target is reached. No asset ever exceeds `max_weight`. When the leftover is
//! smaller than `min_weight` it is topped up onto one asset that already holds
//! weight and can absorb it; if none can, the class stays short.

use crate::domain::allocation::{AllocationTarget, AssetUniverse};
use crate::domain::error::PortsimError;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

pub const DEFAULT_NUM_PORTFOLIOS: usize = 1000;
pub const DEFAULT_MIN_WEIGHT: f64 = 0.025;
pub const DEFAULT_MAX_WEIGHT: f64 = 0.3;

/// Slack used for every weight comparison.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    pub num_portfolios: usize,
    pub min_weight: f64,
    pub max_weight: f64,
    /// Fail on any allocation shortfall instead of accepting it.
    pub strict: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            num_portfolios: DEFAULT_NUM_PORTFOLIOS,
            min_weight: DEFAULT_MIN_WEIGHT,
            max_weight: DEFAULT_MAX_WEIGHT,
            strict: false,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<(), PortsimError> {
        if self.num_portfolios < 1 {
            return Err(PortsimError::invalid(
                "portfolios",
                "num_portfolios",
                "num_portfolios must be at least 1",
            ));
        }
        if !(self.min_weight > 0.0) {
            return Err(PortsimError::invalid(
                "portfolios",
                "min_weight",
                "min_weight must be positive",
            ));
        }
        if !(self.min_weight < self.max_weight) {
            return Err(PortsimError::invalid(
                "portfolios",
                "min_weight",
                "min_weight must be below max_weight",
            ));
        }
        if !(self.max_weight <= 1.0) {
            return Err(PortsimError::invalid(
                "portfolios",
                "max_weight",
                "max_weight must not exceed 1",
            ));
        }
        Ok(())
    }
}

/// States of the per-class allocation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationState {
    /// Remaining weight is at least `min_weight`: draw random slices.
    Accumulating,
    /// Remaining weight is positive but below `min_weight`: one exact top-up.
    ShortfallTopUp,
    /// No asset can take more weight; the class ends short.
    Exhausted,
    /// The class target is fully assigned.
    Done,
}

impl AllocationState {
    fn from_remaining(remaining: f64, min_weight: f64) -> Self {
        if remaining <= WEIGHT_TOLERANCE {
            AllocationState::Done
        } else if remaining < min_weight {
            AllocationState::ShortfallTopUp
        } else {
            AllocationState::Accumulating
        }
    }
}

/// Outcome of allocating one class within one portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAllocation {
    /// `(asset, weight)` for every eligible asset, zero weights included.
    pub weights: Vec<(String, f64)>,
    pub target: f64,
    pub assigned: f64,
    pub final_state: AllocationState,
}

impl ClassAllocation {
    pub fn shortfall(&self) -> f64 {
        (self.target - self.assigned).max(0.0)
    }

    pub fn is_short(&self) -> bool {
        self.shortfall() > WEIGHT_TOLERANCE
    }
}

/// Spread `target` (a fraction, not a percentage) over `assets`.
pub fn allocate_class<R: Rng + ?Sized>(
    assets: &[String],
    target: f64,
    config: &SamplerConfig,
    rng: &mut R,
) -> ClassAllocation {
    let mut order: Vec<&String> = assets.iter().collect();
    order.shuffle(rng);

    let mut weights = vec![0.0_f64; order.len()];
    let mut assigned = 0.0_f64;
    let mut state = if order.is_empty() {
        AllocationState::Exhausted
    } else {
        AllocationState::from_remaining(target, config.min_weight)
    };

    loop {
        match state {
            AllocationState::Accumulating => {
                let eligible: Vec<usize> = (0..order.len())
                    .filter(|&i| config.max_weight - weights[i] > WEIGHT_TOLERANCE)
                    .collect();
                let Some(&pick) = eligible.choose(rng) else {
                    state = AllocationState::Exhausted;
                    continue;
                };
                let remaining = target - assigned;
                let max_assignable = (config.max_weight - weights[pick]).min(remaining);
                let slice = if max_assignable <= config.min_weight {
                    max_assignable
                } else {
                    rng.gen_range(config.min_weight..=max_assignable)
                };
                weights[pick] += slice;
                assigned += slice;
                state = AllocationState::from_remaining(target - assigned, config.min_weight);
            }
            AllocationState::ShortfallTopUp => {
                let remaining = target - assigned;
                let eligible: Vec<usize> = (0..order.len())
                    .filter(|&i| {
                        weights[i] > 0.0
                            && weights[i] + remaining <= config.max_weight + WEIGHT_TOLERANCE
                    })
                    .collect();
                state = match eligible.choose(rng) {
                    Some(&pick) => {
                        weights[pick] += remaining;
                        assigned += remaining;
                        AllocationState::Done
                    }
                    None => AllocationState::Exhausted,
                };
            }
            AllocationState::Exhausted | AllocationState::Done => break,
        }
    }

    ClassAllocation {
        weights: order
            .into_iter()
            .cloned()
            .zip(weights)
            .collect(),
        target,
        assigned,
        final_state: state,
    }
}

/// Candidate portfolios, one row of weights per portfolio.
///
/// Columns are the union of all assets in the universe; unassigned assets
/// carry weight `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioTable {
    assets: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl PortfolioTable {
    pub fn new(assets: Vec<String>) -> Self {
        Self {
            assets,
            rows: Vec::new(),
        }
    }

    /// Append a row. The row must have one weight per column.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<(), PortsimError> {
        if row.len() != self.assets.len() {
            return Err(PortsimError::Data {
                source_name: "portfolio table".into(),
                reason: format!(
                    "row has {} weights for {} assets",
                    row.len(),
                    self.assets.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: usize) -> Option<&[f64]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn weight(&self, id: usize, asset: &str) -> Option<f64> {
        let col = self.assets.iter().position(|a| a == asset)?;
        self.rows.get(id).map(|r| r[col])
    }

    /// `(asset, weight)` pairs of one portfolio, in column order.
    pub fn weights_of(&self, id: usize) -> Option<Vec<(&str, f64)>> {
        self.rows.get(id).map(|r| {
            self.assets
                .iter()
                .map(String::as_str)
                .zip(r.iter().copied())
                .collect()
        })
    }

    /// Total weight held in `assets` by portfolio `id`.
    pub fn class_weight(&self, id: usize, assets: &[String]) -> f64 {
        assets
            .iter()
            .filter_map(|a| self.weight(id, a))
            .sum()
    }
}

/// Generate `config.num_portfolios` random portfolios.
pub fn generate<R: Rng + ?Sized>(
    allocation: &AllocationTarget,
    universe: &AssetUniverse,
    config: &SamplerConfig,
    rng: &mut R,
) -> Result<PortfolioTable, PortsimError> {
    let columns = prepare(allocation, universe, config)?;
    let mut table = PortfolioTable::new(columns.clone());
    let col_index = column_index(&columns);

    let mut shortfalls = 0usize;
    for id in 0..config.num_portfolios {
        let (row, short) = build_row(id, allocation, universe, &col_index, config, rng)?;
        shortfalls += short;
        table.push_row(row)?;
    }

    report(&table, shortfalls);
    Ok(table)
}

/// Parallel variant of [`generate`].
///
/// One seed per portfolio is drawn from `rng` before any work starts, so a
/// seeded run yields the same table regardless of thread scheduling.
#[cfg(feature = "parallel")]
pub fn generate_parallel<R: Rng + ?Sized>(
    allocation: &AllocationTarget,
    universe: &AssetUniverse,
    config: &SamplerConfig,
    rng: &mut R,
) -> Result<PortfolioTable, PortsimError> {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rayon::prelude::*;

    let columns = prepare(allocation, universe, config)?;
    let col_index = column_index(&columns);
    let seeds: Vec<u64> = (0..config.num_portfolios)
        .map(|_| rng.r#gen::<u64>())
        .collect();

    let rows: Vec<(Vec<f64>, usize)> = seeds
        .into_par_iter()
        .enumerate()
        .map(|(id, seed)| {
            let mut local = StdRng::seed_from_u64(seed);
            build_row(id, allocation, universe, &col_index, config, &mut local)
        })
        .collect::<Result<_, _>>()?;

    let mut table = PortfolioTable::new(columns);
    let mut shortfalls = 0usize;
    for (row, short) in rows {
        shortfalls += short;
        table.push_row(row)?;
    }
    report(&table, shortfalls);
    Ok(table)
}

fn prepare(
    allocation: &AllocationTarget,
    universe: &AssetUniverse,
    config: &SamplerConfig,
) -> Result<Vec<String>, PortsimError> {
    config.validate()?;
    universe.validate()?;

    for (class, percent) in allocation.iter() {
        if !(0.0..=100.0).contains(&percent) {
            return Err(PortsimError::invalid(
                "allocation",
                class,
                "target percentage must be between 0 and 100",
            ));
        }
        if percent > 0.0 && universe.assets_in(class).is_empty() {
            warn!("class {} has a {}% target but no eligible assets", class, percent);
        }
    }
    Ok(universe.all_assets())
}

fn column_index(columns: &[String]) -> HashMap<&str, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(i, a)| (a.as_str(), i))
        .collect()
}

fn build_row<R: Rng + ?Sized>(
    id: usize,
    allocation: &AllocationTarget,
    universe: &AssetUniverse,
    col_index: &HashMap<&str, usize>,
    config: &SamplerConfig,
    rng: &mut R,
) -> Result<(Vec<f64>, usize), PortsimError> {
    let mut row = vec![0.0_f64; col_index.len()];
    let mut shortfalls = 0usize;

    for (class, percent) in allocation.iter() {
        let assets = universe.assets_in(class);
        if assets.is_empty() || percent == 0.0 {
            continue;
        }
        let outcome = allocate_class(assets, percent / 100.0, config, rng);
        if outcome.is_short() {
            if config.strict {
                return Err(PortsimError::AllocationShortfall {
                    class: class.to_string(),
                    portfolio: id,
                    assigned: outcome.assigned,
                    target: outcome.target,
                });
            }
            shortfalls += 1;
        }
        for (asset, weight) in outcome.weights {
            if let Some(&col) = col_index.get(asset.as_str()) {
                row[col] = weight;
            }
        }
    }
    Ok((row, shortfalls))
}

fn report(table: &PortfolioTable, shortfalls: usize) {
    if shortfalls > 0 {
        warn!(
            "{} class allocations ended below target across {} portfolios",
            shortfalls,
            table.len()
        );
    }
    info!(
        "generated {} portfolios over {} assets",
        table.len(),
        table.assets().len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn names(assets: &[&str]) -> Vec<String> {
        assets.iter().map(|a| a.to_string()).collect()
    }

    fn config(min_weight: f64, max_weight: f64) -> SamplerConfig {
        SamplerConfig {
            num_portfolios: 10,
            min_weight,
            max_weight,
            strict: false,
        }
    }

    #[test]
    fn state_transitions_follow_remaining_weight() {
        assert_eq!(AllocationState::from_remaining(0.5, 0.025), AllocationState::Accumulating);
        assert_eq!(AllocationState::from_remaining(0.025, 0.025), AllocationState::Accumulating);
        assert_eq!(AllocationState::from_remaining(0.01, 0.025), AllocationState::ShortfallTopUp);
        assert_eq!(AllocationState::from_remaining(0.0, 0.025), AllocationState::Done);
        assert_eq!(AllocationState::from_remaining(-1e-12, 0.025), AllocationState::Done);
    }

    #[test]
    fn allocate_class_reaches_target_within_bounds() {
        // With a 0.5 cap a 0.6 target can always be topped up exactly.
        let assets = names(&["A", "B", "C"]);
        let cfg = config(0.025, 0.5);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let out = allocate_class(&assets, 0.6, &cfg, &mut rng);
            assert_eq!(out.final_state, AllocationState::Done);
            let sum: f64 = out.weights.iter().map(|(_, w)| w).sum();
            assert!((sum - 0.6).abs() < 1e-9, "sum was {}", sum);
            for (_, w) in &out.weights {
                assert!(*w >= 0.0 && *w <= 0.5 + WEIGHT_TOLERANCE);
            }
        }
    }

    #[test]
    fn allocate_class_shortfall_is_bounded_by_min_weight() {
        let assets = names(&["A", "B", "C"]);
        let cfg = config(0.025, 0.3);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let out = allocate_class(&assets, 0.6, &cfg, &mut rng);
            assert!(out.assigned <= 0.6 + WEIGHT_TOLERANCE);
            assert!(out.shortfall() < cfg.min_weight);
            if out.final_state == AllocationState::Done {
                assert!(!out.is_short());
            }
            for (_, w) in &out.weights {
                assert!(*w >= 0.0 && *w <= 0.3 + WEIGHT_TOLERANCE);
            }
        }
    }

    #[test]
    fn allocate_class_exhausts_when_capacity_is_too_small() {
        // Two assets capped at 0.3 cannot hold 0.8.
        let assets = names(&["X", "Y"]);
        let cfg = config(0.025, 0.3);
        let out = allocate_class(&assets, 0.8, &cfg, &mut StdRng::seed_from_u64(1));
        assert_eq!(out.final_state, AllocationState::Exhausted);
        assert!(out.is_short());
        assert!((out.assigned - 0.6).abs() < 1e-9);
        assert!(out.weights.iter().all(|(_, w)| (*w - 0.3).abs() < 1e-9));
    }

    #[test]
    fn allocate_class_below_min_weight_with_nothing_held_is_short() {
        let assets = names(&["A", "B"]);
        let cfg = config(0.025, 0.3);
        let out = allocate_class(&assets, 0.01, &cfg, &mut StdRng::seed_from_u64(3));
        assert_eq!(out.final_state, AllocationState::Exhausted);
        assert_eq!(out.assigned, 0.0);
        assert!(out.weights.iter().all(|(_, w)| *w == 0.0));
    }

    #[test]
    fn allocate_class_single_asset_caps_at_max_weight() {
        let assets = names(&["ONLY"]);
        let cfg = config(0.025, 0.3);
        let out = allocate_class(&assets, 1.0, &cfg, &mut StdRng::seed_from_u64(9));
        assert!(out.is_short());
        assert!(out.weights[0].1 <= 0.3 + WEIGHT_TOLERANCE);
        assert!((out.weights[0].1 - 0.3).abs() < 1e-9);
    }

    #[test]
    fn allocate_class_with_no_assets_is_exhausted() {
        let out = allocate_class(&[], 0.5, &config(0.025, 0.3), &mut StdRng::seed_from_u64(0));
        assert_eq!(out.final_state, AllocationState::Exhausted);
        assert!(out.weights.is_empty());
    }

    #[test]
    fn allocate_class_zero_target_is_done_immediately() {
        let assets = names(&["A"]);
        let out = allocate_class(&assets, 0.0, &config(0.025, 0.3), &mut StdRng::seed_from_u64(0));
        assert_eq!(out.final_state, AllocationState::Done);
        assert_eq!(out.weights, vec![("A".to_string(), 0.0)]);
    }

    #[test]
    fn generate_fills_every_universe_column() {
        let allocation = AllocationTarget::new().with("Stocks", 60.0).with("Bonds", 40.0);
        let universe = AssetUniverse::new()
            .with_class("Stocks", &["A", "B", "C"])
            .with_class("Bonds", &["D", "E"])
            .with_class("Cash", &["F"]);
        let table = generate(
            &allocation,
            &universe,
            &config(0.025, 0.3),
            &mut StdRng::seed_from_u64(17),
        )
        .unwrap();
        assert_eq!(table.len(), 10);
        assert_eq!(table.assets(), &names(&["A", "B", "C", "D", "E", "F"])[..]);
        for id in 0..table.len() {
            assert_eq!(table.weight(id, "F"), Some(0.0));
        }
    }

    #[test]
    fn generate_strict_mode_raises_on_shortfall() {
        let allocation = AllocationTarget::new().with("Stocks", 100.0);
        let universe = AssetUniverse::new().with_class("Stocks", &["A", "B"]);
        let mut cfg = config(0.025, 0.3);
        cfg.strict = true;
        let err = generate(&allocation, &universe, &cfg, &mut StdRng::seed_from_u64(2)).unwrap_err();
        assert!(matches!(
            err,
            PortsimError::AllocationShortfall { ref class, portfolio: 0, .. } if class == "Stocks"
        ));
    }

    #[test]
    fn generate_lenient_mode_accepts_shortfall() {
        let allocation = AllocationTarget::new().with("Stocks", 100.0);
        let universe = AssetUniverse::new().with_class("Stocks", &["A", "B"]);
        let table = generate(
            &allocation,
            &universe,
            &config(0.025, 0.3),
            &mut StdRng::seed_from_u64(2),
        )
        .unwrap();
        for id in 0..table.len() {
            let sum = table.class_weight(id, &names(&["A", "B"]));
            assert!((sum - 0.6).abs() < 1e-9);
        }
    }

    #[test]
    fn generate_rejects_invalid_weight_bounds() {
        let allocation = AllocationTarget::new().with("Stocks", 100.0);
        let universe = AssetUniverse::new().with_class("Stocks", &["A"]);
        let err = generate(
            &allocation,
            &universe,
            &config(0.3, 0.3),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(err, PortsimError::ConfigInvalid { key, .. } if key == "min_weight"));

        let err = generate(
            &allocation,
            &universe,
            &config(0.1, 1.5),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(err, PortsimError::ConfigInvalid { key, .. } if key == "max_weight"));
    }

    #[test]
    fn generate_rejects_zero_portfolios() {
        let mut cfg = config(0.025, 0.3);
        cfg.num_portfolios = 0;
        let err = generate(
            &AllocationTarget::new(),
            &AssetUniverse::new(),
            &cfg,
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(err, PortsimError::ConfigInvalid { key, .. } if key == "num_portfolios"));
    }

    #[test]
    fn generate_is_reproducible_with_same_seed() {
        let allocation = AllocationTarget::new().with("Stocks", 70.0).with("Bonds", 30.0);
        let universe = AssetUniverse::new()
            .with_class("Stocks", &["A", "B", "C", "D"])
            .with_class("Bonds", &["E", "F"]);
        let cfg = config(0.025, 0.3);
        let a = generate(&allocation, &universe, &cfg, &mut StdRng::seed_from_u64(8)).unwrap();
        let b = generate(&allocation, &universe, &cfg, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut table = PortfolioTable::new(names(&["A", "B"]));
        assert!(table.push_row(vec![0.5]).is_err());
        assert!(table.push_row(vec![0.5, 0.5]).is_ok());
        assert_eq!(table.weights_of(0), Some(vec![("A", 0.5), ("B", 0.5)]));
        assert_eq!(table.weight(0, "Z"), None);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn generate_parallel_matches_itself_across_runs() {
        let allocation = AllocationTarget::new().with("Stocks", 60.0).with("Bonds", 40.0);
        let universe = AssetUniverse::new()
            .with_class("Stocks", &["A", "B", "C"])
            .with_class("Bonds", &["D", "E"]);
        let cfg = config(0.025, 0.3);
        let a = generate_parallel(&allocation, &universe, &cfg, &mut StdRng::seed_from_u64(4)).unwrap();
        let b = generate_parallel(&allocation, &universe, &cfg, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
    }
}
