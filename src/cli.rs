//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::csv_allocation_adapter::CsvAllocationAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::allocation::{parse_allocation, AllocationTarget, AssetUniverse};
use crate::domain::config_validation::{
    has_inline_targets, parse_flag, parse_value, validate_allocation_config,
    validate_portfolio_config, validate_run_config, validate_simulation_config,
};
use crate::domain::error::PortsimError;
use crate::domain::pipeline::{Pipeline, PipelineResult, RunInputs};
use crate::domain::sampler::{
    SamplerConfig, DEFAULT_MAX_WEIGHT, DEFAULT_MIN_WEIGHT, DEFAULT_NUM_PORTFOLIOS,
};
use crate::domain::simulation::{SimulationConfig, DEFAULT_NUM_DAYS, DEFAULT_NUM_SIMULATIONS};
use crate::ports::allocation_port::AllocationPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceDataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_TOP: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "portsim",
    about = "Bootstrapped Monte Carlo portfolio simulator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate, simulate and score portfolios
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        /// Fail when a class allocation cannot reach its target
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Generate candidate portfolios only
    Generate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Simulate average asset paths only
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOverrides {
    pub seed: Option<u64>,
    pub strict: bool,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            output,
            seed,
            strict,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_full(&config, output.as_ref(), RunOverrides { seed, strict })
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Generate {
            config,
            output,
            seed,
        } => run_generate(&config, output.as_ref(), seed),
        Command::Simulate {
            config,
            output,
            seed,
        } => run_simulate(&config, output.as_ref(), seed),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| fail(&err))
}

fn fail(err: &PortsimError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn build_sampler_config(
    adapter: &dyn ConfigPort,
    strict_override: bool,
) -> Result<SamplerConfig, PortsimError> {
    let config = SamplerConfig {
        num_portfolios: parse_value(adapter, "portfolios", "num_portfolios")?
            .unwrap_or(DEFAULT_NUM_PORTFOLIOS),
        min_weight: parse_value(adapter, "portfolios", "min_weight")?
            .unwrap_or(DEFAULT_MIN_WEIGHT),
        max_weight: parse_value(adapter, "portfolios", "max_weight")?
            .unwrap_or(DEFAULT_MAX_WEIGHT),
        strict: strict_override
            || parse_flag(adapter, "portfolios", "strict")?.unwrap_or(false),
    };
    config.validate()?;
    Ok(config)
}

pub fn build_simulation_config(adapter: &dyn ConfigPort) -> Result<SimulationConfig, PortsimError> {
    let config = SimulationConfig {
        num_simulations: parse_value(adapter, "simulation", "num_simulations")?
            .unwrap_or(DEFAULT_NUM_SIMULATIONS),
        num_days: parse_value(adapter, "simulation", "num_days")?.unwrap_or(DEFAULT_NUM_DAYS),
    };
    config.validate()?;
    Ok(config)
}

/// The command-line seed wins over `[simulation] seed`.
pub fn resolve_seed(
    adapter: &dyn ConfigPort,
    override_seed: Option<u64>,
) -> Result<Option<u64>, PortsimError> {
    match override_seed {
        Some(seed) => Ok(Some(seed)),
        None => parse_value(adapter, "simulation", "seed"),
    }
}

pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

pub fn report_top(adapter: &dyn ConfigPort) -> usize {
    parse_value::<usize>(adapter, "report", "top")
        .ok()
        .flatten()
        .unwrap_or(DEFAULT_TOP)
}

pub fn resolve_output_dir(adapter: &FileConfigAdapter, output: Option<&PathBuf>) -> PathBuf {
    output
        .cloned()
        .or_else(|| adapter.get_path("report", "output_dir"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Inline `[allocation] targets` if set, otherwise the table row for the
/// configured regime and strategy.
pub fn load_allocation(
    config: &dyn ConfigPort,
    allocations: &dyn AllocationPort,
) -> Result<AllocationTarget, PortsimError> {
    if has_inline_targets(config) {
        return parse_allocation(&config.require_string("allocation", "targets")?);
    }
    let regime = config.require_string("allocation", "regime")?;
    let strategy = config.require_string("allocation", "strategy")?;
    allocations.load_allocation(&regime, &strategy)
}

pub fn load_universe(allocations: &dyn AllocationPort) -> Result<AssetUniverse, PortsimError> {
    let universe = allocations.load_universe()?;
    if universe.all_assets().is_empty() {
        return Err(PortsimError::NoData {
            what: "asset universe has no assets".into(),
        });
    }
    Ok(universe)
}

pub fn load_inputs(
    config: &dyn ConfigPort,
    prices: &dyn PriceDataPort,
    allocations: &dyn AllocationPort,
) -> Result<RunInputs, PortsimError> {
    let allocation = load_allocation(config, allocations)?;
    let universe = load_universe(allocations)?;
    let prices = prices.load_prices()?;
    if prices.is_empty() {
        return Err(PortsimError::NoData {
            what: "price table has no rows".into(),
        });
    }
    Ok(RunInputs {
        prices,
        allocation,
        universe,
    })
}

/// Validate, load, run and report. Everything after configuration goes
/// through the ports, so any stage can be replaced in tests.
pub fn run_pipeline(
    config: &dyn ConfigPort,
    prices: &dyn PriceDataPort,
    allocations: &dyn AllocationPort,
    report: &dyn ReportPort,
    overrides: RunOverrides,
) -> Result<(PipelineResult, Vec<PathBuf>), PortsimError> {
    validate_run_config(config)?;
    let sampler = build_sampler_config(config, overrides.strict)?;
    let simulation = build_simulation_config(config)?;
    let seed = resolve_seed(config, overrides.seed)?;

    let inputs = load_inputs(config, prices, allocations)?;
    eprintln!(
        "Loaded {} dates x {} assets, {} classes",
        inputs.prices.len(),
        inputs.prices.assets().len(),
        inputs.universe.class_count()
    );

    let mut rng = make_rng(seed);
    eprintln!(
        "Generating {} portfolios, simulating {} runs x {} days...",
        sampler.num_portfolios, simulation.num_simulations, simulation.num_days
    );
    let result = Pipeline::new().run(&inputs, &sampler, &simulation, &mut rng)?;
    let written = report.write_run(&result)?;
    Ok((result, written))
}

pub fn print_summary(result: &PipelineResult, top: usize) {
    eprintln!("\n=== Top {} Portfolios ===", top.min(result.scores.rows.len()));
    eprintln!(
        "{:>4}  {:>6}  {:>12}  {:>10}  {:>10}",
        "rank", "id", "total_return", "sharpe", "score"
    );
    for (rank, row) in result.scores.top(top).iter().enumerate() {
        eprintln!(
            "{:>4}  {:>6}  {:>11.2}%  {:>10.4}  {:>10.4}",
            rank + 1,
            row.portfolio_id,
            row.total_return * 100.0,
            row.sharpe_ratio,
            row.final_score
        );
    }

    let best = result.scores.best();
    eprintln!("\n=== Best Portfolio (#{}) ===", best.portfolio_id);
    for (asset, weight) in result.best_weights() {
        eprintln!("  {:<12} {:>6.2}%", asset, weight * 100.0);
    }
    if let Some(last) = best.path.last() {
        eprintln!("Expected value after {} days: {:.4}", best.path.len() - 1, last);
    }
}

fn price_adapter(adapter: &FileConfigAdapter) -> Result<CsvPriceAdapter, PortsimError> {
    adapter
        .get_path("data", "prices")
        .map(CsvPriceAdapter::new)
        .ok_or_else(|| PortsimError::missing("data", "prices"))
}

fn allocation_adapter(adapter: &FileConfigAdapter) -> Result<CsvAllocationAdapter, PortsimError> {
    let assets = adapter
        .get_path("data", "assets")
        .ok_or_else(|| PortsimError::missing("data", "assets"))?;
    Ok(CsvAllocationAdapter::new(
        adapter.get_path("data", "allocation"),
        assets,
    ))
}

fn data_adapters(
    adapter: &FileConfigAdapter,
) -> Result<(CsvPriceAdapter, CsvAllocationAdapter), PortsimError> {
    Ok((price_adapter(adapter)?, allocation_adapter(adapter)?))
}

fn run_full(config_path: &PathBuf, output: Option<&PathBuf>, overrides: RunOverrides) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (prices, allocations) = match data_adapters(&adapter) {
        Ok(pair) => pair,
        Err(e) => return fail(&e),
    };
    let report = CsvReportAdapter::new(resolve_output_dir(&adapter, output));

    match run_pipeline(&adapter, &prices, &allocations, &report, overrides) {
        Ok((result, written)) => {
            print_summary(&result, report_top(&adapter));
            eprintln!();
            for path in written {
                eprintln!("Report written to: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn run_dry_run(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_run_config(&adapter) {
        return fail(&e);
    }
    eprintln!("Config validated successfully");

    let (sampler, simulation) = match build_sampler_config(&adapter, false)
        .and_then(|s| build_simulation_config(&adapter).map(|m| (s, m)))
    {
        Ok(pair) => pair,
        Err(e) => return fail(&e),
    };
    let (prices, allocations) = match data_adapters(&adapter) {
        Ok(pair) => pair,
        Err(e) => return fail(&e),
    };
    let inputs = match load_inputs(&adapter, &prices, &allocations) {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };

    eprintln!("\nAllocation:");
    for (class, percent) in inputs.allocation.iter() {
        eprintln!("  {:<12} {:>6.2}%", class, percent);
    }
    if (inputs.allocation.total_percent() - 100.0).abs() > 1e-6 {
        eprintln!(
            "  warning: targets sum to {:.2}%",
            inputs.allocation.total_percent()
        );
    }

    eprintln!("\nUniverse:");
    for (class, assets) in inputs.universe.iter() {
        let priced = assets
            .iter()
            .filter(|a| inputs.prices.column(a).is_some())
            .count();
        eprintln!(
            "  {:<12} {} ({}/{} priced)",
            class,
            assets.join(", "),
            priced,
            assets.len()
        );
    }

    eprintln!("\nPrices: {} dates", inputs.prices.len());
    if let (Some(first), Some(last)) = (inputs.prices.dates().first(), inputs.prices.dates().last())
    {
        eprintln!("  {} to {}", first, last);
    }
    eprintln!(
        "\nPortfolios: {} (weights {} to {}{})",
        sampler.num_portfolios,
        sampler.min_weight,
        sampler.max_weight,
        if sampler.strict { ", strict" } else { "" }
    );
    eprintln!(
        "Simulation: {} runs x {} days",
        simulation.num_simulations, simulation.num_days
    );

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match validate_run_config(&adapter) {
        Ok(()) => {
            eprintln!("Config validated successfully");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_generate(config_path: &PathBuf, output: Option<&PathBuf>, seed: Option<u64>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match generate_portfolios(&adapter, output, seed) {
        Ok(path) => {
            eprintln!("Report written to: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn generate_portfolios(
    adapter: &FileConfigAdapter,
    output: Option<&PathBuf>,
    seed: Option<u64>,
) -> Result<PathBuf, PortsimError> {
    validate_allocation_config(adapter)?;
    validate_portfolio_config(adapter)?;
    let sampler = build_sampler_config(adapter, false)?;
    let allocations = allocation_adapter(adapter)?;
    let allocation = load_allocation(adapter, &allocations)?;
    let universe = load_universe(&allocations)?;
    let mut rng = make_rng(resolve_seed(adapter, seed)?);

    let mut pipeline = Pipeline::new();
    let table = pipeline.generate(&allocation, &universe, &sampler, &mut rng)?;
    eprintln!(
        "Generated {} portfolios over {} assets",
        table.len(),
        table.assets().len()
    );
    CsvReportAdapter::new(resolve_output_dir(adapter, output)).write_portfolios(table)
}

fn run_simulate(config_path: &PathBuf, output: Option<&PathBuf>, seed: Option<u64>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    match simulate_assets(&adapter, output, seed) {
        Ok(path) => {
            eprintln!("Report written to: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Simulate every priced column, not only the universe.
fn simulate_assets(
    adapter: &FileConfigAdapter,
    output: Option<&PathBuf>,
    seed: Option<u64>,
) -> Result<PathBuf, PortsimError> {
    validate_simulation_config(adapter)?;
    let simulation = build_simulation_config(adapter)?;
    let prices = price_adapter(adapter)?.load_prices()?;
    let mut rng = make_rng(resolve_seed(adapter, seed)?);

    let mut pipeline = Pipeline::new();
    let paths = pipeline.simulate(&prices, &simulation, &mut rng)?;
    if paths.is_empty() {
        return Err(PortsimError::NoSimulatedAssets);
    }
    eprintln!(
        "Simulated {} of {} assets",
        paths.len(),
        prices.assets().len()
    );
    CsvReportAdapter::new(resolve_output_dir(adapter, output)).write_asset_paths(paths)
}
