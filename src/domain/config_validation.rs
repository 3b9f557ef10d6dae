//! Configuration validation.
//!
//! Validates all config fields before a run draws any random numbers.

use crate::domain::allocation::parse_allocation;
use crate::domain::error::PortsimError;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    validate_data_config(config)?;
    validate_allocation_config(config)?;
    validate_portfolio_config(config)?;
    validate_simulation_config(config)?;
    validate_report_config(config)?;
    Ok(())
}

/// `[data]`: price and asset files are required; the allocation table only
/// when no inline `targets` are configured.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    config.require_string("data", "prices")?;
    config.require_string("data", "assets")?;
    if !has_inline_targets(config) {
        config.require_string("data", "allocation")?;
    }
    Ok(())
}

pub fn validate_allocation_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    if let Some(targets) = config.get_string("allocation", "targets") {
        if !targets.trim().is_empty() {
            parse_allocation(&targets)?;
            return Ok(());
        }
    }
    config.require_string("allocation", "regime")?;
    config.require_string("allocation", "strategy")?;
    Ok(())
}

pub fn validate_portfolio_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    validate_num_portfolios(config)?;
    validate_weight_bounds(config)?;
    parse_flag(config, "portfolios", "strict")?;
    Ok(())
}

pub fn validate_simulation_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    for key in ["num_simulations", "num_days"] {
        if let Some(value) = parse_value::<i64>(config, "simulation", key)? {
            if value < 1 {
                return Err(PortsimError::invalid(
                    "simulation",
                    key,
                    format!("{} must be at least 1", key),
                ));
            }
        }
    }
    parse_value::<u64>(config, "simulation", "seed")?;
    Ok(())
}

pub fn validate_report_config(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    if let Some(top) = parse_value::<i64>(config, "report", "top")? {
        if top < 1 {
            return Err(PortsimError::invalid(
                "report",
                "top",
                "top must be at least 1",
            ));
        }
    }
    Ok(())
}

pub(crate) fn has_inline_targets(config: &dyn ConfigPort) -> bool {
    config
        .get_string("allocation", "targets")
        .is_some_and(|t| !t.trim().is_empty())
}

/// Parse an optional numeric key, rejecting values that are present but malformed.
pub(crate) fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, PortsimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            PortsimError::invalid(section, key, format!("invalid number: {}", raw.trim()))
        }),
    }
}

/// Parse an optional boolean key. Accepts `true/false`, `yes/no`, `on/off`
/// and `1/0`; anything else present is rejected.
pub(crate) fn parse_flag(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<bool>, PortsimError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(None),
        "true" | "yes" | "on" | "1" => Ok(Some(true)),
        "false" | "no" | "off" | "0" => Ok(Some(false)),
        other => Err(PortsimError::invalid(
            section,
            key,
            format!("expected a boolean, got {}", other),
        )),
    }
}

fn validate_num_portfolios(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    if let Some(value) = parse_value::<i64>(config, "portfolios", "num_portfolios")? {
        if value < 1 {
            return Err(PortsimError::invalid(
                "portfolios",
                "num_portfolios",
                "num_portfolios must be at least 1",
            ));
        }
    }
    Ok(())
}

fn validate_weight_bounds(config: &dyn ConfigPort) -> Result<(), PortsimError> {
    let min_weight = parse_value::<f64>(config, "portfolios", "min_weight")?
        .unwrap_or(crate::domain::sampler::DEFAULT_MIN_WEIGHT);
    let max_weight = parse_value::<f64>(config, "portfolios", "max_weight")?
        .unwrap_or(crate::domain::sampler::DEFAULT_MAX_WEIGHT);

    if !(min_weight > 0.0) {
        return Err(PortsimError::invalid(
            "portfolios",
            "min_weight",
            "min_weight must be positive",
        ));
    }
    if !(max_weight <= 1.0) {
        return Err(PortsimError::invalid(
            "portfolios",
            "max_weight",
            "max_weight must not exceed 1",
        ));
    }
    if min_weight >= max_weight {
        return Err(PortsimError::invalid(
            "portfolios",
            "min_weight",
            "min_weight must be below max_weight",
        ));
    }
    Ok(())
}
