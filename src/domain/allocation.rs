//! Asset-class allocation targets and the eligible asset universe.
//!
//! Both mappings keep the order in which classes and assets were first seen,
//! so generated tables have stable column order across runs.

use crate::domain::error::PortsimError;
use std::collections::HashSet;

/// Target percentage (0-100) per asset class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationTarget {
    targets: Vec<(String, f64)>,
}

impl AllocationTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target for `class`, replacing any previous value.
    pub fn set(&mut self, class: &str, percent: f64) {
        match self.targets.iter_mut().find(|(c, _)| c == class) {
            Some(entry) => entry.1 = percent,
            None => self.targets.push((class.to_string(), percent)),
        }
    }

    pub fn with(mut self, class: &str, percent: f64) -> Self {
        self.set(class, percent);
        self
    }

    pub fn get(&self, class: &str) -> Option<f64> {
        self.targets
            .iter()
            .find(|(c, _)| c == class)
            .map(|&(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.targets.iter().map(|(c, p)| (c.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Sum of all class percentages. Not required to be 100.
    pub fn total_percent(&self) -> f64 {
        self.targets.iter().map(|(_, p)| p).sum()
    }
}

/// Eligible asset identifiers per asset class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetUniverse {
    classes: Vec<(String, Vec<String>)>,
}

impl AssetUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `asset` to `class`, creating the class on first use.
    pub fn add(&mut self, class: &str, asset: &str) {
        match self.classes.iter_mut().find(|(c, _)| c == class) {
            Some((_, assets)) => assets.push(asset.to_string()),
            None => self
                .classes
                .push((class.to_string(), vec![asset.to_string()])),
        }
    }

    /// Replace the asset list of `class`. An empty list keeps the class with no assets.
    pub fn with_class(mut self, class: &str, assets: &[&str]) -> Self {
        let assets: Vec<String> = assets.iter().map(|a| a.to_string()).collect();
        match self.classes.iter_mut().find(|(c, _)| c == class) {
            Some(entry) => entry.1 = assets,
            None => self.classes.push((class.to_string(), assets)),
        }
        self
    }

    /// Eligible assets for `class`; empty if the class is unknown.
    pub fn assets_in(&self, class: &str) -> &[String] {
        self.classes
            .iter()
            .find(|(c, _)| c == class)
            .map(|(_, a)| a.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.classes.iter().map(|(c, a)| (c.as_str(), a.as_slice()))
    }

    /// Union of all asset identifiers, in order of first appearance.
    pub fn all_assets(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.classes
            .iter()
            .flat_map(|(_, assets)| assets.iter())
            .filter(|a| seen.insert(a.as_str()))
            .cloned()
            .collect()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Reject assets listed twice, within a class or across classes.
    pub fn validate(&self) -> Result<(), PortsimError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (class, assets) in &self.classes {
            for asset in assets {
                if !seen.insert(asset.as_str()) {
                    return Err(PortsimError::invalid(
                        "assets",
                        class,
                        format!("asset {} is listed more than once", asset),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Parse an inline allocation such as `"Stocks=60, Bonds=40"`.
pub fn parse_allocation(input: &str) -> Result<AllocationTarget, PortsimError> {
    let mut target = AllocationTarget::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(PortsimError::invalid(
                "allocation",
                "targets",
                "empty token in allocation list",
            ));
        }
        let (class, value) = token.split_once('=').ok_or_else(|| {
            PortsimError::invalid(
                "allocation",
                "targets",
                format!("expected CLASS=PERCENT, got {}", token),
            )
        })?;
        let class = class.trim();
        if class.is_empty() {
            return Err(PortsimError::invalid(
                "allocation",
                "targets",
                format!("missing class name in {}", token),
            ));
        }
        if target.get(class).is_some() {
            return Err(PortsimError::invalid(
                "allocation",
                "targets",
                format!("duplicate class: {}", class),
            ));
        }
        let percent: f64 = value.trim().parse().map_err(|_| {
            PortsimError::invalid(
                "allocation",
                "targets",
                format!("invalid percentage for {}: {}", class, value.trim()),
            )
        })?;
        if !(0.0..=100.0).contains(&percent) {
            return Err(PortsimError::invalid(
                "allocation",
                "targets",
                format!("percentage for {} must be between 0 and 100", class),
            ));
        }
        target.set(class, percent);
    }
    Ok(target)
}
