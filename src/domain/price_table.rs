//! Time-indexed price table and log-return derivation.

use crate::domain::error::PortsimError;
use chrono::NaiveDate;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};

/// Historical prices, one column per asset identifier, one row per date.
///
/// Dates are strictly increasing. Individual cells may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table from column-major data. Dates must already be strictly increasing.
    pub fn new(
        dates: Vec<NaiveDate>,
        assets: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, PortsimError> {
        if assets.len() != columns.len() {
            return Err(PortsimError::Data {
                source_name: "price table".into(),
                reason: format!("{} assets but {} columns", assets.len(), columns.len()),
            });
        }
        if let Some((asset, col)) = assets
            .iter()
            .zip(&columns)
            .find(|(_, col)| col.len() != dates.len())
        {
            return Err(PortsimError::Data {
                source_name: "price table".into(),
                reason: format!(
                    "column {} has {} values for {} dates",
                    asset,
                    col.len(),
                    dates.len()
                ),
            });
        }
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(PortsimError::Data {
                source_name: "price table".into(),
                reason: format!("dates not strictly increasing at {}", w[1]),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = assets.iter().find(|a| !seen.insert(a.as_str())) {
            return Err(PortsimError::Data {
                source_name: "price table".into(),
                reason: format!("duplicate asset column {}", dup),
            });
        }
        Ok(Self {
            dates,
            assets,
            columns,
        })
    }

    /// Build a table from unordered rows. Rows are sorted by date; when a date
    /// repeats, the first observation wins.
    pub fn from_rows(
        assets: Vec<String>,
        rows: Vec<(NaiveDate, Vec<Option<f64>>)>,
    ) -> Result<Self, PortsimError> {
        let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
        for (date, values) in rows {
            if values.len() != assets.len() {
                return Err(PortsimError::Data {
                    source_name: "price table".into(),
                    reason: format!(
                        "row {} has {} values for {} assets",
                        date,
                        values.len(),
                        assets.len()
                    ),
                });
            }
            by_date.entry(date).or_insert(values);
        }

        let dates: Vec<NaiveDate> = by_date.keys().copied().collect();
        let mut columns = vec![Vec::with_capacity(dates.len()); assets.len()];
        for values in by_date.into_values() {
            for (col, value) in columns.iter_mut().zip(values) {
                col.push(value);
            }
        }
        Self::new(dates, assets, columns)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, asset: &str) -> Option<&[Option<f64>]> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.columns[i].as_slice())
    }

    /// Iterate `(asset, column)` pairs in column order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Keep only the columns named in `keep`, in table order.
    pub fn restrict_to(&self, keep: &[String]) -> PriceTable {
        let wanted: HashSet<&str> = keep.iter().map(String::as_str).collect();
        let (assets, columns): (Vec<String>, Vec<Vec<Option<f64>>>) = self
            .assets
            .iter()
            .zip(&self.columns)
            .filter(|(a, _)| wanted.contains(a.as_str()))
            .map(|(a, c)| (a.clone(), c.clone()))
            .unzip();
        PriceTable {
            dates: self.dates.clone(),
            assets,
            columns,
        }
    }

    /// Content hash used to key memoized simulations.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.dates.hash(&mut hasher);
        self.assets.hash(&mut hasher);
        for col in &self.columns {
            for value in col {
                value.map(f64::to_bits).hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

/// `ln(p[t] / p[t-1])` for consecutive observations.
///
/// The first value, and any value involving a missing or non-positive price,
/// is undefined and dropped.
pub fn log_returns(prices: &[Option<f64>]) -> Vec<f64> {
    prices
        .windows(2)
        .filter_map(|w| match (w[0], w[1]) {
            (Some(prev), Some(curr)) if prev > 0.0 && curr > 0.0 => Some((curr / prev).ln()),
            _ => None,
        })
        .filter(|r| r.is_finite())
        .collect()
}
