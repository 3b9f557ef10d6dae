//! CSV price table adapter.
//!
//! Reads a wide table: a `date` column followed by one column per asset.

use crate::domain::error::PortsimError;
use crate::domain::price_table::PriceTable;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use log::{debug, warn};
use std::fs;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Parse CSV text into a [`PriceTable`]. `source` names the input in errors.
    pub fn parse(content: &str, source: &str) -> Result<PriceTable, PortsimError> {
        let data_err = |reason: String| PortsimError::Data {
            source_name: source.to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr.headers()?.clone();
        match headers.get(0) {
            Some(h) if h.eq_ignore_ascii_case("date") => {}
            _ => return Err(data_err("first column must be 'date'".into())),
        }
        let assets: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        if let Some(blank) = assets.iter().position(|a| a.is_empty()) {
            return Err(data_err(format!("column {} has no asset name", blank + 2)));
        }

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let date_str = record
                .get(0)
                .ok_or_else(|| data_err("missing date column".into()))?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                data_err(format!("invalid date {:?} on row {}: {}", date_str, line + 1, e))
            })?;

            let mut values = Vec::with_capacity(assets.len());
            for (i, asset) in assets.iter().enumerate() {
                let cell = record.get(i + 1).unwrap_or("");
                values.push(parse_price(cell).map_err(|_| {
                    data_err(format!("invalid price {:?} for {} on {}", cell, asset, date))
                })?);
            }
            rows.push((date, values));
        }

        let observed = rows.len();
        let table = PriceTable::from_rows(assets, rows)?;
        if table.len() < observed {
            warn!(
                "{}: dropped {} duplicate dates (first observation kept)",
                source,
                observed - table.len()
            );
        }
        debug!(
            "{}: {} dates x {} assets",
            source,
            table.len(),
            table.assets().len()
        );
        Ok(table)
    }
}

/// Empty cells and non-finite numbers are missing observations.
fn parse_price(cell: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    if cell.is_empty() {
        return Ok(None);
    }
    let value: f64 = cell.parse()?;
    Ok(value.is_finite().then_some(value))
}

impl PriceDataPort for CsvPriceAdapter {
    fn load_prices(&self) -> Result<PriceTable, PortsimError> {
        let content = fs::read_to_string(&self.path).map_err(|e| PortsimError::Data {
            source_name: self.path.display().to_string(),
            reason: format!("failed to read: {}", e),
        })?;
        Self::parse(&content, &self.path.display().to_string())
    }
}
