//! CSV allocation table and asset list adapter.
//!
//! Allocation table: `regime,strategy,<class>,<class>,...`, one row of
//! percentages per (regime, strategy) pair.
//! Asset list: `class,asset`, one row per eligible asset.

use crate::domain::allocation::{AllocationTarget, AssetUniverse};
use crate::domain::error::PortsimError;
use crate::ports::allocation_port::AllocationPort;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAllocationAdapter {
    allocation_path: Option<PathBuf>,
    assets_path: PathBuf,
}

impl CsvAllocationAdapter {
    pub fn new(allocation_path: Option<PathBuf>, assets_path: PathBuf) -> Self {
        Self {
            allocation_path,
            assets_path,
        }
    }

    pub fn parse_allocation_table(
        content: &str,
        source: &str,
        regime: &str,
        strategy: &str,
    ) -> Result<AllocationTarget, PortsimError> {
        let data_err = |reason: String| PortsimError::Data {
            source_name: source.to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers()?.clone();
        if headers.len() < 3
            || !headers[0].eq_ignore_ascii_case("regime")
            || !headers[1].eq_ignore_ascii_case("strategy")
        {
            return Err(data_err(
                "expected header regime,strategy,<class>,...".into(),
            ));
        }

        for result in rdr.records() {
            let record = result?;
            if record.get(0) != Some(regime) || record.get(1) != Some(strategy) {
                continue;
            }
            let mut target = AllocationTarget::new();
            for (class, cell) in headers.iter().zip(record.iter()).skip(2) {
                let percent: f64 = if cell.is_empty() {
                    0.0
                } else {
                    cell.parse().map_err(|_| {
                        data_err(format!("invalid percentage {:?} for {}", cell, class))
                    })?
                };
                if !(0.0..=100.0).contains(&percent) {
                    return Err(data_err(format!(
                        "percentage for {} must be between 0 and 100, got {}",
                        class, percent
                    )));
                }
                target.set(class, percent);
            }
            return Ok(target);
        }

        Err(PortsimError::invalid(
            "allocation",
            "regime",
            format!(
                "no allocation for regime {} and strategy {} in {}",
                regime, strategy, source
            ),
        ))
    }

    pub fn parse_asset_list(content: &str, source: &str) -> Result<AssetUniverse, PortsimError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr.headers()?.clone();
        if headers.len() < 2
            || !headers[0].eq_ignore_ascii_case("class")
            || !headers[1].eq_ignore_ascii_case("asset")
        {
            return Err(PortsimError::Data {
                source_name: source.to_string(),
                reason: "expected header class,asset".into(),
            });
        }

        let mut universe = AssetUniverse::new();
        for result in rdr.records() {
            let record = result?;
            match (record.get(0), record.get(1)) {
                (Some(class), Some(asset)) if !class.is_empty() && !asset.is_empty() => {
                    universe.add(class, asset)
                }
                _ => {}
            }
        }
        universe.validate()?;
        Ok(universe)
    }
}

fn read(path: &Path) -> Result<String, PortsimError> {
    fs::read_to_string(path).map_err(|e| PortsimError::Data {
        source_name: path.display().to_string(),
        reason: format!("failed to read: {}", e),
    })
}

impl AllocationPort for CsvAllocationAdapter {
    fn load_allocation(
        &self,
        regime: &str,
        strategy: &str,
    ) -> Result<AllocationTarget, PortsimError> {
        let path = self
            .allocation_path
            .as_deref()
            .ok_or_else(|| PortsimError::missing("data", "allocation"))?;
        Self::parse_allocation_table(&read(path)?, &path.display().to_string(), regime, strategy)
    }

    fn load_universe(&self) -> Result<AssetUniverse, PortsimError> {
        Self::parse_asset_list(
            &read(&self.assets_path)?,
            &self.assets_path.display().to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TABLE: &str = "regime,strategy,Stocks,Bonds,Gold\n\
        Expansion,Growth,80,15,5\n\
        Expansion,Balanced,60,35,5\n\
        Recession,Balanced,30,60,\n";

    #[test]
    fn selects_matching_row() {
        let target =
            CsvAllocationAdapter::parse_allocation_table(TABLE, "t", "Expansion", "Balanced")
                .unwrap();
        assert_eq!(target.get("Stocks"), Some(60.0));
        assert_eq!(target.get("Bonds"), Some(35.0));
        assert_eq!(target.get("Gold"), Some(5.0));
    }

    #[test]
    fn empty_cell_is_zero_percent() {
        let target =
            CsvAllocationAdapter::parse_allocation_table(TABLE, "t", "Recession", "Balanced")
                .unwrap();
        assert_eq!(target.get("Gold"), Some(0.0));
    }

    #[test]
    fn unknown_selection_is_config_error() {
        let err = CsvAllocationAdapter::parse_allocation_table(TABLE, "t", "Boom", "Growth")
            .unwrap_err();
        assert!(matches!(err, PortsimError::ConfigInvalid { reason, .. } if reason.contains("Boom")));
    }

    #[test]
    fn out_of_range_percentage_is_data_error() {
        let table = "regime,strategy,Stocks\nR,S,140\n";
        let err =
            CsvAllocationAdapter::parse_allocation_table(table, "t", "R", "S").unwrap_err();
        assert!(matches!(err, PortsimError::Data { .. }));
    }

    #[test]
    fn bad_header_is_data_error() {
        let err = CsvAllocationAdapter::parse_allocation_table("a,b,c\n1,2,3\n", "t", "1", "2")
            .unwrap_err();
        assert!(matches!(err, PortsimError::Data { reason, .. } if reason.contains("header")));
    }

    #[test]
    fn asset_list_groups_by_class_in_file_order() {
        let csv = "class,asset\nStocks,SPY\nBonds,TLT\nStocks,QQQ\n,\nBonds,IEF\n";
        let universe = CsvAllocationAdapter::parse_asset_list(csv, "t").unwrap();
        assert_eq!(universe.class_count(), 2);
        assert_eq!(
            universe.assets_in("Stocks"),
            &["SPY".to_string(), "QQQ".to_string()]
        );
        assert_eq!(
            universe.assets_in("Bonds"),
            &["TLT".to_string(), "IEF".to_string()]
        );
    }

    #[test]
    fn asset_in_two_classes_is_rejected() {
        let csv = "class,asset\nStocks,GLD\nGold,GLD\n";
        let err = CsvAllocationAdapter::parse_asset_list(csv, "t").unwrap_err();
        assert!(matches!(err, PortsimError::ConfigInvalid { .. }));
    }

    #[test]
    fn load_from_files() {
        let dir = TempDir::new().unwrap();
        let alloc = dir.path().join("allocation.csv");
        let assets = dir.path().join("assets.csv");
        fs::write(&alloc, TABLE).unwrap();
        fs::write(&assets, "class,asset\nStocks,SPY\nBonds,TLT\n").unwrap();

        let adapter = CsvAllocationAdapter::new(Some(alloc), assets);
        let target = adapter.load_allocation("Expansion", "Growth").unwrap();
        assert_eq!(target.get("Stocks"), Some(80.0));
        assert_eq!(adapter.load_universe().unwrap().all_assets(), vec!["SPY", "TLT"]);
    }

    #[test]
    fn load_allocation_without_table_is_missing_config() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAllocationAdapter::new(None, dir.path().join("assets.csv"));
        let err = adapter.load_allocation("R", "S").unwrap_err();
        assert!(matches!(err, PortsimError::ConfigMissing { key, .. } if key == "allocation"));
    }
}
