//! CSV report writer.

use crate::domain::error::PortsimError;
use crate::domain::pipeline::PipelineResult;
use crate::domain::sampler::PortfolioTable;
use crate::domain::simulation::AssetPaths;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::PathBuf;

pub const SCORES_FILE: &str = "scores.csv";
pub const BEST_PORTFOLIO_FILE: &str = "best_portfolio.csv";
pub const BEST_PATH_FILE: &str = "best_path.csv";
pub const ASSET_PATHS_FILE: &str = "asset_paths.csv";
pub const PORTFOLIOS_FILE: &str = "portfolios.csv";

/// Writes one CSV file per report into `output_dir`, creating it if needed.
pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn writer(&self, name: &str) -> Result<(csv::Writer<fs::File>, PathBuf), PortsimError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);
        Ok((csv::Writer::from_path(&path)?, path))
    }
}

impl ReportPort for CsvReportAdapter {
    fn write_portfolios(&self, portfolios: &PortfolioTable) -> Result<PathBuf, PortsimError> {
        let (mut wtr, path) = self.writer(PORTFOLIOS_FILE)?;
        let mut header = vec!["portfolio_id".to_string()];
        header.extend(portfolios.assets().iter().cloned());
        wtr.write_record(&header)?;
        for (id, row) in portfolios.rows().enumerate() {
            let mut record = vec![id.to_string()];
            record.extend(row.iter().map(|w| w.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(path)
    }

    fn write_asset_paths(&self, paths: &AssetPaths) -> Result<PathBuf, PortsimError> {
        let (mut wtr, path) = self.writer(ASSET_PATHS_FILE)?;
        let mut header = vec!["day".to_string()];
        header.extend(paths.keys().cloned());
        wtr.write_record(&header)?;
        let horizon = paths.values().map(Vec::len).max().unwrap_or(0);
        for day in 0..horizon {
            let mut record = vec![day.to_string()];
            record.extend(
                paths
                    .values()
                    .map(|p| p.get(day).map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(path)
    }

    fn write_scores(&self, result: &PipelineResult) -> Result<Vec<PathBuf>, PortsimError> {
        let (mut wtr, scores_path) = self.writer(SCORES_FILE)?;
        wtr.write_record(["portfolio_id", "total_return", "sharpe_ratio", "final_score"])?;
        for row in &result.scores.rows {
            wtr.write_record([
                row.portfolio_id.to_string(),
                row.total_return.to_string(),
                row.sharpe_ratio.to_string(),
                row.final_score.to_string(),
            ])?;
        }
        wtr.flush()?;

        let (mut wtr, best_path) = self.writer(BEST_PORTFOLIO_FILE)?;
        wtr.write_record(["asset", "weight"])?;
        for (asset, weight) in result.best_weights() {
            wtr.write_record([asset.to_string(), weight.to_string()])?;
        }
        wtr.flush()?;

        let (mut wtr, path_path) = self.writer(BEST_PATH_FILE)?;
        wtr.write_record(["day", "value"])?;
        for (day, value) in result.scores.best().path.iter().enumerate() {
            wtr.write_record([day.to_string(), value.to_string()])?;
        }
        wtr.flush()?;

        Ok(vec![scores_path, best_path, path_path])
    }
}
