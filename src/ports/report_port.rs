//! Report output port trait.

use crate::domain::error::PortsimError;
use crate::domain::pipeline::PipelineResult;
use crate::domain::sampler::PortfolioTable;
use crate::domain::simulation::AssetPaths;
use std::path::PathBuf;

/// Port for writing run results. Each method returns the location written.
pub trait ReportPort {
    fn write_portfolios(&self, portfolios: &PortfolioTable) -> Result<PathBuf, PortsimError>;

    fn write_asset_paths(&self, paths: &AssetPaths) -> Result<PathBuf, PortsimError>;

    /// Scores, best portfolio weights and best path.
    fn write_scores(&self, result: &PipelineResult) -> Result<Vec<PathBuf>, PortsimError>;

    /// Default implementation: every report of a full run.
    fn write_run(&self, result: &PipelineResult) -> Result<Vec<PathBuf>, PortsimError> {
        let mut written = self.write_scores(result)?;
        written.push(self.write_asset_paths(&result.paths)?);
        written.push(self.write_portfolios(&result.portfolios)?);
        Ok(written)
    }
}
