//! Portfolio-level paths, return/risk scores and best-portfolio selection.

use crate::domain::error::PortsimError;
use crate::domain::sampler::PortfolioTable;
use crate::domain::simulation::AssetPaths;
use log::{info, warn};

/// Weight of total return in the composite score.
pub const TOTAL_RETURN_WEIGHT: f64 = 0.9;
/// Weight of the Sharpe-like ratio in the composite score.
pub const SHARPE_WEIGHT: f64 = 0.1;
/// Added to the volatility so a flat path does not divide by zero.
pub const VOLATILITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPortfolio {
    /// Row index in the scored [`PortfolioTable`].
    pub portfolio_id: usize,
    pub path: Vec<f64>,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub final_score: f64,
}

/// One scored row per input portfolio, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub rows: Vec<ScoredPortfolio>,
    pub best_id: usize,
}

impl ScoreTable {
    pub fn best(&self) -> &ScoredPortfolio {
        &self.rows[self.best_id]
    }

    /// Rows ordered by descending `final_score`; equal scores keep input order.
    pub fn ranked(&self) -> Vec<&ScoredPortfolio> {
        let mut ranked: Vec<&ScoredPortfolio> = self.rows.iter().collect();
        ranked.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        ranked
    }

    pub fn top(&self, n: usize) -> Vec<&ScoredPortfolio> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

/// Weighted sum of the average asset paths.
///
/// Assets without a simulated path contribute nothing. Every path in
/// `paths` is assumed to have length `horizon`.
pub fn portfolio_path(paths: &AssetPaths, assets: &[String], weights: &[f64], horizon: usize) -> Vec<f64> {
    let mut out = vec![0.0_f64; horizon];
    for (asset, &weight) in assets.iter().zip(weights) {
        if weight == 0.0 {
            continue;
        }
        if let Some(path) = paths.get(asset) {
            for (acc, v) in out.iter_mut().zip(path) {
                *acc += weight * v;
            }
        }
    }
    out
}

/// Day-over-day percentage change; the first point has no predecessor and is dropped.
pub fn pct_change(path: &[f64]) -> Vec<f64> {
    path.windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub fn total_return(path: &[f64]) -> f64 {
    match (path.first(), path.last()) {
        (Some(&first), Some(&last)) if first != 0.0 => (last - first) / first,
        _ => 0.0,
    }
}

/// `mean / (std + 1e-9)` of daily returns, with no risk-free rate and no
/// annualization. `std` is the sample standard deviation.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let std = if returns.len() > 1 {
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    } else {
        0.0
    };
    mean / (std + VOLATILITY_EPSILON)
}

pub fn final_score(total_return: f64, sharpe_ratio: f64) -> f64 {
    TOTAL_RETURN_WEIGHT * total_return + SHARPE_WEIGHT * sharpe_ratio
}

/// Score one portfolio path.
pub fn score_path(portfolio_id: usize, path: Vec<f64>) -> ScoredPortfolio {
    let returns = pct_change(&path);
    let total_return = total_return(&path);
    let sharpe_ratio = sharpe_ratio(&returns);
    ScoredPortfolio {
        portfolio_id,
        path,
        total_return,
        sharpe_ratio,
        final_score: final_score(total_return, sharpe_ratio),
    }
}

/// Score every portfolio and select the best one.
///
/// The best portfolio is the first row with the highest `final_score`.
pub fn score(paths: &AssetPaths, portfolios: &PortfolioTable) -> Result<ScoreTable, PortsimError> {
    let horizon = paths
        .values()
        .next()
        .map(Vec::len)
        .ok_or(PortsimError::NoSimulatedAssets)?;
    if portfolios.is_empty() {
        return Err(PortsimError::EmptyPortfolioTable);
    }
    if horizon < 3 {
        warn!(
            "horizon of {} points has fewer than two daily returns; volatility is taken as 0 and the Sharpe term dominates",
            horizon
        );
    }

    let rows: Vec<ScoredPortfolio> = portfolios
        .rows()
        .enumerate()
        .map(|(id, weights)| {
            score_path(
                id,
                portfolio_path(paths, portfolios.assets(), weights, horizon),
            )
        })
        .collect();

    let mut best_id = 0;
    for (i, row) in rows.iter().enumerate().skip(1) {
        if row.final_score > rows[best_id].final_score {
            best_id = i;
        }
    }

    info!(
        "scored {} portfolios, best #{} (score {:.4})",
        rows.len(),
        best_id,
        rows[best_id].final_score
    );
    Ok(ScoreTable { rows, best_id })
}
