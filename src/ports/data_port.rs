//! Price data port trait.

use crate::domain::error::PortsimError;
use crate::domain::price_table::PriceTable;

pub trait PriceDataPort {
    /// Load the full historical price table, one column per asset.
    fn load_prices(&self) -> Result<PriceTable, PortsimError>;
}
