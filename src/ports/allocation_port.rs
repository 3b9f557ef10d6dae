//! Allocation target and asset universe port trait.

use crate::domain::allocation::{AllocationTarget, AssetUniverse};
use crate::domain::error::PortsimError;

pub trait AllocationPort {
    /// The class targets recommended for a regime and strategy.
    fn load_allocation(&self, regime: &str, strategy: &str)
        -> Result<AllocationTarget, PortsimError>;

    fn load_universe(&self) -> Result<AssetUniverse, PortsimError>;
}
