//! Port traits at the I/O seams of the domain.

pub mod allocation_port;
pub mod config_port;
pub mod data_port;
pub mod report_port;
