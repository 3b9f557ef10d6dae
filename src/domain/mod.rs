//! Core domain types and logic.

pub mod allocation;
pub mod cache;
pub mod config_validation;
pub mod error;
pub mod pipeline;
pub mod price_table;
pub mod sampler;
pub mod scoring;
pub mod simulation;
