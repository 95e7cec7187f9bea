//! Execution friction and intra-candle ordering.
//!
//! - `cost_model`: fee/slippage configuration to entry/exit price multipliers
//! - `path_policy`: sequential resolver for same-candle stop/target collisions

pub mod cost_model;
pub mod path_policy;

pub use cost_model::CostModel;
pub use path_policy::{resolve, Resolution};
