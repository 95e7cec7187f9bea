//! Cost model — converts fee/slippage basis points into price multipliers.
//!
//! The entry multiplier inflates the cost basis (entry slippage + taker fee).
//! The exit multiplier deflates proceeds (exit slippage + taker fee).
//! Each bps input is clamped to `[0, 10_000]` before conversion, so both
//! multipliers are always finite and non-negative.

use crate::config::CostConfig;

/// Largest meaningful basis-point value (100%).
pub const MAX_BPS: f64 = 10_000.0;

/// Price multipliers derived from a `CostConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    /// Applied to the entry price: `>= 1.0`.
    pub entry_multiplier: f64,
    /// Applied to every exit price: in `[0.0, 1.0]`.
    pub exit_multiplier: f64,
}

impl CostModel {
    pub fn from_config(config: &CostConfig) -> Self {
        let fee = clamp_bps(config.taker_fee_bps);
        let entry_bps = clamp_bps(config.entry_slippage_bps) + fee;
        let exit_bps = clamp_bps(config.exit_slippage_bps) + fee;
        Self {
            entry_multiplier: 1.0 + entry_bps / MAX_BPS,
            exit_multiplier: (1.0 - exit_bps / MAX_BPS).max(0.0),
        }
    }

    pub fn frictionless() -> Self {
        Self {
            entry_multiplier: 1.0,
            exit_multiplier: 1.0,
        }
    }

    /// Cost-adjusted basis for an entry at `price`.
    pub fn entry_basis(&self, price: f64) -> f64 {
        price * self.entry_multiplier
    }

    /// Net proceeds per unit for an exit at `price`.
    pub fn exit_proceeds(&self, price: f64) -> f64 {
        price * self.exit_multiplier
    }
}

impl Default for CostModel {
    fn default() -> Self {
        Self::frictionless()
    }
}

/// Clamp a basis-point input to `[0, MAX_BPS]`. NaN becomes zero.
fn clamp_bps(bps: f64) -> f64 {
    if bps.is_nan() {
        return 0.0;
    }
    bps.clamp(0.0, MAX_BPS)
}
