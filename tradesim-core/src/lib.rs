//! TradeSim Core — candle-by-candle replay of a staged-exit trading strategy.
//!
//! This crate contains the trade simulation engine:
//! - Domain types (candles, simulation events, results)
//! - Strategy configuration with a documented default table
//! - Entry resolution (initial-drop, trailing rebound, first open)
//! - Per-candle state machine with staged profit legs, ratcheting stops and re-entries
//! - Sequential resolver for same-candle stop/target collisions
//! - Cost model, result assembly, parallel batch runs and run fingerprints
//!
//! ```
//! use tradesim_core::components::Collaborators;
//! use tradesim_core::config::{SimulationConfig, StrategyLeg};
//! use tradesim_core::domain::Candle;
//! use tradesim_core::engine::simulate;
//!
//! let candles = [
//!     Candle::new(0, 1.0, 1.01, 0.99, 1.0),
//!     Candle::new(60, 1.0, 1.5, 0.99, 1.5),
//! ];
//! let config = SimulationConfig::new(vec![StrategyLeg::new(1.5, 1.0)]);
//! let result = simulate(&candles, &[], &config, Collaborators::none());
//! assert!((result.final_pnl - 1.5).abs() < 1e-9);
//! ```

pub mod components;
pub mod config;
pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod position_management;

pub use components::Collaborators;
pub use config::SimulationConfig;
pub use domain::{Candle, SimulationEvent, SimulationResult};
pub use engine::{simulate, simulate_batch};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed across threads by batch runs is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Candle>();
        require_sync::<domain::Candle>();
        require_send::<domain::SimulationEvent>();
        require_sync::<domain::SimulationEvent>();
        require_send::<domain::SimulationResult>();
        require_sync::<domain::SimulationResult>();

        // Config
        require_send::<config::SimulationConfig>();
        require_sync::<config::SimulationConfig>();

        // Collaborator seams
        require_send::<components::IndicatorSnapshot>();
        require_sync::<components::IndicatorSnapshot>();
        require_send::<components::SubCandlePath>();
        require_sync::<components::SubCandlePath>();
        require_send::<components::Collaborators<'static>>();
        require_sync::<components::Collaborators<'static>>();

        // Engine state
        require_send::<engine::TradeState>();
        require_sync::<engine::TradeState>();
        require_send::<engine::BatchRunner<'static>>();
        require_sync::<engine::BatchRunner<'static>>();

        // Fingerprints
        require_send::<fingerprint::RunFingerprint>();
        require_sync::<fingerprint::RunFingerprint>();
    }

    /// Architecture contract: signal evaluators never see trade state.
    ///
    /// `evaluate()` takes an expression and a market-data context only. Adding
    /// position or PnL to the signature breaks this check.
    #[test]
    fn signal_evaluator_has_no_trade_state_parameter() {
        fn _check_trait_object_builds(
            evaluator: &dyn components::SignalEvaluator,
            expression: &components::SignalExpression,
            context: &components::SignalContext<'_>,
        ) -> bool {
            evaluator.evaluate(expression, context)
        }
    }

    /// Architecture contract: path providers answer per candle, without trade state.
    #[test]
    fn path_provider_has_no_trade_state_parameter() {
        fn _check_trait_object_builds(
            provider: &dyn components::IntraCandlePath,
            candle: &domain::Candle,
        ) -> Result<Option<components::Breach>, components::PathError> {
            provider.first_breach(0.9, 1.1, candle)
        }
    }
}
