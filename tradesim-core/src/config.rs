//! Serializable simulation configuration.
//!
//! Unset fields are filled from the default table in [`defaults`] when a
//! config is constructed or deserialized. The engine never merges defaults at
//! point of use.

use crate::components::signal::SignalExpression;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default table for every optional configuration field.
pub mod defaults {
    /// Initial stop distance as a signed fraction of entry price (-0.5 = 50% below).
    pub const STOP_LOSS_INITIAL: f64 = -0.5;
    /// Rolling trailing stop distance below the window peak.
    pub const TRAILING_PERCENT: f64 = 0.25;
    /// Rolling trailing stop window, in candles.
    pub const TRAILING_WINDOW_SIZE: usize = 20;
    /// Trailing entry wait window, in minutes.
    pub const MAX_WAIT_TIME_MINUTES: f64 = 60.0;
    /// Re-entries allowed per run.
    pub const MAX_RE_ENTRIES: u32 = 0;
    /// Fraction of the original position restored per re-entry.
    pub const RE_ENTRY_SIZE_PERCENT: f64 = 0.5;

    pub(super) fn stop_loss_initial() -> f64 {
        STOP_LOSS_INITIAL
    }
    pub(super) fn trailing_percent() -> f64 {
        TRAILING_PERCENT
    }
    pub(super) fn trailing_window_size() -> usize {
        TRAILING_WINDOW_SIZE
    }
    pub(super) fn max_wait_time() -> f64 {
        MAX_WAIT_TIME_MINUTES
    }
    pub(super) fn max_re_entries() -> u32 {
        MAX_RE_ENTRIES
    }
    pub(super) fn re_entry_size_percent() -> f64 {
        RE_ENTRY_SIZE_PERCENT
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
}

/// One profit-target tranche.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyLeg {
    /// Price multiple relative to entry (2.0 = +100%).
    pub target: f64,
    /// Fraction of the *remaining* position to sell when the target is hit.
    pub percent: f64,
}

impl StrategyLeg {
    pub fn new(target: f64, percent: f64) -> Self {
        Self { target, percent }
    }
}

/// Trailing behaviour of the stop-loss.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrailingStop {
    /// Stop stays where the initial offset put it.
    #[default]
    #[serde(rename = "none")]
    Disabled,
    /// Once price gains `activation` over entry, move the stop to breakeven (once).
    Breakeven { activation: f64 },
    /// Stop trails the highest high of the last `trailing_window_size` candles
    /// by `trailing_percent`, ratcheting up only.
    Rolling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLossConfig {
    /// Signed fraction of entry price (-0.2 = stop 20% below entry).
    #[serde(default = "defaults::stop_loss_initial")]
    pub initial: f64,
    #[serde(default)]
    pub trailing: TrailingStop,
    #[serde(default = "defaults::trailing_percent")]
    pub trailing_percent: f64,
    #[serde(default = "defaults::trailing_window_size")]
    pub trailing_window_size: usize,
}

impl Default for StopLossConfig {
    fn default() -> Self {
        Self {
            initial: defaults::STOP_LOSS_INITIAL,
            trailing: TrailingStop::Disabled,
            trailing_percent: defaults::TRAILING_PERCENT,
            trailing_window_size: defaults::TRAILING_WINDOW_SIZE,
        }
    }
}

impl StopLossConfig {
    /// Fixed stop at `initial` below entry, no trailing.
    pub fn fixed(initial: f64) -> Self {
        Self {
            initial,
            ..Self::default()
        }
    }

    /// Fixed stop that moves to breakeven once price gains `activation`.
    pub fn breakeven(initial: f64, activation: f64) -> Self {
        Self {
            initial,
            trailing: TrailingStop::Breakeven { activation },
            ..Self::default()
        }
    }

    /// Rolling-window trailing stop.
    pub fn rolling(initial: f64, trailing_percent: f64, trailing_window_size: usize) -> Self {
        Self {
            initial,
            trailing: TrailingStop::Rolling,
            trailing_percent,
            trailing_window_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Required move from the first open before entering (-0.1 = wait for a 10% drop).
    #[serde(default)]
    pub initial_entry: Option<f64>,
    /// Rebound fraction off the lowest low inside the wait window.
    #[serde(default)]
    pub trailing_entry: Option<f64>,
    /// Trailing entry wait window, in minutes.
    #[serde(default = "defaults::max_wait_time")]
    pub max_wait_time: f64,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            initial_entry: None,
            trailing_entry: None,
            max_wait_time: defaults::MAX_WAIT_TIME_MINUTES,
        }
    }
}

impl EntryConfig {
    pub fn initial_drop(drop: f64) -> Self {
        Self {
            initial_entry: Some(drop),
            ..Self::default()
        }
    }

    pub fn trailing(rebound: f64, max_wait_time: f64) -> Self {
        Self {
            trailing_entry: Some(rebound),
            max_wait_time,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReEntryConfig {
    /// Retrace below the exit price that arms a re-entry.
    #[serde(default)]
    pub trailing_re_entry: Option<f64>,
    #[serde(default = "defaults::max_re_entries")]
    pub max_re_entries: u32,
    /// Fraction of the original position restored per re-entry.
    #[serde(default = "defaults::re_entry_size_percent")]
    pub size_percent: f64,
}

impl Default for ReEntryConfig {
    fn default() -> Self {
        Self {
            trailing_re_entry: None,
            max_re_entries: defaults::MAX_RE_ENTRIES,
            size_percent: defaults::RE_ENTRY_SIZE_PERCENT,
        }
    }
}

impl ReEntryConfig {
    pub fn new(retrace: f64, max_re_entries: u32, size_percent: f64) -> Self {
        Self {
            trailing_re_entry: Some(retrace),
            max_re_entries,
            size_percent,
        }
    }

    /// Retrace fraction, if re-entry is enabled at all.
    pub fn retrace(&self) -> Option<f64> {
        self.trailing_re_entry.filter(|_| self.max_re_entries > 0)
    }
}

/// Execution friction in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostConfig {
    #[serde(default)]
    pub entry_slippage_bps: f64,
    #[serde(default)]
    pub exit_slippage_bps: f64,
    #[serde(default)]
    pub taker_fee_bps: f64,
    /// Carried for provenance; unlevered long simulations do not accrue borrow.
    #[serde(default)]
    pub borrow_apr_bps: f64,
}

impl CostConfig {
    pub fn frictionless() -> Self {
        Self::default()
    }

    pub fn new(entry_slippage_bps: f64, exit_slippage_bps: f64, taker_fee_bps: f64) -> Self {
        Self {
            entry_slippage_bps,
            exit_slippage_bps,
            taker_fee_bps,
            borrow_apr_bps: 0.0,
        }
    }
}

/// Complete configuration for one simulation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Profit-target legs, consumed strictly in list order.
    #[serde(default, alias = "strategy")]
    pub legs: Vec<StrategyLeg>,
    #[serde(default)]
    pub stop_loss: Option<StopLossConfig>,
    #[serde(default)]
    pub entry: Option<EntryConfig>,
    #[serde(default)]
    pub re_entry: Option<ReEntryConfig>,
    #[serde(default)]
    pub costs: CostConfig,
    /// Gates trigger-based entries when set.
    #[serde(default)]
    pub entry_signal: Option<SignalExpression>,
    /// Closes the whole position at the candle close when it evaluates true.
    #[serde(default)]
    pub exit_signal: Option<SignalExpression>,
}

impl SimulationConfig {
    pub fn new(legs: Vec<StrategyLeg>) -> Self {
        Self {
            legs,
            ..Self::default()
        }
    }

    pub fn with_stop_loss(mut self, stop_loss: StopLossConfig) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_entry(mut self, entry: EntryConfig) -> Self {
        self.entry = Some(entry);
        self
    }

    pub fn with_re_entry(mut self, re_entry: ReEntryConfig) -> Self {
        self.re_entry = Some(re_entry);
        self
    }

    pub fn with_costs(mut self, costs: CostConfig) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_entry_signal(mut self, expr: impl Into<String>) -> Self {
        self.entry_signal = Some(SignalExpression::new(expr));
        self
    }

    pub fn with_exit_signal(mut self, expr: impl Into<String>) -> Self {
        self.exit_signal = Some(SignalExpression::new(expr));
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a config file, choosing the format from the extension (`.toml` or `.json`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_unset_fields() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [[legs]]
            target = 2.0
            percent = 0.5

            [stop_loss]
            initial = -0.2

            [entry]
            trailing_entry = 0.05

            [re_entry]
            trailing_re_entry = 0.3
            "#,
        )
        .unwrap();

        let stop = config.stop_loss.unwrap();
        assert_eq!(stop.initial, -0.2);
        assert_eq!(stop.trailing, TrailingStop::Disabled);
        assert_eq!(stop.trailing_percent, defaults::TRAILING_PERCENT);
        assert_eq!(stop.trailing_window_size, defaults::TRAILING_WINDOW_SIZE);

        let entry = config.entry.unwrap();
        assert_eq!(entry.max_wait_time, defaults::MAX_WAIT_TIME_MINUTES);
        assert_eq!(entry.initial_entry, None);

        let re_entry = config.re_entry.unwrap();
        assert_eq!(re_entry.max_re_entries, defaults::MAX_RE_ENTRIES);
        assert_eq!(re_entry.size_percent, defaults::RE_ENTRY_SIZE_PERCENT);
        // max_re_entries defaults to zero, so re-entry stays off
        assert_eq!(re_entry.retrace(), None);

        assert_eq!(config.costs, CostConfig::frictionless());
        assert_eq!(config.legs, vec![StrategyLeg::new(2.0, 0.5)]);
    }

    #[test]
    fn trailing_modes_parse() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [stop_loss]
            initial = -0.3
            trailing = { mode = "breakeven", activation = 0.5 }
            "#,
        )
        .unwrap();
        assert_eq!(
            config.stop_loss.unwrap().trailing,
            TrailingStop::Breakeven { activation: 0.5 }
        );

        let config = SimulationConfig::from_json_str(
            r#"{"stop_loss":{"trailing":{"mode":"rolling"},"trailing_window_size":5}}"#,
        )
        .unwrap();
        let stop = config.stop_loss.unwrap();
        assert_eq!(stop.trailing, TrailingStop::Rolling);
        assert_eq!(stop.trailing_window_size, 5);
        assert_eq!(stop.initial, defaults::STOP_LOSS_INITIAL);
    }

    #[test]
    fn strategy_alias_for_legs() {
        let config = SimulationConfig::from_json_str(
            r#"{"strategy":[{"target":1.5,"percent":1.0}],"exit_signal":"rsi > 70"}"#,
        )
        .unwrap();
        assert_eq!(config.legs.len(), 1);
        assert_eq!(config.exit_signal.unwrap().as_str(), "rsi > 70");
    }

    #[test]
    fn load_from_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[costs]\ntaker_fee_bps = 10.0").unwrap();
        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.costs.taker_fee_bps, 10.0);

        let other = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        let err = SimulationConfig::load(other.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "yaml"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimulationConfig::load("/nonexistent/tradesim.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn config_json_roundtrip() {
        let config = SimulationConfig::new(vec![StrategyLeg::new(2.0, 0.5)])
            .with_stop_loss(StopLossConfig::rolling(-0.2, 0.1, 10))
            .with_entry(EntryConfig::initial_drop(-0.05))
            .with_re_entry(ReEntryConfig::new(0.3, 2, 0.5))
            .with_costs(CostConfig::new(5.0, 5.0, 10.0));
        let text = serde_json::to_string(&config).unwrap();
        let back = SimulationConfig::from_json_str(&text).unwrap();
        assert_eq!(config, back);
    }
}
