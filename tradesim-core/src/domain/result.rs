//! SimulationResult — the value handed to downstream result sinks.

use serde::{Deserialize, Serialize};

use super::event::SimulationEvent;

/// How the run ended, derived from its terminating event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeOutcome {
    /// No position was ever opened (empty series, entry never reached, bad entry price).
    NoTrade,
    StoppedOut,
    /// Profit legs liquidated the whole position.
    TargetsCompleted,
    ExitSignal,
    EndOfData,
    ReEntryRejected,
}

/// Per-kind event counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCounts {
    pub entries: usize,
    pub stop_moves: usize,
    pub re_entries: usize,
    pub re_entry_rejections: usize,
    pub stop_losses: usize,
    pub targets_hit: usize,
    pub final_exits: usize,
}

/// Entry-timing diagnostics: how good was the entry relative to what followed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryDiagnostics {
    /// Lowest low from the entry candle through the last processed candle.
    pub lowest_price: f64,
    pub lowest_price_timestamp: i64,
    /// `(lowest_price - entry_price) / entry_price * 100`.
    pub lowest_vs_entry_percent: f64,
    /// Minutes from entry to the lowest low.
    pub time_from_entry_minutes: f64,
    pub used_trailing_entry: bool,
    pub actual_entry_price: f64,
    /// Minutes from the first candle to the entry candle.
    pub entry_delay_minutes: f64,
}

/// Complete output of one simulation run.
///
/// Plain data only; every numeric field is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Position-value multiplier (1.0 = cost-neutral round trip).
    pub final_pnl: f64,
    pub events: Vec<SimulationEvent>,
    pub entry_price: f64,
    pub final_price: f64,
    pub total_candles: usize,
    pub entry_optimization: EntryDiagnostics,
    pub outcome: TradeOutcome,
    pub event_counts: EventCounts,
}

impl SimulationResult {
    /// Result for an empty candle series.
    pub fn empty() -> Self {
        Self {
            final_pnl: 0.0,
            events: Vec::new(),
            entry_price: 0.0,
            final_price: 0.0,
            total_candles: 0,
            entry_optimization: EntryDiagnostics::default(),
            outcome: TradeOutcome::NoTrade,
            event_counts: EventCounts::default(),
        }
    }

    /// Return relative to a cost-neutral round trip (`final_pnl - 1.0`), `0.0` for no trade.
    pub fn return_pct(&self) -> f64 {
        match self.outcome {
            TradeOutcome::NoTrade => 0.0,
            _ => self.final_pnl - 1.0,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.return_pct() > 0.0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
