//! SimulationEvent — one entry in the ordered trail that produced the PnL.
//!
//! Every event carries the same header (when, at what price, how much of the
//! position is left, cumulative PnL at that instant). Kind-specific fields
//! live in the closed `EventKind` union.

use crate::components::path::ResolutionMethod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields shared by every event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    pub timestamp: i64,
    pub price: f64,
    pub description: String,
    /// Fraction of the original position still held after this event.
    pub remaining_position: f64,
    /// Cumulative realized PnL multiplier after this event.
    pub pnl: f64,
}

/// Why the position was closed by a `FinalExit` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalExitReason {
    /// Candle series ran out while a position was still held.
    EndOfData,
    /// The configured exit signal evaluated true.
    ExitSignal,
}

/// Closed set of event kinds with their variant-specific fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Position opened (or, with `filled == false`, the definitive no-trade marker).
    Entry { filled: bool, delay_minutes: f64 },
    TrailingEntryTriggered {
        lowest_price: f64,
        rebound_percent: f64,
        delay_minutes: f64,
    },
    StopMoved {
        previous_stop: Option<f64>,
        new_stop: f64,
    },
    ReEntry {
        re_entry_count: u32,
        size_percent: f64,
    },
    ReEntryRejected {
        stop_price: f64,
        breach_timestamp: i64,
        breach_low: f64,
    },
    StopLoss { resolution: ResolutionMethod },
    TargetHit {
        leg_index: usize,
        target: f64,
        percent: f64,
        resolution: ResolutionMethod,
    },
    FinalExit { reason: FinalExitReason },
}

impl EventKind {
    /// Stable snake_case name, identical to the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Entry { .. } => "entry",
            Self::TrailingEntryTriggered { .. } => "trailing_entry_triggered",
            Self::StopMoved { .. } => "stop_moved",
            Self::ReEntry { .. } => "re_entry",
            Self::ReEntryRejected { .. } => "re_entry_rejected",
            Self::StopLoss { .. } => "stop_loss",
            Self::TargetHit { .. } => "target_hit",
            Self::FinalExit { .. } => "final_exit",
        }
    }

    /// True for the kinds that open a position (exactly one per run).
    pub fn is_entry_kind(&self) -> bool {
        matches!(self, Self::Entry { .. } | Self::TrailingEntryTriggered { .. })
    }

    /// True for kinds that realize part or all of the position.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            Self::StopLoss { .. } | Self::TargetHit { .. } | Self::FinalExit { .. }
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of the simulation trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    #[serde(flatten)]
    pub header: EventHeader,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SimulationEvent {
    pub fn new(kind: EventKind, header: EventHeader) -> Self {
        Self { header, kind }
    }

    pub fn timestamp(&self) -> i64 {
        self.header.timestamp
    }

    pub fn price(&self) -> f64 {
        self.header.price
    }

    pub fn remaining_position(&self) -> f64 {
        self.header.remaining_position
    }

    pub fn pnl(&self) -> f64 {
        self.header.pnl
    }
}
