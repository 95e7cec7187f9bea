//! Domain types for the trade replay engine

pub mod candle;
pub mod event;
pub mod result;

pub use candle::{minutes_between, Candle};
pub use event::{EventHeader, EventKind, FinalExitReason, SimulationEvent};
pub use result::{EntryDiagnostics, EventCounts, SimulationResult, TradeOutcome};
