//! Trade simulation engine — entry resolution, the candle loop and its helpers.
//!
//! Data flow for one run:
//!
//! 1. `entry`: resolve entry price, delay and the opening event
//! 2. `loop_runner`: walk the candles through the trade state machine,
//!    using `execution` (cost model, sequential resolver) and `reentry`
//! 3. `assemble`: package state and diagnostics into a `SimulationResult`
//!
//! `batch` runs many independent simulations in parallel.

pub mod assemble;
pub mod batch;
pub mod entry;
pub mod execution;
pub mod loop_runner;
pub mod reentry;
pub mod state;

pub use batch::{simulate_batch, BatchRunner, SeriesInput};
pub use entry::{resolve_entry, EntryFill, EntryResolution};
pub use execution::{resolve, CostModel, Resolution};
pub use loop_runner::simulate;
pub use reentry::{find_stop_breach, StopBreach};
pub use state::{ExitTrigger, TradeState, POSITION_EPSILON};
