//! Stop-loss level management.
//!
//! **Ratchet invariant**: between resets, a stop may only rise (long positions).
//!
//! **Module Structure:**
//! - `ratchet`: Ratchet state enforcement
//! - `rolling`: Highest high over a sliding candle window
pub mod ratchet;
pub mod rolling;

pub use ratchet::RatchetState;
pub use rolling::RollingPeak;
