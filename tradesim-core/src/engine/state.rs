//! Per-run mutable trade state.
//!
//! Created fresh by `simulate`, mutated only on its single control path, and
//! consumed by the result assembler. Nothing here outlives one call.

use crate::config::{ReEntryConfig, StopLossConfig, TrailingStop};
use crate::domain::{Candle, EventHeader, EventKind, SimulationEvent};
use crate::engine::execution::CostModel;
use crate::position_management::{RatchetState, RollingPeak};

/// Positions smaller than this are treated as fully closed.
pub const POSITION_EPSILON: f64 = 1e-9;

/// A re-entry waiting for price to retrace to `trigger_price`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmedReEntry {
    pub trigger_price: f64,
    /// Stop level the retrace must not have breached; `None` after a stop-out.
    pub stop_in_force: Option<f64>,
}

/// Which threshold produced the exit that arms a re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    StopLoss,
    Target,
}

/// Mutable state threaded through the candle loop by exclusive reference.
#[derive(Debug, Clone)]
pub struct TradeState {
    pub entry_price: f64,
    pub entry_index: usize,
    pub entry_timestamp: i64,
    /// `entry_price * entry_multiplier`, the PnL denominator. Always > 0.
    pub entry_basis: f64,
    pub cost: CostModel,
    /// Fraction of the original position still held, in `[0, 1]`.
    pub remaining: f64,
    pub realized_pnl: f64,
    pub stop: RatchetState,
    pub breakeven_moved: bool,
    pub rolling: RollingPeak,
    pub peak_price: f64,
    /// Next profit leg to watch; only ever increases.
    pub target_index: usize,
    pub armed_re_entry: Option<ArmedReEntry>,
    pub re_entry_count: u32,
    pub last_exit_index: Option<usize>,
    pub last_exit_price: Option<f64>,
    /// Most recent finite price seen, substituted for non-finite candle prices.
    pub last_price: f64,
    pub lowest_price: f64,
    pub lowest_timestamp: i64,
    pub events: Vec<SimulationEvent>,
}

impl TradeState {
    pub fn new(
        entry_price: f64,
        entry_index: usize,
        entry_timestamp: i64,
        cost: CostModel,
        stop_loss: Option<&StopLossConfig>,
    ) -> Self {
        let stop = match stop_loss {
            Some(cfg) => RatchetState::with_initial_level(entry_price * (1.0 + cfg.initial)),
            None => RatchetState::new(),
        };
        let window = match stop_loss {
            Some(cfg) if cfg.trailing == TrailingStop::Rolling => cfg.trailing_window_size,
            _ => 0,
        };
        Self {
            entry_price,
            entry_index,
            entry_timestamp,
            entry_basis: cost.entry_basis(entry_price),
            cost,
            remaining: 1.0,
            realized_pnl: 0.0,
            stop,
            breakeven_moved: false,
            rolling: RollingPeak::new(window),
            peak_price: entry_price,
            target_index: 0,
            armed_re_entry: None,
            re_entry_count: 0,
            last_exit_index: None,
            last_exit_price: None,
            last_price: entry_price,
            lowest_price: entry_price,
            lowest_timestamp: entry_timestamp,
            events: Vec::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.remaining <= POSITION_EPSILON
    }

    pub fn stop_level(&self) -> Option<f64> {
        self.stop.current_level()
    }

    /// Track the lowest low and the last finite price for candle `candle`.
    pub fn observe(&mut self, candle: &Candle) {
        if candle.low.is_finite() && candle.low < self.lowest_price {
            self.lowest_price = candle.low;
            self.lowest_timestamp = candle.timestamp;
        }
        if candle.high.is_finite() && candle.high > self.peak_price {
            self.peak_price = candle.high;
        }
        if candle.close.is_finite() {
            self.last_price = candle.close;
        }
    }

    /// Like [`observe`](Self::observe) but leaves the peak alone.
    ///
    /// Used for the fill candle of a delayed entry, whose high may precede the fill.
    pub fn observe_fill_candle(&mut self, candle: &Candle) {
        let peak = self.peak_price;
        self.observe(candle);
        self.peak_price = peak;
    }

    /// `price` if finite, else the last finite price seen.
    pub fn sanitize_price(&self, price: f64) -> f64 {
        if price.is_finite() {
            price
        } else {
            tracing::warn!(price, fallback = self.last_price, "non-finite price substituted");
            self.last_price
        }
    }

    /// Realize `fraction` of the original position at `price`, net of exit costs.
    ///
    /// Returns the fraction actually sold (capped at what is still held).
    pub fn realize(&mut self, fraction: f64, price: f64, index: usize) -> f64 {
        let sold = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, self.remaining)
        };
        let contribution = sold * self.cost.exit_proceeds(price) / self.entry_basis;
        if contribution.is_finite() {
            self.realized_pnl += contribution;
        } else {
            tracing::warn!(sold, price, "non-finite PnL contribution dropped");
        }
        self.remaining -= sold;
        if self.remaining < POSITION_EPSILON {
            self.remaining = 0.0;
        }
        self.last_exit_index = Some(index);
        self.last_exit_price = Some(price);
        sold
    }

    /// Arm a re-entry after an exit at `exit_price`, if configured and under the cap.
    ///
    /// After a target exit the ratchet level stays in force even when the book
    /// is flat. A stop-out has already consumed its stop, so none is carried.
    /// Returns `true` when armed.
    pub fn arm_re_entry(
        &mut self,
        re_entry: Option<&ReEntryConfig>,
        exit_price: f64,
        trigger: ExitTrigger,
    ) -> bool {
        let Some(retrace) = re_entry.and_then(|cfg| {
            cfg.retrace()
                .filter(|r| r.is_finite() && self.re_entry_count < cfg.max_re_entries)
        }) else {
            return false;
        };
        let trigger_price = exit_price * (1.0 - retrace);
        if !trigger_price.is_finite() {
            return false;
        }
        let stop_in_force = match trigger {
            ExitTrigger::StopLoss => None,
            ExitTrigger::Target => self.stop_level(),
        };
        self.armed_re_entry = Some(ArmedReEntry {
            trigger_price,
            stop_in_force,
        });
        true
    }

    /// Restore `size_percent` of the original position at `price` (total capped at 1.0).
    ///
    /// Resets the stop from the re-entry price and restarts peak tracking.
    pub fn re_enter(&mut self, price: f64, size_percent: f64, stop_loss: Option<&StopLossConfig>) {
        let added = if size_percent.is_nan() {
            0.0
        } else {
            size_percent.clamp(0.0, 1.0)
        };
        self.remaining = (self.remaining + added).min(1.0);
        self.re_entry_count += 1;
        self.armed_re_entry = None;
        if let Some(cfg) = stop_loss {
            self.stop.reset(price * (1.0 + cfg.initial));
        }
        self.peak_price = price;
        self.rolling.clear();
    }

    /// Append an event stamped with the current position and cumulative PnL.
    pub fn record(&mut self, kind: EventKind, timestamp: i64, price: f64, description: String) {
        tracing::debug!(
            event = kind.name(),
            timestamp,
            price,
            remaining = self.remaining,
            pnl = self.realized_pnl,
            "{description}"
        );
        let header = EventHeader {
            timestamp,
            price,
            description,
            remaining_position: self.remaining,
            pnl: self.realized_pnl,
        };
        self.events.push(SimulationEvent::new(kind, header));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CostConfig, StopLossConfig};

    fn state(stop: Option<StopLossConfig>) -> TradeState {
        TradeState::new(100.0, 0, 0, CostModel::frictionless(), stop.as_ref())
    }

    #[test]
    fn initial_stop_from_entry() {
        let s = state(Some(StopLossConfig::fixed(-0.2)));
        assert_eq!(s.stop_level(), Some(80.0));
        assert_eq!(s.remaining, 1.0);
        assert!(state(None).stop_level().is_none());
    }

    #[test]
    fn realize_accumulates_ratio() {
        let mut s = state(None);
        let sold = s.realize(0.5, 150.0, 3);
        assert_eq!(sold, 0.5);
        assert!((s.realized_pnl - 0.75).abs() < 1e-12);
        assert_eq!(s.remaining, 0.5);
        // over-selling is capped at what is held
        let sold = s.realize(2.0, 100.0, 4);
        assert_eq!(sold, 0.5);
        assert!(s.is_flat());
        assert!((s.realized_pnl - 1.25).abs() < 1e-12);
        assert_eq!(s.last_exit_index, Some(4));
    }

    #[test]
    fn realize_applies_cost_multipliers() {
        let cost = CostModel::from_config(&CostConfig::new(0.0, 0.0, 100.0)); // 1% fee each side
        let mut s = TradeState::new(100.0, 0, 0, cost, None);
        s.realize(1.0, 100.0, 1);
        assert!((s.realized_pnl - 0.99 / 1.01).abs() < 1e-12);
    }

    #[test]
    fn re_enter_caps_position_and_resets_stop() {
        let mut s = state(Some(StopLossConfig::fixed(-0.1)));
        s.realize(0.8, 120.0, 2);
        s.re_enter(110.0, 0.5, Some(&StopLossConfig::fixed(-0.1)));
        assert!((s.remaining - 0.7).abs() < 1e-12);
        assert!((s.stop_level().unwrap() - 99.0).abs() < 1e-9);
        s.re_enter(110.0, 0.5, None);
        assert_eq!(s.remaining, 1.0);
        assert_eq!(s.re_entry_count, 2);
    }

    #[test]
    fn arm_respects_cap_and_captures_live_stop() {
        let cfg = ReEntryConfig::new(0.3, 1, 0.5);
        let mut s = state(Some(StopLossConfig::fixed(-0.1)));
        s.realize(0.5, 200.0, 1);
        assert!(s.arm_re_entry(Some(&cfg), 200.0, ExitTrigger::Target));
        let armed = s.armed_re_entry.unwrap();
        assert!((armed.trigger_price - 140.0).abs() < 1e-9);
        assert_eq!(armed.stop_in_force, Some(90.0));

        s.re_entry_count = 1;
        s.armed_re_entry = None;
        assert!(!s.arm_re_entry(Some(&cfg), 200.0, ExitTrigger::Target));
        assert!(!s.arm_re_entry(None, 200.0, ExitTrigger::Target));
    }

    #[test]
    fn full_target_exit_keeps_stop_in_force() {
        let cfg = ReEntryConfig::new(0.5, 1, 0.5);
        let mut s = state(Some(StopLossConfig::fixed(-0.1)));
        s.realize(1.0, 150.0, 1);
        assert!(s.is_flat());
        assert!(s.arm_re_entry(Some(&cfg), 150.0, ExitTrigger::Target));
        assert_eq!(s.armed_re_entry.unwrap().stop_in_force, Some(90.0));
    }

    #[test]
    fn stop_out_arms_without_stop() {
        let cfg = ReEntryConfig::new(0.1, 1, 1.0);
        let mut s = state(Some(StopLossConfig::fixed(-0.1)));
        s.realize(1.0, 90.0, 1);
        assert!(s.arm_re_entry(Some(&cfg), 90.0, ExitTrigger::StopLoss));
        assert_eq!(s.armed_re_entry.unwrap().stop_in_force, None);
    }

    #[test]
    fn observe_tracks_lowest_and_sanitizes() {
        let mut s = state(None);
        s.observe(&Candle::new(60, 100.0, 101.0, 95.0, f64::NAN));
        s.observe(&Candle::new(120, 100.0, 101.0, 97.0, 99.0));
        assert_eq!(s.lowest_price, 95.0);
        assert_eq!(s.lowest_timestamp, 60);
        assert_eq!(s.sanitize_price(f64::INFINITY), 99.0);
    }

    #[test]
    fn fill_candle_does_not_raise_peak() {
        let mut s = state(None);
        s.observe_fill_candle(&Candle::new(0, 110.0, 120.0, 95.0, 100.0));
        assert_eq!(s.peak_price, 100.0);
        assert_eq!(s.lowest_price, 95.0);
        assert_eq!(s.last_price, 100.0);
    }
}
