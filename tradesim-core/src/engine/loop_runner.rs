//! Candle-by-candle trade simulation — the heart of the engine.
//!
//! Fixed precedence per candle, short-circuiting on terminal exits:
//! 1. Stop update: rolling-window ratchet, or the one-shot breakeven move
//! 2. Re-entry: if armed and price retraced to the trigger, validate and re-enter
//! 3. Stop vs target: resolved through the sequential resolver
//! 4. Target leg: realize `percent` of the remaining position
//! 5. Exit signal: liquidate at the close
//!
//! After the last candle any remaining position is closed at the last close.

use crate::components::path::Outcome;
use crate::components::signal::SignalContext;
use crate::components::{Collaborators, IndicatorSnapshot};
use crate::config::{SimulationConfig, StopLossConfig, TrailingStop};
use crate::domain::{Candle, EventKind, FinalExitReason, SimulationResult};
use crate::engine::execution::{resolve, CostModel};

use super::assemble::{assemble, no_trade};
use super::entry::{resolve_entry, EntryResolution};
use super::reentry::find_stop_breach;
use super::state::{ExitTrigger, TradeState};

/// Whether the loop keeps going after a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// Stop processing; no end-of-data exit follows.
    Halt,
}

/// Run one simulation.
///
/// Never fails: empty series, unreachable entries and degenerate prices all
/// produce a representable result with finite numeric fields.
///
/// A rejected re-entry halts the run without a final exit. Any tranche still
/// held at that point stays open, so `final_pnl` then covers only the
/// realized tranches and `remaining_position` on the last event is non-zero.
pub fn simulate(
    candles: &[Candle],
    indicators: &[IndicatorSnapshot],
    config: &SimulationConfig,
    collaborators: Collaborators<'_>,
) -> SimulationResult {
    if candles.is_empty() {
        return SimulationResult::empty();
    }

    if collaborators.signal_evaluator.is_none()
        && (config.entry_signal.is_some() || config.exit_signal.is_some())
    {
        tracing::warn!("signal expression configured without an evaluator; ignoring it");
    }

    let fill = match resolve_entry(candles, indicators, config, collaborators.signal_evaluator) {
        EntryResolution::Filled(fill) => fill,
        EntryResolution::NotReached {
            trigger_price,
            reason,
        } => {
            tracing::debug!(trigger_price, "{reason}");
            return no_trade(candles, trigger_price, reason);
        }
    };

    if !(fill.price.is_finite() && fill.price > 0.0) {
        tracing::warn!(price = fill.price, index = fill.index, "unusable entry price, no trade");
        return no_trade(
            candles,
            fill.price,
            format!("Unusable entry price {}", fill.price),
        );
    }

    let cost = CostModel::from_config(&config.costs);
    let mut state = TradeState::new(
        fill.price,
        fill.index,
        fill.timestamp,
        cost,
        config.stop_loss.as_ref(),
    );
    if fill.loop_start > fill.index {
        state.observe_fill_candle(&candles[fill.index]);
    }

    let (kind, description) = match fill.event.clone() {
        Some(event) => (event.kind, event.description),
        None => (
            EventKind::Entry {
                filled: true,
                delay_minutes: fill.delay_minutes,
            },
            format!("Entry at close {:.6} after trailing entry wait expired", fill.price),
        ),
    };
    state.record(kind, fill.timestamp, fill.price, description);

    let runner = LoopRunner {
        candles,
        indicators,
        config,
        collaborators,
    };

    let mut halted = false;
    for index in fill.loop_start..candles.len() {
        if runner.step(&mut state, index) == Flow::Halt {
            halted = true;
            break;
        }
    }

    if !halted && !state.is_flat() {
        runner.close_at_end(&mut state);
    }

    assemble(state, candles.len(), &fill)
}

struct LoopRunner<'a> {
    candles: &'a [Candle],
    indicators: &'a [IndicatorSnapshot],
    config: &'a SimulationConfig,
    collaborators: Collaborators<'a>,
}

impl LoopRunner<'_> {
    fn step(&self, state: &mut TradeState, index: usize) -> Flow {
        let candle = &self.candles[index];
        state.observe(candle);

        // ─── 1. Stop update ───
        if !state.is_flat() {
            if let Some(stop_loss) = self.config.stop_loss.as_ref() {
                update_stop(state, stop_loss, candle, index);
            }
        }

        // ─── 2. Re-entry ───
        if let Some(armed) = state.armed_re_entry {
            if candle.low <= armed.trigger_price {
                return self.try_re_enter(state, index, armed.trigger_price, armed.stop_in_force);
            }
        }

        // ─── 3/4. Stop vs target ───
        if !state.is_flat() {
            let target = self.target_price(state);
            let resolution = resolve(
                candle,
                state.stop_level(),
                target,
                self.collaborators.path_provider,
            );
            tracing::trace!(
                index,
                outcome = ?resolution.outcome,
                method = ?resolution.method,
                "candle resolved"
            );
            match resolution.outcome {
                Outcome::StopLoss => {
                    let stop = state.stop_level().unwrap_or(candle.low);
                    let price = state.sanitize_price(stop);
                    state.realize(state.remaining, price, index);
                    state.record(
                        EventKind::StopLoss {
                            resolution: resolution.method,
                        },
                        candle.timestamp,
                        price,
                        format!("Stop loss hit at {price:.6}"),
                    );
                    if !self.arm_after_exit(state, price, ExitTrigger::StopLoss) {
                        return Flow::Halt;
                    }
                    return Flow::Continue;
                }
                Outcome::TargetHit => {
                    let leg_index = state.target_index;
                    let percent = self.config.legs[leg_index].percent;
                    let multiple = self.config.legs[leg_index].target;
                    let sell = state.remaining * percent.clamp(0.0, 1.0);
                    state.realize(sell, target, index);
                    state.target_index += 1;
                    state.record(
                        EventKind::TargetHit {
                            leg_index,
                            target: multiple,
                            percent,
                            resolution: resolution.method,
                        },
                        candle.timestamp,
                        target,
                        format!("Target {multiple}x hit at {target:.6}, sold {sell:.4}"),
                    );
                    let armed = self.arm_after_exit(state, target, ExitTrigger::Target);
                    if state.is_flat() && !armed {
                        return Flow::Halt;
                    }
                }
                Outcome::Neither => {}
            }
        }

        // ─── 5. Exit signal ───
        if !state.is_flat() && self.exit_signal_fires(index) {
            let price = state.sanitize_price(candle.close);
            state.realize(state.remaining, price, index);
            state.armed_re_entry = None;
            state.record(
                EventKind::FinalExit {
                    reason: FinalExitReason::ExitSignal,
                },
                candle.timestamp,
                price,
                format!("Exit signal at close {price:.6}"),
            );
            return Flow::Halt;
        }

        Flow::Continue
    }

    /// Entry multiple of the next leg, or `+inf` once the legs are used up.
    fn target_price(&self, state: &TradeState) -> f64 {
        self.config
            .legs
            .get(state.target_index)
            .map(|leg| state.entry_price * leg.target)
            .filter(|p| !p.is_nan())
            .unwrap_or(f64::INFINITY)
    }

    fn arm_after_exit(
        &self,
        state: &mut TradeState,
        exit_price: f64,
        trigger: ExitTrigger,
    ) -> bool {
        let armed = state.arm_re_entry(self.config.re_entry.as_ref(), exit_price, trigger);
        if let Some(armed) = state.armed_re_entry.filter(|_| armed) {
            tracing::debug!(
                trigger = armed.trigger_price,
                stop = ?armed.stop_in_force,
                "re-entry armed"
            );
        }
        armed
    }

    fn try_re_enter(
        &self,
        state: &mut TradeState,
        index: usize,
        trigger_price: f64,
        stop_in_force: Option<f64>,
    ) -> Flow {
        let candle = &self.candles[index];
        if let Some(breach) =
            find_stop_breach(self.candles, state.last_exit_index, index, stop_in_force)
        {
            let stop_price = stop_in_force.unwrap_or(breach.low);
            state.armed_re_entry = None;
            state.record(
                EventKind::ReEntryRejected {
                    stop_price,
                    breach_timestamp: breach.timestamp,
                    breach_low: breach.low,
                },
                candle.timestamp,
                trigger_price,
                format!(
                    "Re-entry at {trigger_price:.6} rejected: stop {stop_price:.6} breached at {}",
                    breach.timestamp
                ),
            );
            return Flow::Halt;
        }

        let size_percent = self
            .config
            .re_entry
            .as_ref()
            .map_or(0.0, |cfg| cfg.size_percent);
        state.re_enter(trigger_price, size_percent, self.config.stop_loss.as_ref());
        state.record(
            EventKind::ReEntry {
                re_entry_count: state.re_entry_count,
                size_percent,
            },
            candle.timestamp,
            trigger_price,
            format!(
                "Re-entry #{} at {trigger_price:.6}",
                state.re_entry_count
            ),
        );
        Flow::Continue
    }

    fn exit_signal_fires(&self, index: usize) -> bool {
        let (Some(expression), Some(evaluator)) = (
            self.config.exit_signal.as_ref(),
            self.collaborators.signal_evaluator,
        ) else {
            return false;
        };
        SignalContext::at(self.candles, self.indicators, index)
            .map(|ctx| {
                let ctx = ctx.with_lookback(self.candles, self.indicators, index);
                evaluator.evaluate(expression, &ctx)
            })
            .unwrap_or(false)
    }

    fn close_at_end(&self, state: &mut TradeState) {
        let Some(last) = self.candles.last() else {
            return;
        };
        let price = state.sanitize_price(last.close);
        let index = self.candles.len() - 1;
        state.realize(state.remaining, price, index);
        state.armed_re_entry = None;
        state.record(
            EventKind::FinalExit {
                reason: FinalExitReason::EndOfData,
            },
            last.timestamp,
            price,
            format!("Final exit at last close {price:.6}"),
        );
    }
}

fn update_stop(state: &mut TradeState, stop_loss: &StopLossConfig, candle: &Candle, index: usize) {
    match stop_loss.trailing {
        TrailingStop::Disabled => {}
        TrailingStop::Rolling => {
            if let Some(peak) = state.rolling.push(index, candle.high) {
                let proposed = peak * (1.0 - stop_loss.trailing_percent);
                if state.stop.apply(proposed) {
                    tracing::trace!(index, peak, stop = proposed, "rolling stop raised");
                }
            }
        }
        TrailingStop::Breakeven { activation } => {
            if state.breakeven_moved {
                return;
            }
            let activation_price = state.entry_price * (1.0 + activation);
            if activation_price.is_finite() && state.peak_price >= activation_price {
                let previous_stop = state.stop_level();
                state.stop.apply(state.entry_price);
                state.breakeven_moved = true;
                let new_stop = state.stop_level().unwrap_or(state.entry_price);
                state.record(
                    EventKind::StopMoved {
                        previous_stop,
                        new_stop,
                    },
                    candle.timestamp,
                    new_stop,
                    format!("Stop moved to breakeven {new_stop:.6}"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ReEntryConfig, StrategyLeg};
    use crate::domain::TradeOutcome;

    fn candle(i: i64, o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(i * 60, o, h, l, c)
    }

    fn names(result: &SimulationResult) -> Vec<&'static str> {
        result.events.iter().map(|e| e.kind.name()).collect()
    }

    #[test]
    fn empty_series_is_empty_result() {
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(2.0, 1.0)]);
        let result = simulate(&[], &[], &cfg, Collaborators::none());
        assert_eq!(result, SimulationResult::empty());
    }

    #[test]
    fn single_leg_target_completes() {
        let candles = [
            candle(0, 1.0, 1.01, 0.99, 1.0),
            candle(1, 1.0, 1.5, 0.99, 1.5),
        ];
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(1.5, 1.0)]);
        let result = simulate(&candles, &[], &cfg, Collaborators::none());
        assert_eq!(names(&result), ["entry", "target_hit"]);
        assert_eq!(result.events[1].remaining_position(), 0.0);
        assert!((result.final_pnl - 1.5).abs() < 1e-12);
        assert_eq!(result.outcome, TradeOutcome::TargetsCompleted);
    }

    #[test]
    fn one_leg_per_candle() {
        let candles = [
            candle(0, 1.0, 1.0, 1.0, 1.0),
            candle(1, 1.0, 3.0, 1.0, 3.0),
            candle(2, 3.0, 3.0, 3.0, 3.0),
        ];
        let cfg = SimulationConfig::new(vec![
            StrategyLeg::new(1.5, 0.5),
            StrategyLeg::new(2.0, 1.0),
        ]);
        let result = simulate(&candles, &[], &cfg, Collaborators::none());
        assert_eq!(names(&result), ["entry", "target_hit", "target_hit"]);
        assert_eq!(result.events[1].timestamp(), 60);
        assert_eq!(result.events[2].timestamp(), 120);
        // 0.5 * 1.5 + 0.5 * 2.0
        assert!((result.final_pnl - 1.75).abs() < 1e-12);
    }

    #[test]
    fn collision_defaults_to_stop() {
        let candles = [candle(0, 1.0, 2.0, 0.5, 1.0)];
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(1.5, 1.0)])
            .with_stop_loss(StopLossConfig::fixed(-0.2));
        let result = simulate(&candles, &[], &cfg, Collaborators::none());
        assert_eq!(names(&result), ["entry", "stop_loss"]);
        assert!((result.final_pnl - 0.8).abs() < 1e-12);
        assert_eq!(result.outcome, TradeOutcome::StoppedOut);
    }

    #[test]
    fn breakeven_moves_once() {
        let candles = [
            candle(0, 1.0, 1.0, 1.0, 1.0),
            candle(1, 1.0, 1.2, 1.05, 1.15),
            candle(2, 1.15, 1.3, 1.1, 1.2),
            candle(3, 1.2, 1.2, 0.9, 0.95),
        ];
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(5.0, 1.0)])
            .with_stop_loss(StopLossConfig::breakeven(-0.5, 0.1));
        let result = simulate(&candles, &[], &cfg, Collaborators::none());
        assert_eq!(names(&result), ["entry", "stop_moved", "stop_loss"]);
        assert!((result.final_pnl - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rolling_stop_trails_window_peak() {
        let candles = [
            candle(0, 100.0, 100.0, 100.0, 100.0),
            candle(1, 100.0, 200.0, 160.0, 190.0),
            candle(2, 190.0, 190.0, 140.0, 150.0),
        ];
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(10.0, 1.0)])
            .with_stop_loss(StopLossConfig::rolling(-0.5, 0.25, 5));
        let result = simulate(&candles, &[], &cfg, Collaborators::none());
        assert_eq!(names(&result), ["entry", "stop_loss"]);
        assert_eq!(result.events[1].timestamp(), 120);
        assert_eq!(result.events[1].price(), 150.0);
        assert!((result.final_pnl - 1.5).abs() < 1e-12);
    }

    #[test]
    fn stop_out_rearms_and_re_enters() {
        let candles = [
            candle(0, 1.0, 1.0, 1.0, 1.0),
            candle(1, 1.0, 1.0, 0.85, 0.9),
            candle(2, 0.9, 0.9, 0.7, 0.75),
            candle(3, 0.75, 0.8, 0.75, 0.8),
        ];
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(5.0, 1.0)])
            .with_stop_loss(StopLossConfig::fixed(-0.1))
            .with_re_entry(ReEntryConfig::new(0.2, 1, 0.5));
        let result = simulate(&candles, &[], &cfg, Collaborators::none());
        assert_eq!(
            names(&result),
            ["entry", "stop_loss", "re_entry", "final_exit"]
        );
        let re_entry = &result.events[2];
        assert!((re_entry.price() - 0.72).abs() < 1e-12);
        assert_eq!(re_entry.remaining_position(), 0.5);
        // 0.9 + 0.5 * 0.8
        assert!((result.final_pnl - 1.3).abs() < 1e-12);
        assert_eq!(result.event_counts.re_entries, 1);
    }

    #[test]
    fn open_position_closes_at_end_of_data() {
        let candles = [
            candle(0, 1.0, 1.1, 0.9, 1.0),
            candle(1, 1.0, 1.2, 0.95, 1.1),
        ];
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(3.0, 1.0)]);
        let result = simulate(&candles, &[], &cfg, Collaborators::none());
        assert_eq!(names(&result), ["entry", "final_exit"]);
        assert!((result.final_pnl - 1.1).abs() < 1e-12);
        assert_eq!(result.outcome, TradeOutcome::EndOfData);
        assert_eq!(result.final_price, 1.1);
    }

    #[test]
    fn exit_signal_liquidates_at_close() {
        let candles = [
            candle(0, 1.0, 1.1, 0.9, 1.0),
            candle(1, 1.0, 1.2, 0.95, 1.1),
            candle(2, 1.1, 1.3, 1.0, 1.25),
        ];
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(3.0, 1.0)])
            .with_exit_signal("close_above_1_05");
        let evaluator = |_: &crate::components::SignalExpression, ctx: &SignalContext<'_>| {
            ctx.candle.close > 1.05
        };
        let collaborators = Collaborators::none().with_signal_evaluator(&evaluator);
        let result = simulate(&candles, &[], &cfg, collaborators);
        assert_eq!(names(&result), ["entry", "final_exit"]);
        assert_eq!(result.outcome, TradeOutcome::ExitSignal);
        assert_eq!(result.events[1].timestamp(), 60);
    }

    #[test]
    fn zero_entry_price_is_no_trade() {
        let candles = [candle(0, 0.0, 1.0, 0.0, 1.0)];
        let cfg = SimulationConfig::new(vec![StrategyLeg::new(2.0, 1.0)]);
        let result = simulate(&candles, &[], &cfg, Collaborators::none());
        assert_eq!(result.outcome, TradeOutcome::NoTrade);
        assert_eq!(result.final_pnl, 0.0);
        assert_eq!(result.total_candles, 1);
    }
}
