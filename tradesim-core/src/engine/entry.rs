//! Entry resolver — decide where, when and at what price the position opens.
//!
//! Three modes, tried in order:
//! 1. Initial-drop entry: fill at `open[0] * (1 + initial_entry)` on the first
//!    candle whose low reaches it.
//! 2. Trailing entry: wait for the lowest low inside `max_wait_time`, then fill
//!    on a rebound of `trailing_entry` above it. If the rebound never comes the
//!    entry falls back to the close of the first candle at or past the deadline.
//! 3. Neither configured: fill at the first candle's open.
//!
//! An entry signal, when present and evaluable, gates every candidate fill.

use crate::components::signal::{SignalContext, SignalEvaluator, SignalExpression};
use crate::components::IndicatorSnapshot;
use crate::config::{EntryConfig, SimulationConfig};
use crate::domain::{minutes_between, Candle, EventKind};

/// The entry-kind event produced alongside a fill.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryEvent {
    pub kind: EventKind,
    pub description: String,
}

/// A resolved entry fill.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFill {
    pub price: f64,
    /// Candle on which the fill happened.
    pub index: usize,
    pub timestamp: i64,
    /// Minutes from the first candle to the fill candle.
    pub delay_minutes: f64,
    /// First candle the main loop processes.
    pub loop_start: usize,
    pub used_trailing_entry: bool,
    /// `None` for the trailing-entry timeout fallback; the caller synthesizes one.
    pub event: Option<EntryEvent>,
}

/// Outcome of entry resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResolution {
    Filled(EntryFill),
    /// The configured entry was never reached.
    NotReached { trigger_price: f64, reason: String },
}

/// Resolve the entry for `candles`. An empty series is never reached.
pub fn resolve_entry(
    candles: &[Candle],
    indicators: &[IndicatorSnapshot],
    config: &SimulationConfig,
    evaluator: Option<&dyn SignalEvaluator>,
) -> EntryResolution {
    let Some(first) = candles.first() else {
        return EntryResolution::NotReached {
            trigger_price: 0.0,
            reason: "no candles".to_string(),
        };
    };
    let gate = EntryGate {
        candles,
        indicators,
        expression: config.entry_signal.as_ref(),
        evaluator,
    };

    let entry = config.entry.as_ref();
    let initial = entry.and_then(|e| e.initial_entry).filter(|d| d.is_finite());
    let trailing = entry.and_then(|e| e.trailing_entry).filter(|r| r.is_finite());

    if let Some(drop) = initial {
        let trigger_price = first.open * (1.0 + drop);
        if let Some(fill) = initial_drop_fill(candles, trigger_price, &gate) {
            return EntryResolution::Filled(fill);
        }
        match (entry, trailing) {
            (Some(cfg), Some(rebound)) => {
                tracing::debug!(trigger_price, "initial entry not reached, trying trailing entry");
                return EntryResolution::Filled(trailing_fill(candles, cfg, rebound, &gate));
            }
            _ => {
                return EntryResolution::NotReached {
                    trigger_price,
                    reason: format!("Entry price {trigger_price:.6} never reached"),
                };
            }
        }
    }

    if let (Some(cfg), Some(rebound)) = (entry, trailing) {
        return EntryResolution::Filled(trailing_fill(candles, cfg, rebound, &gate));
    }

    EntryResolution::Filled(EntryFill {
        price: first.open,
        index: 0,
        timestamp: first.timestamp,
        delay_minutes: 0.0,
        loop_start: 0,
        used_trailing_entry: false,
        event: Some(EntryEvent {
            kind: EventKind::Entry {
                filled: true,
                delay_minutes: 0.0,
            },
            description: format!("Entry at open {:.6}", first.open),
        }),
    })
}

/// Entry-signal check for one candle. Absent expression or evaluator always passes.
struct EntryGate<'a> {
    candles: &'a [Candle],
    indicators: &'a [IndicatorSnapshot],
    expression: Option<&'a SignalExpression>,
    evaluator: Option<&'a dyn SignalEvaluator>,
}

impl EntryGate<'_> {
    fn allows(&self, index: usize) -> bool {
        let (Some(expression), Some(evaluator)) = (self.expression, self.evaluator) else {
            return true;
        };
        SignalContext::at(self.candles, self.indicators, index)
            .map(|ctx| {
                let ctx = ctx.with_lookback(self.candles, self.indicators, index);
                evaluator.evaluate(expression, &ctx)
            })
            .unwrap_or(false)
    }
}

fn initial_drop_fill(candles: &[Candle], trigger_price: f64, gate: &EntryGate<'_>) -> Option<EntryFill> {
    if !trigger_price.is_finite() {
        return None;
    }
    let t0 = candles.first()?.timestamp;
    let (index, candle) = candles
        .iter()
        .enumerate()
        .find(|(i, c)| c.low <= trigger_price && gate.allows(*i))?;
    let delay_minutes = minutes_between(t0, candle.timestamp);
    Some(EntryFill {
        price: trigger_price,
        index,
        timestamp: candle.timestamp,
        delay_minutes,
        loop_start: index + 1,
        used_trailing_entry: false,
        event: Some(EntryEvent {
            kind: EventKind::Entry {
                filled: true,
                delay_minutes,
            },
            description: format!("Entry triggered at {trigger_price:.6}"),
        }),
    })
}

fn trailing_fill(
    candles: &[Candle],
    config: &EntryConfig,
    rebound: f64,
    gate: &EntryGate<'_>,
) -> EntryFill {
    let t0 = candles.first().map_or(0, |c| c.timestamp);
    let wait_secs = if config.max_wait_time.is_finite() {
        (config.max_wait_time.max(0.0) * 60.0) as i64
    } else {
        i64::MAX
    };
    let deadline = t0.saturating_add(wait_secs);
    let window_end = candles
        .iter()
        .position(|c| c.timestamp > deadline)
        .unwrap_or(candles.len());

    let lowest = candles[..window_end]
        .iter()
        .enumerate()
        .filter(|(_, c)| c.low.is_finite())
        .fold(None::<(usize, f64)>, |best, (i, c)| match best {
            Some((_, low)) if low <= c.low => best,
            _ => Some((i, c.low)),
        });

    if let Some((lowest_index, lowest_price)) = lowest {
        let rebound_price = lowest_price * (1.0 + rebound);
        let hit = (lowest_index + 1..window_end)
            .find(|&i| candles[i].high >= rebound_price && gate.allows(i));
        if let Some(index) = hit {
            let candle = &candles[index];
            let delay_minutes = minutes_between(t0, candle.timestamp);
            return EntryFill {
                price: rebound_price,
                index,
                timestamp: candle.timestamp,
                delay_minutes,
                loop_start: index + 1,
                used_trailing_entry: true,
                event: Some(EntryEvent {
                    kind: EventKind::TrailingEntryTriggered {
                        lowest_price,
                        rebound_percent: rebound,
                        delay_minutes,
                    },
                    description: format!(
                        "Trailing entry at {rebound_price:.6} after low of {lowest_price:.6}"
                    ),
                }),
            };
        }
    }

    // timed out: first candle at/after the deadline, or the last candle
    let index = candles
        .iter()
        .position(|c| c.timestamp >= deadline)
        .unwrap_or(candles.len().saturating_sub(1));
    let candle = &candles[index];
    tracing::debug!(index, close = candle.close, "trailing entry timed out");
    EntryFill {
        price: candle.close,
        index,
        timestamp: candle.timestamp,
        delay_minutes: minutes_between(t0, candle.timestamp),
        loop_start: index + 1,
        used_trailing_entry: false,
        event: None,
    }
}
