//! Result assembler — packages final trade state into a `SimulationResult`.
//!
//! Every numeric field leaving the engine passes through `finite_or`, so a
//! result is always plain finite data regardless of how pathological the
//! input series was.

use crate::domain::{
    minutes_between, Candle, EntryDiagnostics, EventCounts, EventHeader, EventKind,
    FinalExitReason, SimulationEvent, SimulationResult, TradeOutcome,
};

use super::entry::EntryFill;
use super::state::TradeState;

/// Build the result for a run that entered a position.
pub fn assemble(state: TradeState, total_candles: usize, fill: &EntryFill) -> SimulationResult {
    let entry_price = state.entry_price;
    let lowest_vs_entry_percent = (state.lowest_price - entry_price) / entry_price * 100.0;
    let entry_optimization = EntryDiagnostics {
        lowest_price: finite_or(state.lowest_price, entry_price),
        lowest_price_timestamp: state.lowest_timestamp,
        lowest_vs_entry_percent: finite_or(lowest_vs_entry_percent, 0.0),
        time_from_entry_minutes: minutes_between(state.entry_timestamp, state.lowest_timestamp),
        used_trailing_entry: fill.used_trailing_entry,
        actual_entry_price: entry_price,
        entry_delay_minutes: finite_or(fill.delay_minutes, 0.0),
    };
    let final_price = state.last_exit_price.unwrap_or(state.last_price);

    let events: Vec<SimulationEvent> = state.events.into_iter().map(sanitize_event).collect();
    let outcome = outcome_of(&events);
    let event_counts = count_events(&events);

    tracing::debug!(
        final_pnl = state.realized_pnl,
        ?outcome,
        events = events.len(),
        "simulation complete"
    );

    SimulationResult {
        final_pnl: finite_or(state.realized_pnl, 0.0),
        events,
        entry_price: finite_or(entry_price, 0.0),
        final_price: finite_or(final_price, 0.0),
        total_candles,
        entry_optimization,
        outcome,
        event_counts,
    }
}

/// Definitive no-trade result: zero PnL and a single unfilled entry event.
pub fn no_trade(candles: &[Candle], trigger_price: f64, reason: String) -> SimulationResult {
    let timestamp = candles.first().map_or(0, |c| c.timestamp);
    let final_price = candles
        .iter()
        .rev()
        .map(|c| c.close)
        .find(|p| p.is_finite())
        .unwrap_or(0.0);
    let header = EventHeader {
        timestamp,
        price: finite_or(trigger_price, 0.0),
        description: reason,
        remaining_position: 0.0,
        pnl: 0.0,
    };
    let events = vec![SimulationEvent::new(
        EventKind::Entry {
            filled: false,
            delay_minutes: 0.0,
        },
        header,
    )];
    let event_counts = count_events(&events);
    SimulationResult {
        final_pnl: 0.0,
        events,
        entry_price: 0.0,
        final_price,
        total_candles: candles.len(),
        entry_optimization: EntryDiagnostics::default(),
        outcome: TradeOutcome::NoTrade,
        event_counts,
    }
}

/// Outcome named by the last event of the log.
fn outcome_of(events: &[SimulationEvent]) -> TradeOutcome {
    let Some(last) = events.last() else {
        return TradeOutcome::NoTrade;
    };
    match &last.kind {
        EventKind::Entry { filled: false, .. } => TradeOutcome::NoTrade,
        EventKind::StopLoss { .. } => TradeOutcome::StoppedOut,
        EventKind::TargetHit { .. } => TradeOutcome::TargetsCompleted,
        EventKind::ReEntryRejected { .. } => TradeOutcome::ReEntryRejected,
        EventKind::FinalExit {
            reason: FinalExitReason::ExitSignal,
        } => TradeOutcome::ExitSignal,
        EventKind::FinalExit {
            reason: FinalExitReason::EndOfData,
        } => TradeOutcome::EndOfData,
        // a log never ends on these once a position was opened
        EventKind::Entry { filled: true, .. }
        | EventKind::TrailingEntryTriggered { .. }
        | EventKind::StopMoved { .. }
        | EventKind::ReEntry { .. } => TradeOutcome::EndOfData,
    }
}

fn count_events(events: &[SimulationEvent]) -> EventCounts {
    let mut counts = EventCounts::default();
    for event in events {
        match event.kind {
            EventKind::Entry { .. } | EventKind::TrailingEntryTriggered { .. } => {
                counts.entries += 1
            }
            EventKind::StopMoved { .. } => counts.stop_moves += 1,
            EventKind::ReEntry { .. } => counts.re_entries += 1,
            EventKind::ReEntryRejected { .. } => counts.re_entry_rejections += 1,
            EventKind::StopLoss { .. } => counts.stop_losses += 1,
            EventKind::TargetHit { .. } => counts.targets_hit += 1,
            EventKind::FinalExit { .. } => counts.final_exits += 1,
        }
    }
    counts
}

fn sanitize_event(mut event: SimulationEvent) -> SimulationEvent {
    let header = &mut event.header;
    header.price = finite_or(header.price, 0.0);
    header.remaining_position = finite_or(header.remaining_position, 0.0);
    header.pnl = finite_or(header.pnl, 0.0);
    match &mut event.kind {
        EventKind::Entry { delay_minutes, .. } => {
            *delay_minutes = finite_or(*delay_minutes, 0.0);
        }
        EventKind::TrailingEntryTriggered {
            lowest_price,
            rebound_percent,
            delay_minutes,
        } => {
            *lowest_price = finite_or(*lowest_price, 0.0);
            *rebound_percent = finite_or(*rebound_percent, 0.0);
            *delay_minutes = finite_or(*delay_minutes, 0.0);
        }
        EventKind::StopMoved {
            previous_stop,
            new_stop,
        } => {
            *previous_stop = previous_stop.filter(|s| s.is_finite());
            *new_stop = finite_or(*new_stop, 0.0);
        }
        EventKind::ReEntry { size_percent, .. } => {
            *size_percent = finite_or(*size_percent, 0.0);
        }
        EventKind::ReEntryRejected {
            stop_price,
            breach_low,
            ..
        } => {
            *stop_price = finite_or(*stop_price, 0.0);
            *breach_low = finite_or(*breach_low, 0.0);
        }
        EventKind::TargetHit {
            target, percent, ..
        } => {
            *target = finite_or(*target, 0.0);
            *percent = finite_or(*percent, 0.0);
        }
        EventKind::StopLoss { .. } | EventKind::FinalExit { .. } => {}
    }
    event
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        tracing::warn!(value, fallback, "non-finite result field replaced");
        fallback
    }
}
