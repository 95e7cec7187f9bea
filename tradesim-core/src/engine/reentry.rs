//! Re-entry validator.
//!
//! Before a re-entry fills, every candle between the last exit and the
//! candidate candle is checked against the stop that protected the position
//! at exit time. If price breached that stop in between, the setup that
//! justified the re-entry is void and the run terminates.

use crate::domain::Candle;

/// First breach found between the last exit and the re-entry candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopBreach {
    pub index: usize,
    pub timestamp: i64,
    pub low: f64,
}

/// Scan candles in `(last_exit, candidate]` for `low <= stop`.
///
/// Without a stop, or with a non-finite one, nothing can be breached.
pub fn find_stop_breach(
    candles: &[Candle],
    last_exit: Option<usize>,
    candidate: usize,
    stop: Option<f64>,
) -> Option<StopBreach> {
    let stop = stop.filter(|s| s.is_finite())?;
    let start = last_exit.map_or(0, |i| i + 1);
    let end = candidate.saturating_add(1).min(candles.len());
    if start >= end {
        return None;
    }
    candles[start..end]
        .iter()
        .enumerate()
        .find(|(_, c)| c.low <= stop)
        .map(|(offset, c)| StopBreach {
            index: start + offset,
            timestamp: c.timestamp,
            low: c.low,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lows(lows: &[f64]) -> Vec<Candle> {
        lows.iter()
            .enumerate()
            .map(|(i, &l)| Candle::new(i as i64 * 60, l + 1.0, l + 2.0, l, l + 1.0))
            .collect()
    }

    #[test]
    fn no_stop_never_breaches() {
        let candles = lows(&[1.0, 0.1, 0.01]);
        assert_eq!(find_stop_breach(&candles, Some(0), 2, None), None);
        assert_eq!(find_stop_breach(&candles, Some(0), 2, Some(f64::NAN)), None);
    }

    #[test]
    fn finds_first_breach_after_exit() {
        let candles = lows(&[5.0, 6.0, 3.9, 3.0]);
        let breach = find_stop_breach(&candles, Some(0), 3, Some(4.0)).unwrap();
        assert_eq!(breach.index, 2);
        assert_eq!(breach.low, 3.9);
        assert_eq!(breach.timestamp, 120);
    }

    #[test]
    fn exit_candle_itself_is_excluded() {
        let candles = lows(&[1.0, 6.0]);
        assert_eq!(find_stop_breach(&candles, Some(0), 1, Some(4.0)), None);
    }

    #[test]
    fn candidate_candle_is_included() {
        let candles = lows(&[5.0, 6.0, 4.0]);
        let breach = find_stop_breach(&candles, Some(0), 2, Some(4.0)).unwrap();
        assert_eq!(breach.index, 2);
    }

    #[test]
    fn candidate_past_end_is_clamped() {
        let candles = lows(&[5.0, 6.0]);
        assert_eq!(find_stop_breach(&candles, Some(0), 10, Some(4.0)), None);
    }
}
