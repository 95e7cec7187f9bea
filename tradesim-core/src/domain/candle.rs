//! Candle — the fundamental market data unit.

use serde::{Deserialize, Serialize};

/// One OHLCV bar for a fixed interval.
///
/// `timestamp` is in seconds since the Unix epoch. The engine assumes candles
/// arrive with ascending, unique timestamps but never relies on it for memory
/// safety or finiteness of its outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: 0.0,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }
}

/// Whole minutes elapsed between two timestamps (seconds), floored at zero.
///
/// Out-of-order timestamps yield `0.0` rather than a negative delay.
pub fn minutes_between(from: i64, to: i64) -> f64 {
    (to.saturating_sub(from)).max(0) as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_between_floors_at_zero() {
        assert_eq!(minutes_between(0, 600), 10.0);
        assert_eq!(minutes_between(600, 0), 0.0);
        assert_eq!(minutes_between(i64::MIN, i64::MAX), i64::MAX as f64 / 60.0);
    }

    #[test]
    fn candle_volume_defaults_when_missing() {
        let json = r#"{"timestamp":60,"open":1.0,"high":1.1,"low":0.9,"close":1.0}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.volume, 0.0);
        assert_eq!(candle.timestamp, 60);
    }
}
