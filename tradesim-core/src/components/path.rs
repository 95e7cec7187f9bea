//! Intra-candle price path — the optional finer-grained data source used to
//! order a stop and a target that fall inside the same candle's range.

use crate::domain::Candle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which threshold a finer price path crossed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Breach {
    StopLoss,
    Target,
}

/// Outcome of resolving one candle against the stop and target levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    StopLoss,
    TargetHit,
    Neither,
}

/// How an `Outcome` was decided, kept on events for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Neither level inside the candle range.
    NoTrigger,
    /// Only one level inside the candle range.
    Unambiguous,
    /// Both inside the range; ordered by the intra-candle path provider.
    IntraCandlePath,
    /// Both inside the range; no finer path, stop-loss assumed first.
    StopFirstDefault,
}

/// Failure of an intra-candle path lookup.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("no intra-candle data for candle at {timestamp}")]
    Unavailable { timestamp: i64 },
    #[error("price path provider failed: {0}")]
    Provider(String),
}

/// Source of sub-candle price paths.
///
/// Implementations may perform I/O. The engine calls this synchronously and
/// waits for the answer before examining the next candle.
pub trait IntraCandlePath: Send + Sync {
    /// Name of this provider (for logging).
    fn name(&self) -> &str;

    /// Report which of `stop` and `target` the real price path touched first
    /// within `candle`. `Ok(None)` means neither was crossed on the finer path
    /// or no finer data covers this candle.
    fn first_breach(
        &self,
        stop: f64,
        target: f64,
        candle: &Candle,
    ) -> Result<Option<Breach>, PathError>;
}

/// Path provider backed by an in-memory list of sub-candles.
///
/// Sub-candles must be sorted by timestamp. For a candle at `t`, the sub-candles
/// in `[t, t + interval_secs)` are walked in order; within a single sub-candle
/// the stop is checked before the target.
#[derive(Debug, Clone)]
pub struct SubCandlePath {
    sub_candles: Vec<Candle>,
    interval_secs: i64,
}

impl SubCandlePath {
    pub fn new(sub_candles: Vec<Candle>, interval_secs: i64) -> Self {
        Self {
            sub_candles,
            interval_secs,
        }
    }

    fn window(&self, start: i64) -> &[Candle] {
        let end = start.saturating_add(self.interval_secs);
        let lo = self.sub_candles.partition_point(|c| c.timestamp < start);
        let hi = self.sub_candles.partition_point(|c| c.timestamp < end);
        &self.sub_candles[lo..hi.max(lo)]
    }
}

impl IntraCandlePath for SubCandlePath {
    fn name(&self) -> &str {
        "sub_candle"
    }

    fn first_breach(
        &self,
        stop: f64,
        target: f64,
        candle: &Candle,
    ) -> Result<Option<Breach>, PathError> {
        for sub in self.window(candle.timestamp) {
            if sub.low <= stop {
                return Ok(Some(Breach::StopLoss));
            }
            if sub.high >= target {
                return Ok(Some(Breach::Target));
            }
        }
        Ok(None)
    }
}
