//! Sequential resolver — decide stop vs target when one candle spans both.
//!
//! A candle's high/low range can contain both the stop price and the target
//! price; OHLC alone cannot say which was visited first. If an intra-candle
//! path provider is available it is asked. Otherwise, and whenever the
//! provider has no answer or fails, the stop-loss is assumed to resolve first.

use crate::components::path::{Breach, IntraCandlePath, Outcome, ResolutionMethod};
use crate::domain::Candle;
use serde::{Deserialize, Serialize};

/// Result of resolving one candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: Outcome,
    pub method: ResolutionMethod,
}

impl Resolution {
    fn new(outcome: Outcome, method: ResolutionMethod) -> Self {
        Self { outcome, method }
    }
}

/// Resolve `candle` against an optional stop level and a target level.
///
/// `target` may be `f64::INFINITY` (no leg left); a non-finite or NaN level
/// never triggers.
pub fn resolve(
    candle: &Candle,
    stop: Option<f64>,
    target: f64,
    path: Option<&dyn IntraCandlePath>,
) -> Resolution {
    let stop_hit = stop.is_some_and(|s| s.is_finite() && candle.low <= s);
    let target_hit = target.is_finite() && candle.high >= target;

    match (stop_hit, target_hit) {
        (false, false) => Resolution::new(Outcome::Neither, ResolutionMethod::NoTrigger),
        (true, false) => Resolution::new(Outcome::StopLoss, ResolutionMethod::Unambiguous),
        (false, true) => Resolution::new(Outcome::TargetHit, ResolutionMethod::Unambiguous),
        (true, true) => {
            // both checked finite above
            let stop = stop.unwrap_or(f64::NEG_INFINITY);
            resolve_collision(candle, stop, target, path)
        }
    }
}

fn resolve_collision(
    candle: &Candle,
    stop: f64,
    target: f64,
    path: Option<&dyn IntraCandlePath>,
) -> Resolution {
    let default = Resolution::new(Outcome::StopLoss, ResolutionMethod::StopFirstDefault);
    let Some(provider) = path else {
        return default;
    };

    match provider.first_breach(stop, target, candle) {
        Ok(Some(Breach::StopLoss)) => {
            Resolution::new(Outcome::StopLoss, ResolutionMethod::IntraCandlePath)
        }
        Ok(Some(Breach::Target)) => {
            Resolution::new(Outcome::TargetHit, ResolutionMethod::IntraCandlePath)
        }
        Ok(None) => default,
        Err(err) => {
            tracing::warn!(
                provider = provider.name(),
                timestamp = candle.timestamp,
                error = %err,
                "intra-candle path lookup failed; assuming stop first"
            );
            default
        }
    }
}
