//! Signal evaluation seam.
//!
//! The engine does not parse or interpret signal expressions. It hands the
//! expression, the candle, and indicator context to a `SignalEvaluator` and
//! acts on the boolean answer.

use crate::domain::Candle;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::indicator::IndicatorSnapshot;

/// An opaque signal expression, passed through to the evaluator unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalExpression(pub String);

impl SignalExpression {
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full history view for evaluators that look back across candles.
///
/// Implementations must only read `candles[..=index]`.
#[derive(Debug, Clone, Copy)]
pub struct Lookback<'a> {
    pub candles: &'a [Candle],
    pub indicators: &'a [IndicatorSnapshot],
    pub index: usize,
}

/// Everything an evaluator may see for one decision.
#[derive(Debug, Clone, Copy)]
pub struct SignalContext<'a> {
    pub candle: &'a Candle,
    pub indicators: Option<&'a IndicatorSnapshot>,
    pub previous_indicators: Option<&'a IndicatorSnapshot>,
    pub lookback: Option<Lookback<'a>>,
}

impl<'a> SignalContext<'a> {
    /// Context for candle `index`, with snapshots looked up by index.
    ///
    /// Snapshot slices shorter than the candle series simply yield `None`.
    pub fn at(
        candles: &'a [Candle],
        indicators: &'a [IndicatorSnapshot],
        index: usize,
    ) -> Option<Self> {
        let candle = candles.get(index)?;
        let previous_indicators = index.checked_sub(1).and_then(|p| indicators.get(p));
        Some(Self {
            candle,
            indicators: indicators.get(index),
            previous_indicators,
            lookback: None,
        })
    }

    pub fn with_lookback(
        mut self,
        candles: &'a [Candle],
        indicators: &'a [IndicatorSnapshot],
        index: usize,
    ) -> Self {
        self.lookback = Some(Lookback {
            candles,
            indicators,
            index,
        });
        self
    }
}

/// Black-box signal evaluator.
///
/// # Architecture invariant
/// Evaluators never see trade state (position, stops, PnL). They receive market
/// data and indicator context only.
pub trait SignalEvaluator: Send + Sync {
    fn evaluate(&self, expression: &SignalExpression, ctx: &SignalContext<'_>) -> bool;
}

impl<F> SignalEvaluator for F
where
    F: Fn(&SignalExpression, &SignalContext<'_>) -> bool + Send + Sync,
{
    fn evaluate(&self, expression: &SignalExpression, ctx: &SignalContext<'_>) -> bool {
        self(expression, ctx)
    }
}
