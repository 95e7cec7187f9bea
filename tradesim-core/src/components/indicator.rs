//! Precomputed indicator data consumed by signal evaluation.
//!
//! The engine never computes indicators. It receives one `IndicatorSnapshot`
//! per candle (aligned by index) and hands them to the signal evaluator as
//! opaque data. `IndicatorValues` is the series-oriented form upstream
//! indicator libraries usually produce; it converts to aligned snapshots once,
//! before the candle loop.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Named indicator readings for a single candle.
///
/// `BTreeMap` keeps serialization order deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorSnapshot {
    values: BTreeMap<String, f64>,
}

impl IndicatorSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Container for precomputed indicator series, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named indicator series.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Get the indicator value at a specific candle index.
    pub fn get(&self, name: &str, index: usize) -> Option<f64> {
        self.series.get(name).and_then(|v| v.get(index).copied())
    }

    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Snapshot of every series at `index`. Series shorter than `index` are omitted.
    pub fn snapshot(&self, index: usize) -> IndicatorSnapshot {
        let values = self
            .series
            .iter()
            .filter_map(|(name, v)| v.get(index).map(|x| (name.clone(), *x)))
            .collect();
        IndicatorSnapshot { values }
    }

    /// Aligned snapshots for a series of `len` candles.
    pub fn to_snapshots(&self, len: usize) -> Vec<IndicatorSnapshot> {
        (0..len).map(|i| self.snapshot(i)).collect()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
