//! Batch runs — many independent simulations over shared read-only inputs.
//!
//! Runs share no mutable state, so they parallelize with Rayon. Results always
//! come back in input order and equal what sequential calls would return.

use rayon::prelude::*;

use crate::components::{Collaborators, IndicatorSnapshot};
use crate::config::SimulationConfig;
use crate::domain::{Candle, SimulationResult};

use super::loop_runner::simulate;

/// One candle series with its aligned indicator snapshots.
#[derive(Debug, Clone, Copy)]
pub struct SeriesInput<'a> {
    pub candles: &'a [Candle],
    pub indicators: &'a [IndicatorSnapshot],
}

impl<'a> SeriesInput<'a> {
    pub fn new(candles: &'a [Candle], indicators: &'a [IndicatorSnapshot]) -> Self {
        Self {
            candles,
            indicators,
        }
    }
}

/// Runs batches of simulations, in parallel by default.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner<'a> {
    collaborators: Collaborators<'a>,
    parallel: bool,
}

impl<'a> BatchRunner<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self {
            collaborators,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// One series, many strategy configurations (a parameter sweep).
    pub fn run_configs(
        &self,
        series: SeriesInput<'_>,
        configs: &[SimulationConfig],
    ) -> Vec<SimulationResult> {
        self.run_configs_with_progress(series, configs, |_, _, _| {})
    }

    /// Like [`run_configs`](Self::run_configs), invoking `progress(index, total, result)`
    /// as each run completes. Completion order is unspecified when parallel.
    pub fn run_configs_with_progress<F>(
        &self,
        series: SeriesInput<'_>,
        configs: &[SimulationConfig],
        progress: F,
    ) -> Vec<SimulationResult>
    where
        F: Fn(usize, usize, &SimulationResult) + Send + Sync,
    {
        let total = configs.len();
        let run = |(idx, config): (usize, &SimulationConfig)| {
            let result = simulate(series.candles, series.indicators, config, self.collaborators);
            progress(idx, total, &result);
            result
        };
        tracing::debug!(total, parallel = self.parallel, "running config batch");
        if self.parallel {
            configs.par_iter().enumerate().map(run).collect()
        } else {
            configs.iter().enumerate().map(run).collect()
        }
    }

    /// Many series, one strategy configuration.
    pub fn run_series(
        &self,
        series: &[SeriesInput<'_>],
        config: &SimulationConfig,
    ) -> Vec<SimulationResult> {
        let run = |input: &SeriesInput<'_>| {
            simulate(input.candles, input.indicators, config, self.collaborators)
        };
        tracing::debug!(total = series.len(), parallel = self.parallel, "running series batch");
        if self.parallel {
            series.par_iter().map(run).collect()
        } else {
            series.iter().map(run).collect()
        }
    }
}

/// Run every config against the same series in parallel.
pub fn simulate_batch(
    candles: &[Candle],
    indicators: &[IndicatorSnapshot],
    configs: &[SimulationConfig],
    collaborators: Collaborators<'_>,
) -> Vec<SimulationResult> {
    BatchRunner::new(collaborators).run_configs(SeriesInput::new(candles, indicators), configs)
}
