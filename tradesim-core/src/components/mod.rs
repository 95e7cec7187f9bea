//! Collaborator seams: indicator data, signal evaluation, intra-candle paths.
//!
//! The engine consumes these as black boxes. All three are optional per run.

pub mod indicator;
pub mod path;
pub mod signal;

pub use indicator::{IndicatorSnapshot, IndicatorValues};
pub use path::{Breach, IntraCandlePath, Outcome, PathError, ResolutionMethod, SubCandlePath};
pub use signal::{Lookback, SignalContext, SignalEvaluator, SignalExpression};

/// Optional collaborators for a simulation run.
#[derive(Clone, Copy, Default)]
pub struct Collaborators<'a> {
    pub signal_evaluator: Option<&'a dyn SignalEvaluator>,
    pub path_provider: Option<&'a dyn IntraCandlePath>,
}

impl<'a> Collaborators<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_signal_evaluator(mut self, evaluator: &'a dyn SignalEvaluator) -> Self {
        self.signal_evaluator = Some(evaluator);
        self
    }

    pub fn with_path_provider(mut self, provider: &'a dyn IntraCandlePath) -> Self {
        self.path_provider = Some(provider);
        self
    }
}

impl std::fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("signal_evaluator", &self.signal_evaluator.is_some())
            .field(
                "path_provider",
                &self.path_provider.map(|p| p.name().to_string()),
            )
            .finish()
    }
}
