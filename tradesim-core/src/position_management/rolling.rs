//! Rolling peak — highest high over the last N candles.
//!
//! Monotonic deque: each candle is pushed and popped at most once, so a full
//! pass over `n` candles costs O(n) regardless of the window size.

use std::collections::VecDeque;

/// Sliding-window maximum of candle highs.
///
/// A window of `0` means unbounded: the peak since the last `clear`.
#[derive(Debug, Clone, Default)]
pub struct RollingPeak {
    window: usize,
    /// (candle index, high), highs strictly decreasing front to back
    deque: VecDeque<(usize, f64)>,
}

impl RollingPeak {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            deque: VecDeque::new(),
        }
    }

    /// Push the high of candle `index` and return the window peak.
    ///
    /// Indices must be non-decreasing between clears. NaN highs are skipped.
    pub fn push(&mut self, index: usize, high: f64) -> Option<f64> {
        if !high.is_nan() {
            while self.deque.back().is_some_and(|&(_, h)| h <= high) {
                self.deque.pop_back();
            }
            self.deque.push_back((index, high));
        }
        if self.window > 0 {
            let oldest = (index + 1).saturating_sub(self.window);
            while self.deque.front().is_some_and(|&(i, _)| i < oldest) {
                self.deque.pop_front();
            }
        }
        self.peak()
    }

    pub fn peak(&self) -> Option<f64> {
        self.deque.front().map(|&(_, h)| h)
    }

    /// Forget all candles (used when a re-entry restarts the window).
    pub fn clear(&mut self) {
        self.deque.clear();
    }
}
