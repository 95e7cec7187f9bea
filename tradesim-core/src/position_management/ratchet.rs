//! Ratchet invariant enforcement
//!
//! **Core Rule:** Stops may tighten, never loosen.
//!
//! For the long positions this engine simulates, tightening means rising. The
//! only way a stop moves down is an explicit `reset` (a re-entry re-derives the
//! stop from the new entry price).

/// Ratchet state for stop-loss management
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RatchetState {
    /// Current stop level (high-water mark)
    current_level: Option<f64>,
}

impl RatchetState {
    /// Create a ratchet with no level yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ratchet with an initial level
    ///
    /// Non-finite levels leave the ratchet unset.
    pub fn with_initial_level(initial_level: f64) -> Self {
        Self {
            current_level: Some(initial_level).filter(|l| l.is_finite()),
        }
    }

    /// Apply ratchet to a proposed stop level
    ///
    /// Returns `true` if the level moved.
    ///
    /// # Rules
    /// - Stop can only rise (max of current and proposed)
    /// - If no current level exists, initializes to proposed level
    /// - Non-finite proposals are ignored
    ///
    /// # Example
    /// ```
    /// use tradesim_core::position_management::RatchetState;
    ///
    /// let mut ratchet = RatchetState::with_initial_level(0.95);
    ///
    /// // Tightening: 0.95 → 1.00 (allowed)
    /// assert!(ratchet.apply(1.00));
    /// assert_eq!(ratchet.current_level(), Some(1.00));
    ///
    /// // Loosening: 1.00 → 0.90 (blocked, stays at 1.00)
    /// assert!(!ratchet.apply(0.90));
    /// assert_eq!(ratchet.current_level(), Some(1.00));
    /// ```
    pub fn apply(&mut self, proposed: f64) -> bool {
        if !proposed.is_finite() {
            return false;
        }
        match self.current_level {
            Some(current) if proposed <= current => false,
            _ => {
                self.current_level = Some(proposed);
                true
            }
        }
    }

    /// Get current ratchet level (if set)
    pub fn current_level(&self) -> Option<f64> {
        self.current_level
    }

    /// Reset the ratchet to a new level, which may be lower than the current one
    pub fn reset(&mut self, new_level: f64) {
        self.current_level = Some(new_level).filter(|l| l.is_finite());
    }

    /// Clear the ratchet state
    pub fn clear(&mut self) {
        self.current_level = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratchet_tightening_allowed() {
        let mut ratchet = RatchetState::with_initial_level(0.95);
        assert!(ratchet.apply(1.0));
        assert_eq!(ratchet.current_level(), Some(1.0));
    }

    #[test]
    fn test_ratchet_loosening_blocked() {
        let mut ratchet = RatchetState::with_initial_level(1.0);
        assert!(!ratchet.apply(0.9));
        assert_eq!(ratchet.current_level(), Some(1.0));
    }

    #[test]
    fn test_ratchet_equal_level_is_not_a_move() {
        let mut ratchet = RatchetState::with_initial_level(1.0);
        assert!(!ratchet.apply(1.0));
    }

    #[test]
    fn test_ratchet_initialization() {
        let mut ratchet = RatchetState::new();
        assert_eq!(ratchet.current_level(), None);
        assert!(ratchet.apply(0.95));
        assert_eq!(ratchet.current_level(), Some(0.95));
    }

    #[test]
    fn test_ratchet_ignores_non_finite() {
        let mut ratchet = RatchetState::with_initial_level(f64::NAN);
        assert_eq!(ratchet.current_level(), None);
        assert!(!ratchet.apply(f64::INFINITY));
        assert!(!ratchet.apply(f64::NAN));
        assert_eq!(ratchet.current_level(), None);
    }

    #[test]
    fn test_ratchet_reset_may_lower() {
        let mut ratchet = RatchetState::with_initial_level(1.2);
        ratchet.reset(0.8);
        assert_eq!(ratchet.current_level(), Some(0.8));

        // Can still only tighten from new level
        assert!(!ratchet.apply(0.7));
        assert_eq!(ratchet.current_level(), Some(0.8));
    }

    #[test]
    fn test_ratchet_clear() {
        let mut ratchet = RatchetState::with_initial_level(1.0);
        ratchet.clear();
        assert_eq!(ratchet.current_level(), None);
        assert!(ratchet.apply(0.5));
    }
}
