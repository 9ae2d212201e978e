//! Time management for the scheduling loop
//!
//! The engine operates in discrete scheduling ticks. Request ages, action
//! waits and state timeouts are all measured in ticks, never wall-clock time.

use serde::{Deserialize, Serialize};

/// Manages scheduling time in discrete ticks
///
/// # Example
/// ```
/// use courier_logistics_core::TimeManager;
///
/// let mut time = TimeManager::new();
/// assert_eq!(time.current_tick(), 0);
///
/// time.advance_tick();
/// assert_eq!(time.current_tick(), 1);
/// assert_eq!(time.ticks_since(0), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeManager {
    /// Total ticks elapsed since the engine started
    current_tick: usize,
}

impl TimeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume counting from a given tick
    pub fn starting_at(tick: usize) -> Self {
        Self { current_tick: tick }
    }

    /// Advance time by one tick
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Get the current tick (total ticks since start)
    pub fn current_tick(&self) -> usize {
        self.current_tick
    }

    /// Ticks elapsed since `tick` (0 if `tick` lies in the future)
    pub fn ticks_since(&self, tick: usize) -> usize {
        self.current_tick.saturating_sub(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_since_future_tick_is_zero() {
        let time = TimeManager::starting_at(5);
        assert_eq!(time.ticks_since(9), 0);
        assert_eq!(time.ticks_since(2), 3);
    }
}
