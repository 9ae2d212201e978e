//! Orchestrator configuration
//!
//! Every field has a default, and `#[serde(default)]` lets scenario files
//! override only what they care about.

use crate::models::location::BlockPos;
use crate::orchestrator::engine::LogisticsError;
use serde::{Deserialize, Serialize};

/// Where the solver runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverMode {
    /// Dedicated worker thread (`courier-solver`)
    #[default]
    Background,
    /// Calling thread; output is still committed on the next tick
    Inline,
}

/// What happens to demand the engine could not turn into active work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandRetention {
    /// Unserved demand and instructions dropped at commit are forgotten;
    /// resubmission is up to the original requester
    #[default]
    Discard,
    /// Unserved demand (including partial remainders) and dropped
    /// instructions go back into the demand queue with their original id,
    /// priority and creation tick
    Requeue,
}

/// Courier state machine timing and geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Ticks spent in PICKING_UP / DEPOSITING before acting
    pub action_duration_ticks: usize,

    /// Courier counts as arrived within this many blocks of its target
    pub arrival_distance: u32,

    /// Ticks a courier may stay in one state before its instruction fails
    pub state_timeout_ticks: usize,

    /// Added to a warehouse position to get the spot couriers walk to
    pub approach_offset: BlockPos,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            action_duration_ticks: 20,
            arrival_distance: 2,
            state_timeout_ticks: 1_200,
            approach_offset: BlockPos::new(0, 1, 0),
        }
    }
}

/// Complete logistics engine configuration
///
/// # Example
/// ```
/// use courier_logistics_core::{DemandRetention, LogisticsConfig, SolverMode};
///
/// let config: LogisticsConfig =
///     serde_json::from_str(r#"{"solver_mode": "inline", "demand_retention": "requeue"}"#).unwrap();
/// assert_eq!(config.solver_mode, SolverMode::Inline);
/// assert_eq!(config.demand_retention, DemandRetention::Requeue);
/// assert_eq!(config.courier.action_duration_ticks, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticsConfig {
    pub solver_mode: SolverMode,

    pub demand_retention: DemandRetention,

    /// Re-read every registered warehouse this often (None = no polling)
    pub poll_interval_ticks: Option<usize>,

    /// Events retained by the in-memory event log
    pub event_log_capacity: usize,

    pub courier: CourierConfig,
}

impl Default for LogisticsConfig {
    fn default() -> Self {
        Self {
            solver_mode: SolverMode::Background,
            demand_retention: DemandRetention::Discard,
            poll_interval_ticks: Some(100),
            event_log_capacity: 100_000,
            courier: CourierConfig::default(),
        }
    }
}

impl LogisticsConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, LogisticsError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(LogisticsError::InvalidConfig)?;
        Ok(config)
    }

    /// Check internal consistency; returns a description of the first problem
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ticks == Some(0) {
            return Err("poll_interval_ticks must be > 0 when set".to_string());
        }

        if self.event_log_capacity == 0 {
            return Err("event_log_capacity must be > 0".to_string());
        }

        if self.courier.state_timeout_ticks == 0 {
            return Err("courier.state_timeout_ticks must be > 0".to_string());
        }

        // A courier waiting out an action must not time out first
        if self.courier.action_duration_ticks >= self.courier.state_timeout_ticks {
            return Err(format!(
                "courier.action_duration_ticks ({}) must be below courier.state_timeout_ticks ({})",
                self.courier.action_duration_ticks, self.courier.state_timeout_ticks
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LogisticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_action_longer_than_timeout_rejected() {
        let mut config = LogisticsConfig::default();
        config.courier.action_duration_ticks = 50;
        config.courier.state_timeout_ticks = 50;

        let err = config.validate().unwrap_err();
        assert!(err.contains("action_duration_ticks"));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = LogisticsConfig::from_json(r#"{"courier": {"arrival_distance": 4}}"#).unwrap();
        assert_eq!(config.courier.arrival_distance, 4);
        assert_eq!(config.courier.state_timeout_ticks, 1_200);
        assert_eq!(config.poll_interval_ticks, Some(100));

        assert!(matches!(
            LogisticsConfig::from_json(r#"{"solver_mode": "sideways"}"#),
            Err(LogisticsError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = LogisticsConfig {
            poll_interval_ticks: Some(0),
            ..LogisticsConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
