//! Engine configuration
//!
//! # Environment Variables
//!
//! - `ARMATURE_OT_STRATEGY=timestamp|user-priority|merge|manual` - Conflict strategy
//! - `ARMATURE_OT_EVENT_CAPACITY=<n>` - Session broadcast buffer size

use crate::{OtError, OtResult, ResolutionStrategy};
use serde::{Deserialize, Serialize};
use std::env;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Strategy used for destructive overlaps
    pub strategy: ResolutionStrategy,
    /// Capacity of each session's event channel
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: ResolutionStrategy::Timestamp,
            event_capacity: 1000,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let strategy = env::var("ARMATURE_OT_STRATEGY")
            .ok()
            .and_then(|s| ResolutionStrategy::from_str(&s))
            .unwrap_or(defaults.strategy);

        let event_capacity = env::var("ARMATURE_OT_EVENT_CAPACITY")
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.event_capacity);

        Self {
            strategy,
            event_capacity,
        }
    }

    /// Parse config from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> OtResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.event_capacity == 0 {
            return Err(OtError::Config("eventCapacity must be positive".to_string()));
        }
        Ok(config)
    }

    /// Set the conflict strategy
    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.strategy, ResolutionStrategy::Timestamp);
        assert_eq!(config.event_capacity, 1000);
    }

    #[test]
    fn test_from_json_partial() {
        let config = EngineConfig::from_json(r#"{"strategy":"user-priority"}"#).unwrap();
        assert_eq!(config.strategy, ResolutionStrategy::UserPriority);
        assert_eq!(config.event_capacity, 1000);
    }

    #[test]
    fn test_from_json_rejects_zero_capacity() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"eventCapacity":0}"#),
            Err(OtError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"strategy":"coin-flip"}"#),
            Err(OtError::Serialization(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_strategy(ResolutionStrategy::Merge)
            .with_event_capacity(0);
        assert_eq!(config.strategy, ResolutionStrategy::Merge);
        assert_eq!(config.event_capacity, 1);
    }
}
