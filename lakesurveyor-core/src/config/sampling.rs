//! Column profiling configuration.
//!
//! Controls how the statistics sampler bounds its profiling queries.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard cap on the number of sample values kept per column.
pub const MAX_SAMPLE_VALUES: u32 = 5;

/// Configuration for column profiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Whether profiling queries run at all
    pub enabled: bool,
    /// Row ceiling for the distinct-count query
    pub distinct_count_limit: u64,
    /// Number of distinct sample values to keep (at most 5)
    pub sample_value_limit: u32,
    /// Optional delay between profiling queries (milliseconds)
    pub throttle_ms: Option<u64>,
    /// Timeout for a single profiling query (seconds)
    pub query_timeout_secs: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            distinct_count_limit: 1_000_000,
            sample_value_limit: MAX_SAMPLE_VALUES,
            throttle_ms: None,
            query_timeout_secs: 30,
        }
    }
}

impl SamplingConfig {
    /// Creates a new sampling config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to enable or disable profiling.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the distinct-count row ceiling.
    pub fn with_distinct_count_limit(mut self, limit: u64) -> Self {
        self.distinct_count_limit = limit;
        self
    }

    /// Builder method to set the number of sample values, capped at 5.
    pub fn with_sample_value_limit(mut self, limit: u32) -> Self {
        self.sample_value_limit = limit.min(MAX_SAMPLE_VALUES);
        self
    }

    /// Builder method to set throttle delay.
    pub fn with_throttle_ms(mut self, ms: u64) -> Self {
        self.throttle_ms = Some(ms);
        self
    }

    /// Builder method to set query timeout.
    pub fn with_query_timeout_secs(mut self, secs: u64) -> Self {
        self.query_timeout_secs = secs;
        self
    }

    /// Query timeout as a `Duration`.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// Validates the sampling configuration.
    ///
    /// # Errors
    /// Returns error if limits are zero or out of range
    pub fn validate(&self) -> crate::Result<()> {
        if self.distinct_count_limit == 0 {
            return Err(crate::error::LakeSurveyorError::configuration(
                "distinct_count_limit must be greater than 0",
            ));
        }
        if self.sample_value_limit > MAX_SAMPLE_VALUES {
            return Err(crate::error::LakeSurveyorError::configuration(format!(
                "sample_value_limit must not exceed {}",
                MAX_SAMPLE_VALUES
            )));
        }
        if self.query_timeout_secs == 0 {
            return Err(crate::error::LakeSurveyorError::configuration(
                "query_timeout_secs must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampling_config_default() {
        let config = SamplingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.distinct_count_limit, 1_000_000);
        assert_eq!(config.sample_value_limit, 5);
        assert_eq!(config.throttle_ms, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sampling_config_builder() {
        let config = SamplingConfig::new()
            .with_distinct_count_limit(10_000)
            .with_sample_value_limit(50)
            .with_throttle_ms(100)
            .with_query_timeout_secs(5);

        assert_eq!(config.distinct_count_limit, 10_000);
        assert_eq!(config.sample_value_limit, 5);
        assert_eq!(config.throttle_ms, Some(100));
        assert_eq!(config.query_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_sampling_config_validation() {
        let config = SamplingConfig {
            distinct_count_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SamplingConfig {
            sample_value_limit: 6,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
