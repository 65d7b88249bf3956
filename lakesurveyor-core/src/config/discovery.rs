//! Walk-level and local store configuration.

use super::SamplingConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a discovery walk.
///
/// # Example
/// ```rust
/// use lakesurveyor_core::config::{DiscoveryConfig, SamplingConfig};
///
/// let config = DiscoveryConfig::new()
///     .with_sampling(SamplingConfig::new().with_enabled(false))
///     .with_table_throttle_ms(50);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Column profiling settings
    pub sampling: SamplingConfig,
    /// Optional delay between tables (milliseconds)
    pub table_throttle_ms: Option<u64>,
}

impl DiscoveryConfig {
    /// Creates a new discovery config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set sampling config.
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Builder method to set the delay between tables.
    pub fn with_table_throttle_ms(mut self, ms: u64) -> Self {
        self.table_throttle_ms = Some(ms);
        self
    }

    /// Validates the discovery configuration.
    ///
    /// # Errors
    /// Returns error if the nested sampling config is invalid
    pub fn validate(&self) -> crate::Result<()> {
        self.sampling.validate()
    }
}

/// Location and pool size of the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// sqlx SQLite URL (`sqlite://path.db`, `sqlite::memory:`)
    pub url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://lakesurveyor.db".to_string(),
            max_connections: 5,
        }
    }
}

impl StoreConfig {
    /// Creates a store config for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// An in-memory store. Uses a single connection so every query sees the
    /// same database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    /// Returns true for in-memory URLs.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Validates the store configuration.
    ///
    /// # Errors
    /// Returns error for non-SQLite URLs or a zero pool size
    pub fn validate(&self) -> crate::Result<()> {
        if !self.url.starts_with("sqlite:") {
            return Err(crate::error::LakeSurveyorError::configuration(
                "store url must be a sqlite: URL",
            ));
        }
        if self.max_connections == 0 {
            return Err(crate::error::LakeSurveyorError::configuration(
                "max_connections must be greater than 0",
            ));
        }
        if self.max_connections > 100 {
            return Err(crate::error::LakeSurveyorError::configuration(
                "max_connections should not exceed 100",
            ));
        }
        Ok(())
    }
}
