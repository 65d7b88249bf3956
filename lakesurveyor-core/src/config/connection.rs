//! Catalog service connection configuration.
//!
//! This module provides the `ConnectionConfig` struct for configuring
//! the workspace endpoint, SQL warehouse, timeouts and retry policy.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

/// Bounded retry policy for transient catalog service failures.
///
/// Applied only at the catalog client boundary; local writes are never
/// retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry (milliseconds)
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay (milliseconds)
    pub max_backoff_ms: u64,
    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = self.backoff_multiplier.max(1.0).powi(exponent as i32);
        let millis = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Configuration for the catalog service connection.
///
/// # Security
/// This struct intentionally does NOT store the access token.
///
/// # Example
/// ```rust
/// use lakesurveyor_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig::new("https://adb-123.azuredatabricks.net")
///     .with_http_path("/sql/1.0/warehouses/abc123def456");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.resolved_warehouse_id().as_deref(), Some("abc123def456"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Workspace host, with or without scheme
    pub host: String,
    /// SQL warehouse HTTP path (`/sql/1.0/warehouses/<id>`)
    pub http_path: Option<String>,
    /// Explicit SQL warehouse id; takes precedence over `http_path`
    pub warehouse_id: Option<String>,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Server-side wait for statement results (5..=50 seconds)
    pub statement_wait_timeout_secs: u64,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            http_path: None,
            warehouse_id: None,
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            statement_wait_timeout_secs: 50,
            retry: RetryConfig::default(),
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig({}{})",
            self.host,
            self.resolved_warehouse_id()
                .map_or_else(String::new, |id| format!(" warehouse={}", id))
        )
    }
}

fn warehouse_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^/?sql/(?:1\.0|protocolv1)/(?:warehouses|endpoints)/([A-Za-z0-9]+)/?$")
            .expect("Invalid warehouse path pattern")
    })
}

impl ConnectionConfig {
    /// Creates a new connection config for a workspace host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the warehouse HTTP path.
    pub fn with_http_path(mut self, http_path: impl Into<String>) -> Self {
        self.http_path = Some(http_path.into());
        self
    }

    /// Builder method to set the warehouse id directly.
    pub fn with_warehouse_id(mut self, warehouse_id: impl Into<String>) -> Self {
        self.warehouse_id = Some(warehouse_id.into());
        self
    }

    /// Builder method to set the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builder method to set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Base URL of the workspace, always with a scheme and no trailing slash.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }

    /// Warehouse id from `warehouse_id`, falling back to `http_path`.
    pub fn resolved_warehouse_id(&self) -> Option<String> {
        if let Some(id) = self.warehouse_id.as_deref().map(str::trim)
            && !id.is_empty()
        {
            return Some(id.to_string());
        }
        let path = self.http_path.as_deref()?.trim();
        warehouse_path_pattern()
            .captures(path)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::error::LakeSurveyorError::configuration(
                "host cannot be empty",
            ));
        }

        url::Url::parse(&self.base_url()).map_err(|e| {
            crate::error::LakeSurveyorError::configuration(format!("invalid host: {}", e))
        })?;

        if self.http_path.is_some() && self.resolved_warehouse_id().is_none() {
            return Err(crate::error::LakeSurveyorError::configuration(
                "http_path must look like /sql/1.0/warehouses/<id>",
            ));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(crate::error::LakeSurveyorError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.request_timeout.as_secs() == 0 {
            return Err(crate::error::LakeSurveyorError::configuration(
                "request_timeout must be greater than 0",
            ));
        }

        if !(5..=50).contains(&self.statement_wait_timeout_secs) {
            return Err(crate::error::LakeSurveyorError::configuration(
                "statement_wait_timeout_secs must be between 5 and 50",
            ));
        }

        if self.retry.max_retries > 10 {
            return Err(crate::error::LakeSurveyorError::configuration(
                "retry.max_retries should not exceed 10",
            ));
        }

        Ok(())
    }
}
