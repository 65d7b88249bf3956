//! Configuration types for the discovery engine.
//!
//! This module contains all configuration structures:
//! - `ConnectionConfig`: catalog service endpoint, timeouts, retry policy
//! - `SamplingConfig`: column profiling limits and throttling
//! - `DiscoveryConfig`: walk-level settings
//! - `StoreConfig`: local store location
//!
//! # Security
//! These configuration structs intentionally do NOT store access tokens.
//! Tokens are held separately in [`crate::security::AccessToken`].

mod connection;
mod discovery;
mod sampling;

pub use connection::{ConnectionConfig, RetryConfig};
pub use discovery::{DiscoveryConfig, StoreConfig};
pub use sampling::{MAX_SAMPLE_VALUES, SamplingConfig};
