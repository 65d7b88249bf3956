//! Core discovery and reconciliation engine for LakeSurveyor.
//!
//! This crate walks a lakehouse catalog (catalog → schema → table), fetches
//! table and column metadata plus sampled statistics, and merges it into a
//! local SQLite store that downstream mapping tooling builds on.
//!
//! # Guarantees
//! - Discovery never deletes stored tables or columns; a column the source
//!   stops reporting keeps its row and id
//! - One table's sync is atomic: its columns and status commit together
//! - Failures are scoped: a catalog, schema or table error is recorded and
//!   the walk continues
//! - Access tokens are never stored in configs, logged or displayed
//!
//! # Architecture
//! - [`catalog::CatalogClient`]: remote catalog/query service boundary
//! - [`sampler::StatisticsSampler`]: bounded per-column profiling
//! - [`reconcile::TableReconciler`]: single-table upsert and column diff
//! - [`discovery::SchemaWalker`]: continue-on-error traversal
//! - [`discovery::DiscoveryOrchestrator`]: sweep, search and refresh entry points

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod sampler;
pub mod security;
pub mod store;

// Re-export commonly used types
pub use catalog::{CatalogClient, DatabricksClient};
pub use config::{ConnectionConfig, DiscoveryConfig, RetryConfig, SamplingConfig, StoreConfig};
pub use discovery::{DiscoveryOrchestrator, DiscoveryReport};
pub use error::{LakeSurveyorError, Result};
pub use models::{AnalysisStatus, SourceColumn, SourceTable, TableKind};
pub use reconcile::{TableReconciler, TableSyncOutcome};
pub use sampler::{ColumnStatistics, StatisticsSampler};
pub use security::AccessToken;
pub use store::SourceStore;
