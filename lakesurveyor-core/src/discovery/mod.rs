//! Top-level discovery entry points.
//!
//! [`DiscoveryOrchestrator`] runs a sweep (every table of the given or
//! discovered catalogs) or a search (tables whose name or comment contains a
//! term). Both route tables through the same [`TableReconciler`] and return
//! one [`DiscoveryReport`]. Nothing is carried over between invocations.
//!
//! Only one failure escapes an invocation: the catalog list could not be
//! fetched when no catalogs were given. Everything else is recorded in the
//! report and the walk continues.

mod report;
mod walker;

pub use report::{CANCELLED_ENTRY, DiscoveryReport};
pub use walker::{SchemaWalker, TableFilter, WalkControl};

use crate::Result;
use crate::catalog::CatalogClient;
use crate::config::DiscoveryConfig;
use crate::reconcile::{TableLocks, TableReconciler};
use crate::sampler::StatisticsSampler;
use crate::store::SourceStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Discovery engine bound to one catalog client and one local store.
///
/// # Example
/// ```rust,no_run
/// use lakesurveyor_core::catalog::{CatalogClient, DatabricksClient};
/// use lakesurveyor_core::config::{ConnectionConfig, DiscoveryConfig, StoreConfig};
/// use lakesurveyor_core::discovery::DiscoveryOrchestrator;
/// use lakesurveyor_core::security::AccessToken;
/// use lakesurveyor_core::store::SourceStore;
/// use std::sync::Arc;
///
/// # async fn example() -> lakesurveyor_core::Result<()> {
/// let client: Arc<dyn CatalogClient> = Arc::new(DatabricksClient::new(
///     ConnectionConfig::new("adb-123.azuredatabricks.net")
///         .with_http_path("/sql/1.0/warehouses/abc123"),
///     AccessToken::new("dapi...".to_string()),
/// )?);
/// let store = SourceStore::open(&StoreConfig::default()).await?;
/// let orchestrator = DiscoveryOrchestrator::new(client.clone(), store, DiscoveryConfig::default());
///
/// let catalogs = vec!["oztest_dev".to_string()];
/// let report = orchestrator.run_sweep(Some(&catalogs), "analyst@example.com").await?;
/// println!("{}", report);
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct DiscoveryOrchestrator {
    client: Arc<dyn CatalogClient>,
    reconciler: TableReconciler,
    config: DiscoveryConfig,
    cancel: CancellationToken,
}

impl DiscoveryOrchestrator {
    pub fn new(client: Arc<dyn CatalogClient>, store: SourceStore, config: DiscoveryConfig) -> Self {
        let sampler = StatisticsSampler::new(Arc::clone(&client), config.sampling.clone());
        let reconciler = TableReconciler::new(Arc::clone(&client), sampler, store);
        Self {
            client,
            reconciler,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses a caller-owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Uses a dedicated table lock registry.
    pub fn with_locks(mut self, locks: TableLocks) -> Self {
        self.reconciler = self.reconciler.with_locks(locks);
        self
    }

    /// Token that stops the current and future walks at the next table boundary.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &SourceStore {
        self.reconciler.store()
    }

    /// Reconciles every table of the given catalogs, or of every visible
    /// catalog when none are given.
    ///
    /// # Errors
    /// Returns error only if `catalogs` is `None` and the catalog list cannot
    /// be fetched
    pub async fn run_sweep(
        &self,
        catalogs: Option<&[String]>,
        acting_user: &str,
    ) -> Result<DiscoveryReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("sweep", %run_id, acting_user);
        self.run(catalogs, TableFilter::All, acting_user)
            .instrument(span)
            .await
    }

    /// Reconciles tables whose name or comment contains `term`
    /// (case-insensitive).
    ///
    /// # Errors
    /// Returns error only if `catalogs` is `None` and the catalog list cannot
    /// be fetched
    pub async fn run_search(
        &self,
        term: &str,
        catalogs: Option<&[String]>,
        acting_user: &str,
    ) -> Result<DiscoveryReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("search", %run_id, term, acting_user);
        self.run(catalogs, TableFilter::Matching(term.to_string()), acting_user)
            .instrument(span)
            .await
    }

    /// Re-probes and re-profiles one stored table.
    ///
    /// Returns false if the table is unknown, or if a write failed (the table
    /// is then marked `failed`). A failed row count keeps the stored count.
    pub async fn refresh_statistics(&self, full_table_name: &str) -> bool {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("refresh", %run_id, table = full_table_name);
        async {
            match self.reconciler.refresh_table(full_table_name).await {
                Ok(refreshed) => refreshed,
                Err(e) => {
                    tracing::warn!("Statistics refresh of {} failed: {}", full_table_name, e);
                    false
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        catalogs: Option<&[String]>,
        filter: TableFilter,
        acting_user: &str,
    ) -> Result<DiscoveryReport> {
        let catalogs: Vec<String> = match catalogs {
            Some(list) => list.to_vec(),
            None => self
                .client
                .list_catalogs()
                .await?
                .into_iter()
                .map(|c| c.name)
                .collect(),
        };
        tracing::info!("Starting discovery over {} catalogs", catalogs.len());

        let walker = SchemaWalker::new(Arc::clone(&self.client), &self.reconciler, &self.cancel)
            .with_table_throttle(self.config.table_throttle_ms);

        let mut report = DiscoveryReport::new();
        for catalog in &catalogs {
            if walker
                .walk_catalog(catalog, &filter, acting_user, &mut report)
                .await
                == WalkControl::Cancelled
            {
                report.record_cancelled();
                break;
            }
        }

        tracing::info!("Discovery finished: {}", report);
        Ok(report)
    }
}
