//! Catalog → schema → table traversal.
//!
//! Every scope is continue-on-error: a catalog whose schemas cannot be
//! listed, a schema whose tables cannot be listed and a table that fails to
//! sync are each recorded in the report and the walk moves on to the next
//! sibling.

use super::report::DiscoveryReport;
use crate::catalog::{CatalogClient, DiscoveredTable};
use crate::reconcile::TableReconciler;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which tables of a walk get reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFilter {
    /// Every listed table
    All,
    /// Tables whose name or comment contains the term, case-insensitively
    Matching(String),
}

impl TableFilter {
    pub fn accepts(&self, table: &DiscoveredTable) -> bool {
        match self {
            Self::All => true,
            Self::Matching(term) => table.matches(term),
        }
    }
}

/// Whether the walk should go on after a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    Cancelled,
}

/// Walks the schemas of a catalog, reconciling accepted tables.
pub struct SchemaWalker<'a> {
    client: Arc<dyn CatalogClient>,
    reconciler: &'a TableReconciler,
    cancel: &'a CancellationToken,
    table_throttle: Option<Duration>,
}

impl<'a> SchemaWalker<'a> {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        reconciler: &'a TableReconciler,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            client,
            reconciler,
            cancel,
            table_throttle: None,
        }
    }

    /// Waits this long after each table.
    pub fn with_table_throttle(mut self, throttle_ms: Option<u64>) -> Self {
        self.table_throttle = throttle_ms.filter(|ms| *ms > 0).map(Duration::from_millis);
        self
    }

    /// Walks one catalog.
    pub async fn walk_catalog(
        &self,
        catalog: &str,
        filter: &TableFilter,
        acting_user: &str,
        report: &mut DiscoveryReport,
    ) -> WalkControl {
        if self.cancel.is_cancelled() {
            return WalkControl::Cancelled;
        }

        let schemas = match self.client.list_schemas(catalog).await {
            Ok(schemas) => schemas,
            Err(e) => {
                report.record_error(catalog, e);
                return WalkControl::Continue;
            }
        };
        report.catalogs_processed += 1;
        tracing::info!("Catalog {}: {} schemas", catalog, schemas.len());

        for schema in &schemas {
            if self.cancel.is_cancelled() {
                return WalkControl::Cancelled;
            }
            if self
                .walk_schema(catalog, &schema.name, filter, acting_user, report)
                .await
                == WalkControl::Cancelled
            {
                return WalkControl::Cancelled;
            }
        }
        WalkControl::Continue
    }

    /// Walks one schema.
    pub async fn walk_schema(
        &self,
        catalog: &str,
        schema: &str,
        filter: &TableFilter,
        acting_user: &str,
        report: &mut DiscoveryReport,
    ) -> WalkControl {
        let scope = format!("{}.{}", catalog, schema);
        let tables = match self.client.list_tables(catalog, schema).await {
            Ok(tables) => tables,
            Err(e) => {
                report.record_error(&scope, e);
                return WalkControl::Continue;
            }
        };
        report.schemas_processed += 1;

        let accepted: Vec<&DiscoveredTable> = tables.iter().filter(|t| filter.accepts(t)).collect();
        tracing::info!(
            "Schema {}: {} tables listed, {} to reconcile",
            scope,
            tables.len(),
            accepted.len()
        );

        for table in accepted {
            if self.cancel.is_cancelled() {
                return WalkControl::Cancelled;
            }

            report.tables_discovered += 1;
            match self.reconciler.sync_table(table, acting_user).await {
                Ok(outcome) => report.record_table(&outcome),
                Err(e) => report.record_error(&table.full_name(), e),
            }

            if let Some(delay) = self.table_throttle {
                tokio::time::sleep(delay).await;
            }
        }
        WalkControl::Continue
    }
}
