//! Consolidated outcome of one discovery invocation.

use crate::reconcile::TableSyncOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error entry recorded when a walk is cancelled.
pub const CANCELLED_ENTRY: &str = "sweep cancelled";

/// Counters and scoped errors for one sweep or search.
///
/// Error entries read `"<scope>: <message>"`, where the scope is a catalog
/// name, a `catalog.schema` pair or a fully-qualified table name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub catalogs_processed: usize,
    pub schemas_processed: usize,
    pub tables_discovered: usize,
    pub tables_created: usize,
    pub tables_updated: usize,
    pub columns_created: usize,
    pub columns_updated: usize,
    pub errors: Vec<String>,
}

impl DiscoveryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure scoped to a catalog, schema or table.
    pub fn record_error(&mut self, scope: &str, error: impl fmt::Display) {
        let entry = format!("{}: {}", scope, error);
        tracing::warn!("{}", entry);
        self.errors.push(entry);
    }

    /// Records the cancellation entry once.
    pub fn record_cancelled(&mut self) {
        if !self.was_cancelled() {
            tracing::warn!("Discovery cancelled");
            self.errors.push(CANCELLED_ENTRY.to_string());
        }
    }

    pub fn was_cancelled(&self) -> bool {
        self.errors.iter().any(|e| e == CANCELLED_ENTRY)
    }

    /// Adds the counts from one successful table sync.
    pub fn record_table(&mut self, outcome: &TableSyncOutcome) {
        if outcome.created {
            self.tables_created += 1;
        } else {
            self.tables_updated += 1;
        }
        self.columns_created += outcome.columns_created;
        self.columns_updated += outcome.columns_updated;
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} catalogs, {} schemas, {} tables discovered ({} created, {} updated), \
             {} columns created, {} columns updated, {} errors",
            self.catalogs_processed,
            self.schemas_processed,
            self.tables_discovered,
            self.tables_created,
            self.tables_updated,
            self.columns_created,
            self.columns_updated,
            self.errors.len()
        )
    }
}
