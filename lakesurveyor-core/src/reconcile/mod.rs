//! Single-table reconciliation.
//!
//! [`TableReconciler::sync_table`] brings one table and its columns in line
//! with the source. Remote work (column listing, probes, profiling) happens
//! first; the local writes then run in one transaction, so a failure leaves
//! the stored table exactly as it was before the sync apart from its status
//! being set to `failed`.
//!
//! Columns are never deleted. A column the source stops reporting keeps its
//! row and id; only its `last_updated` is refreshed.

pub mod diff;
pub mod locks;

pub use diff::{ColumnPlan, ProfiledColumn, merge_values, plan_columns, restat_values};
pub use locks::TableLocks;

use crate::Result;
use crate::catalog::{CatalogClient, DiscoveredColumn, DiscoveredTable, TableProbe};
use crate::error::LakeSurveyorError;
use crate::models::{AnalysisStatus, SourceColumn, SourceTable};
use crate::sampler::StatisticsSampler;
use crate::store::{SourceStore, columns, tables};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, Transaction};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Result of syncing one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSyncOutcome {
    pub full_table_name: String,
    pub table_id: i64,
    /// True when the table row was inserted by this sync
    pub created: bool,
    pub columns_created: usize,
    pub columns_updated: usize,
    /// Stored columns the source no longer reports
    pub columns_vanished: usize,
}

/// Syncs individual tables into the local store.
pub struct TableReconciler {
    client: Arc<dyn CatalogClient>,
    sampler: StatisticsSampler,
    store: SourceStore,
    locks: TableLocks,
}

impl TableReconciler {
    /// Creates a reconciler using the process-wide table locks.
    pub fn new(client: Arc<dyn CatalogClient>, sampler: StatisticsSampler, store: SourceStore) -> Self {
        Self {
            client,
            sampler,
            store,
            locks: TableLocks::global().clone(),
        }
    }

    /// Uses a dedicated lock registry instead of the process-wide one.
    pub fn with_locks(mut self, locks: TableLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn store(&self) -> &SourceStore {
        &self.store
    }

    /// Upserts one table and its columns.
    ///
    /// # Errors
    /// Returns the remote or persistence error that stopped the sync. The
    /// table's status is then `failed` if it was already stored; a table
    /// seen for the first time leaves no row behind.
    pub async fn sync_table(
        &self,
        table: &DiscoveredTable,
        acting_user: &str,
    ) -> Result<TableSyncOutcome> {
        let full_name = table.full_name();
        let _guard = self.locks.lock(&full_name).await;
        tracing::debug!("Syncing {}", full_name);

        match self.sync_locked(table, &full_name, acting_user).await {
            Ok(outcome) => {
                tracing::info!(
                    "Synced {} ({}): {} columns created, {} updated, {} vanished",
                    full_name,
                    if outcome.created { "created" } else { "updated" },
                    outcome.columns_created,
                    outcome.columns_updated,
                    outcome.columns_vanished
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("Sync of {} failed: {}", full_name, e);
                self.mark_failed(&full_name).await;
                Err(e)
            }
        }
    }

    async fn sync_locked(
        &self,
        table: &DiscoveredTable,
        full_name: &str,
        acting_user: &str,
    ) -> Result<TableSyncOutcome> {
        let discovered = dedupe_columns(full_name, self.client.list_columns(full_name).await?);
        let table_ref = table.table_ref();
        let probe = self.client.probe_table(&table_ref).await;

        let mut profiled = Vec::with_capacity(discovered.len());
        for column in discovered {
            let stats = self
                .sampler
                .profile_column(&table_ref, &column.name, column.profile_type())
                .await;
            profiled.push(ProfiledColumn { column, stats });
        }

        let mut tx = self.store.begin().await?;
        match persist_table(&mut tx, table, &probe, &profiled, acting_user).await {
            Ok(outcome) => {
                tx.commit().await.map_err(|e| {
                    LakeSurveyorError::persistence_failed(format!("commit {}", full_name), e)
                })?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!("Rollback of {} failed: {}", full_name, rollback);
                }
                Err(e)
            }
        }
    }

    /// Re-probes a stored table and re-profiles its stored columns.
    ///
    /// Returns `Ok(false)` when the table is not stored. Column metadata is
    /// left as is; only statistics, row count and size change. A failed row
    /// count keeps the stored count, like a failed statistic.
    ///
    /// # Errors
    /// Returns error if a write fails; the table's status is then `failed`.
    pub async fn refresh_table(&self, full_name: &str) -> Result<bool> {
        let _guard = self.locks.lock(full_name).await;

        let Some(stored) = self.store.find_table(full_name).await? else {
            tracing::warn!("Cannot refresh unknown table {}", full_name);
            return Ok(false);
        };

        match self.refresh_locked(&stored).await {
            Ok(()) => {
                tracing::info!("Refreshed statistics for {}", full_name);
                Ok(true)
            }
            Err(e) => {
                tracing::error!("Refresh of {} failed: {}", full_name, e);
                self.mark_failed(full_name).await;
                Err(e)
            }
        }
    }

    async fn refresh_locked(&self, stored: &SourceTable) -> Result<()> {
        let table_id = stored.id;
        let full_name = stored.full_table_name.as_str();
        let table_ref = stored.table_ref();
        let probe = self.client.probe_table(&table_ref).await;

        let stored_columns = self.store.list_columns(table_id).await?;
        let mut values = Vec::with_capacity(stored_columns.len());
        for column in &stored_columns {
            let profile_type = column
                .physical_data_type
                .as_deref()
                .unwrap_or(&column.data_type);
            let stats = self
                .sampler
                .profile_column(&table_ref, &column.column_name, profile_type)
                .await;
            values.push((column.id, restat_values(column, &stats)));
        }

        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let written: Result<()> = async {
            tables::update_probe(&mut tx, table_id, &probe, now).await?;
            for (id, column) in &values {
                columns::update(&mut tx, *id, column, now).await?;
            }
            tables::mark_completed(&mut tx, table_id, now).await
        }
        .await;

        match written {
            Ok(()) => tx.commit().await.map_err(|e| {
                LakeSurveyorError::persistence_failed(format!("commit refresh of {}", full_name), e)
            }),
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!("Rollback of {} failed: {}", full_name, rollback);
                }
                Err(e)
            }
        }
    }

    async fn mark_failed(&self, full_name: &str) {
        match self
            .store
            .set_table_status(full_name, AnalysisStatus::Failed)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!("{} not stored, no status to mark", full_name),
            Err(e) => tracing::warn!("Could not mark {} as failed: {}", full_name, e),
        }
    }
}

/// Drops repeated column names, keeping the first occurrence.
fn dedupe_columns(full_name: &str, columns: Vec<DiscoveredColumn>) -> Vec<DiscoveredColumn> {
    let mut seen = HashSet::with_capacity(columns.len());
    columns
        .into_iter()
        .filter(|c| {
            let first = seen.insert(c.name.clone());
            if !first {
                tracing::warn!(
                    "{} reports column '{}' more than once; keeping the first",
                    full_name,
                    c.name
                );
            }
            first
        })
        .collect()
}

/// Writes one table and its columns inside `tx`.
async fn persist_table(
    tx: &mut Transaction<'static, Sqlite>,
    table: &DiscoveredTable,
    probe: &TableProbe,
    profiled: &[ProfiledColumn],
    acting_user: &str,
) -> Result<TableSyncOutcome> {
    let full_name = table.full_name();
    let now = Utc::now();

    let (table_id, created) = match tables::find_by_full_name(tx, &full_name).await? {
        Some(existing) => {
            tables::update_from_source(tx, existing.id, table, probe, now).await?;
            (existing.id, false)
        }
        None => (
            tables::insert(tx, table, probe, acting_user, now).await?,
            true,
        ),
    };

    let existing: HashMap<String, SourceColumn> = columns::load_for_table(tx, table_id)
        .await?
        .into_iter()
        .map(|c| (c.column_name.clone(), c))
        .collect();

    let plan = plan_columns(&existing, profiled);
    tracing::debug!(
        "{}: {} to create, {} to update, {} vanished",
        full_name,
        plan.creates.len(),
        plan.updates.len(),
        plan.vanished.len()
    );

    columns::insert_batch(tx, table_id, &plan.creates, now).await?;
    for (id, values) in &plan.updates {
        columns::update(tx, *id, values, now).await?;
    }
    if !plan.vanished.is_empty() {
        let touched = columns::touch(tx, &plan.vanished, now).await?;
        tracing::info!(
            "{}: {} stored columns no longer reported by the source",
            full_name,
            touched
        );
    }

    tables::mark_completed(tx, table_id, now).await?;

    Ok(TableSyncOutcome {
        full_table_name: full_name,
        table_id,
        created,
        columns_created: plan.creates.len(),
        columns_updated: plan.updates.len(),
        columns_vanished: plan.vanished.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut repeated = DiscoveredColumn::new("id", 3, "STRING");
        repeated.comment = Some("second copy".to_string());
        let columns = vec![
            DiscoveredColumn::new("id", 1, "BIGINT"),
            DiscoveredColumn::new("name", 2, "STRING"),
            repeated,
        ];

        let kept = dedupe_columns("c.s.t", columns);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].name, "id");
        assert_eq!(kept[0].type_name, "BIGINT");
        assert_eq!(kept[1].name, "name");
    }
}
