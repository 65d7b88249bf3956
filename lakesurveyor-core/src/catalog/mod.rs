//! Catalog client trait and the Databricks implementation.
//!
//! The discovery engine only talks to the remote catalog through
//! [`CatalogClient`], held as `Arc<dyn CatalogClient>`. Tests substitute an
//! in-memory implementation.
//!
//! # Module Structure
//! - `types`: decoded catalog payloads
//! - `sql`: identifier quoting and probe SQL
//! - `databricks`: Unity Catalog REST + SQL Statement API client

use crate::Result;
use async_trait::async_trait;

pub mod databricks;
pub mod sql;
pub mod types;

pub use databricks::DatabricksClient;
pub use types::{
    CatalogInfo, DiscoveredColumn, DiscoveredTable, QueryRows, SchemaInfo, TableProbe, TableRef,
};

/// Remote catalog/query service.
///
/// # Errors
/// Listing and query methods return [`crate::error::LakeSurveyorError::Connection`]
/// when the service is unreachable or rejects the credentials, and
/// [`crate::error::LakeSurveyorError::QueryExecution`] when a statement fails.
///
/// # Object Safety
/// This trait is object-safe, allowing dynamic dispatch through
/// `Arc<dyn CatalogClient>`.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Lists catalogs and runs a trivial statement.
    async fn test_connection(&self) -> Result<()>;

    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>>;

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>>;

    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<DiscoveredTable>>;

    /// Columns of a table in ordinal order.
    async fn list_columns(&self, full_name: &str) -> Result<Vec<DiscoveredColumn>>;

    /// Runs an ad-hoc read-only statement.
    async fn execute_query(&self, sql: &str) -> Result<QueryRows>;

    /// `SELECT COUNT(*)` over the table.
    async fn count_rows(&self, table: &TableRef) -> Result<i64> {
        let rows = self.execute_query(&sql::count_rows_sql(table)).await?;
        rows.cell(0, 0)
            .and_then(sql::parse_count)
            .ok_or_else(|| {
                crate::error::LakeSurveyorError::query_failed(format!(
                    "row count for {} returned no value",
                    table
                ))
            })
    }

    /// Storage size in bytes, zero when the table kind does not report it.
    async fn table_size(&self, table: &TableRef) -> i64 {
        match self.execute_query(&sql::describe_detail_sql(table)).await {
            Ok(rows) => {
                let index = rows
                    .column_index("sizeInBytes")
                    .unwrap_or(sql::DETAIL_SIZE_INDEX);
                rows.cell(0, index).and_then(sql::parse_count).unwrap_or(0)
            }
            Err(e) => {
                tracing::debug!("DESCRIBE DETAIL unavailable for {}: {}", table, e);
                0
            }
        }
    }

    /// Row count and size together. A failed count leaves `row_count` empty.
    async fn probe_table(&self, table: &TableRef) -> TableProbe {
        let row_count = match self.count_rows(table).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!("Could not count rows of {}: {}", table, e);
                None
            }
        };
        TableProbe {
            row_count,
            size_bytes: self.table_size(table).await,
        }
    }

    /// Releases the underlying connection resources.
    async fn close(&self) {}
}
