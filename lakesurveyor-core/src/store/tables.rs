//! `source_tables` reads and writes.
//!
//! All functions take a `SqliteConnection` so they run the same way on a
//! pooled connection or inside a transaction (`&mut **tx`).

use crate::Result;
use crate::catalog::{DiscoveredTable, TableProbe};
use crate::error::LakeSurveyorError;
use crate::models::{AnalysisStatus, SourceTable, TableKind};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

const SELECT_TABLE: &str = "SELECT id, catalog_name, schema_name, table_name, full_table_name, \
     table_type, table_format, location, owner, source_owners, row_count, size_bytes, \
     discovered_by, discovered_at, last_updated, last_analyzed, is_active, analysis_status, \
     analysis_notes FROM source_tables";

fn table_from_row(row: &SqliteRow) -> std::result::Result<SourceTable, sqlx::Error> {
    let table_type: String = row.try_get("table_type")?;
    let status: String = row.try_get("analysis_status")?;
    Ok(SourceTable {
        id: row.try_get("id")?,
        catalog_name: row.try_get("catalog_name")?,
        schema_name: row.try_get("schema_name")?,
        table_name: row.try_get("table_name")?,
        full_table_name: row.try_get("full_table_name")?,
        table_type: TableKind::parse(&table_type).unwrap_or_default(),
        table_format: row.try_get("table_format")?,
        location: row.try_get("location")?,
        owner: row.try_get("owner")?,
        source_owners: row.try_get("source_owners")?,
        row_count: row.try_get("row_count")?,
        size_bytes: row.try_get("size_bytes")?,
        discovered_by: row.try_get("discovered_by")?,
        discovered_at: row.try_get("discovered_at")?,
        last_updated: row.try_get("last_updated")?,
        last_analyzed: row.try_get("last_analyzed")?,
        is_active: row.try_get("is_active")?,
        analysis_status: AnalysisStatus::parse(&status).unwrap_or_default(),
        analysis_notes: row.try_get("analysis_notes")?,
    })
}

/// Looks a table up by its natural key.
pub async fn find_by_full_name(
    conn: &mut SqliteConnection,
    full_name: &str,
) -> Result<Option<SourceTable>> {
    let row = sqlx::query(&format!("{} WHERE full_table_name = ?1", SELECT_TABLE))
        .bind(full_name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| LakeSurveyorError::persistence_failed(format!("load table {}", full_name), e))?;

    row.as_ref()
        .map(table_from_row)
        .transpose()
        .map_err(|e| LakeSurveyorError::persistence_failed(format!("decode table {}", full_name), e))
}

/// All stored tables ordered by natural key.
pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<SourceTable>> {
    let rows = sqlx::query(&format!("{} ORDER BY full_table_name", SELECT_TABLE))
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| LakeSurveyorError::persistence_failed("list tables", e))?;

    rows.iter()
        .map(table_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| LakeSurveyorError::persistence_failed("decode tables", e))
}

/// Inserts a newly discovered table in `analyzing` state.
pub async fn insert(
    conn: &mut SqliteConnection,
    table: &DiscoveredTable,
    probe: &TableProbe,
    discovered_by: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let full_name = table.full_name();
    let result = sqlx::query(
        "INSERT INTO source_tables (catalog_name, schema_name, table_name, full_table_name, \
         table_type, table_format, location, owner, row_count, size_bytes, discovered_by, \
         discovered_at, last_updated, is_active, analysis_status) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12, 1, ?13)",
    )
    .bind(&table.catalog_name)
    .bind(&table.schema_name)
    .bind(&table.name)
    .bind(&full_name)
    .bind(table.kind.as_str())
    .bind(table.format.as_deref())
    .bind(table.location.as_deref())
    .bind(table.owner.as_deref())
    .bind(probe.row_count)
    .bind(probe.size_bytes)
    .bind(discovered_by)
    .bind(now)
    .bind(AnalysisStatus::Analyzing.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| LakeSurveyorError::persistence_failed(format!("insert table {}", full_name), e))?;

    Ok(result.last_insert_rowid())
}

/// Overwrites source-owned attributes of an existing table.
///
/// Optional attributes the source did not supply keep their stored value.
/// Locally curated columns (`source_owners`, `analysis_notes`, `is_active`,
/// `discovered_by`, `discovered_at`) are never written.
pub async fn update_from_source(
    conn: &mut SqliteConnection,
    id: i64,
    table: &DiscoveredTable,
    probe: &TableProbe,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE source_tables SET table_type = ?1, \
         table_format = COALESCE(?2, table_format), \
         location = COALESCE(?3, location), \
         owner = COALESCE(?4, owner), \
         row_count = COALESCE(?5, row_count), \
         size_bytes = ?6, \
         analysis_status = ?7, \
         last_updated = ?8 \
         WHERE id = ?9",
    )
    .bind(table.kind.as_str())
    .bind(table.format.as_deref())
    .bind(table.location.as_deref())
    .bind(table.owner.as_deref())
    .bind(probe.row_count)
    .bind(probe.size_bytes)
    .bind(AnalysisStatus::Analyzing.as_str())
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        LakeSurveyorError::persistence_failed(format!("update table {}", table.full_name()), e)
    })?;
    Ok(())
}

/// Writes fresh probe results only.
pub async fn update_probe(
    conn: &mut SqliteConnection,
    id: i64,
    probe: &TableProbe,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE source_tables SET row_count = COALESCE(?1, row_count), size_bytes = ?2, \
         last_updated = ?3 WHERE id = ?4",
    )
    .bind(probe.row_count)
    .bind(probe.size_bytes)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| LakeSurveyorError::persistence_failed(format!("update probe for table {}", id), e))?;
    Ok(())
}

/// Marks a sync finished: `completed` plus `last_analyzed`.
pub async fn mark_completed(
    conn: &mut SqliteConnection,
    id: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE source_tables SET analysis_status = ?1, last_analyzed = ?2, last_updated = ?2 \
         WHERE id = ?3",
    )
    .bind(AnalysisStatus::Completed.as_str())
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| LakeSurveyorError::persistence_failed(format!("complete table {}", id), e))?;
    Ok(())
}

/// Sets the analysis status by natural key. Returns false if no row matched.
pub async fn set_status(
    conn: &mut SqliteConnection,
    full_name: &str,
    status: AnalysisStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE source_tables SET analysis_status = ?1, last_updated = ?2 \
         WHERE full_table_name = ?3",
    )
    .bind(status.as_str())
    .bind(now)
    .bind(full_name)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        LakeSurveyorError::persistence_failed(format!("set status of {}", full_name), e)
    })?;
    Ok(result.rows_affected() > 0)
}
