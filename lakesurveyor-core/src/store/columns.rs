//! `source_columns` reads and writes.

use crate::Result;
use crate::error::LakeSurveyorError;
use crate::models::SourceColumn;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// Rows per multi-row INSERT. 16 parameters each keeps a batch under
/// SQLite's default 999-variable limit.
const INSERT_BATCH_SIZE: usize = 50;
const INSERT_PARAMS_PER_ROW: usize = 16;
const TOUCH_BATCH_SIZE: usize = 500;

/// Every value discovery writes for one column.
///
/// Built by merging fresh source metadata and statistics over the stored
/// row, so writing it never erases a value the source did not supply.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValues {
    pub column_name: String,
    pub column_position: i64,
    pub data_type: String,
    pub physical_data_type: Option<String>,
    pub is_nullable: bool,
    pub column_comment: Option<String>,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub avg_length: Option<f64>,
    pub sample_values: Vec<String>,
}

fn encode_samples(values: &[String]) -> Result<String> {
    serde_json::to_string(values).map_err(|e| LakeSurveyorError::Serialization {
        context: "encode sample values".to_string(),
        source: e,
    })
}

fn column_from_row(row: &SqliteRow) -> std::result::Result<SourceColumn, sqlx::Error> {
    let samples: String = row.try_get("sample_values")?;
    let sample_values = serde_json::from_str(&samples).unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed sample_values ({}): {}", samples, e);
        Vec::new()
    });
    Ok(SourceColumn {
        id: row.try_get("id")?,
        table_id: row.try_get("table_id")?,
        column_name: row.try_get("column_name")?,
        column_position: row.try_get("column_position")?,
        data_type: row.try_get("data_type")?,
        physical_data_type: row.try_get("physical_data_type")?,
        is_nullable: row.try_get("is_nullable")?,
        is_primary_key: row.try_get("is_primary_key")?,
        is_foreign_key: row.try_get("is_foreign_key")?,
        null_count: row.try_get("null_count")?,
        distinct_count: row.try_get("distinct_count")?,
        min_value: row.try_get("min_value")?,
        max_value: row.try_get("max_value")?,
        avg_length: row.try_get("avg_length")?,
        column_comment: row.try_get("column_comment")?,
        business_description: row.try_get("business_description")?,
        sample_values,
        discovered_at: row.try_get("discovered_at")?,
        last_updated: row.try_get("last_updated")?,
    })
}

/// Columns of a table in stored ordinal order.
pub async fn load_for_table(conn: &mut SqliteConnection, table_id: i64) -> Result<Vec<SourceColumn>> {
    let rows = sqlx::query(
        "SELECT id, table_id, column_name, column_position, data_type, physical_data_type, \
         is_nullable, is_primary_key, is_foreign_key, null_count, distinct_count, min_value, \
         max_value, avg_length, column_comment, business_description, sample_values, \
         discovered_at, last_updated \
         FROM source_columns WHERE table_id = ?1 ORDER BY column_position, id",
    )
    .bind(table_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        LakeSurveyorError::persistence_failed(format!("load columns of table {}", table_id), e)
    })?;

    rows.iter()
        .map(column_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| LakeSurveyorError::persistence_failed("decode columns", e))
}

/// Inserts new columns with batched multi-row INSERTs.
pub async fn insert_batch(
    conn: &mut SqliteConnection,
    table_id: i64,
    columns: &[ColumnValues],
    now: DateTime<Utc>,
) -> Result<()> {
    for batch in columns.chunks(INSERT_BATCH_SIZE) {
        let placeholders: Vec<String> = (0..batch.len())
            .map(|i| {
                let base = i * INSERT_PARAMS_PER_ROW + 1;
                let params: Vec<String> = (base..base + INSERT_PARAMS_PER_ROW)
                    .map(|n| format!("?{}", n))
                    .collect();
                format!("({})", params.join(", "))
            })
            .collect();

        let sql = format!(
            "INSERT INTO source_columns (table_id, column_name, column_position, data_type, \
             physical_data_type, is_nullable, column_comment, null_count, distinct_count, \
             min_value, max_value, avg_length, sample_values, discovered_at, last_updated, \
             is_primary_key) VALUES {}",
            placeholders.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for column in batch {
            query = query
                .bind(table_id)
                .bind(&column.column_name)
                .bind(column.column_position)
                .bind(&column.data_type)
                .bind(column.physical_data_type.as_deref())
                .bind(column.is_nullable)
                .bind(column.column_comment.as_deref())
                .bind(column.null_count)
                .bind(column.distinct_count)
                .bind(column.min_value.as_deref())
                .bind(column.max_value.as_deref())
                .bind(column.avg_length)
                .bind(encode_samples(&column.sample_values)?)
                .bind(now)
                .bind(now)
                .bind(false);
        }
        query.execute(&mut *conn).await.map_err(|e| {
            LakeSurveyorError::persistence_failed(
                format!("insert {} columns into table {}", batch.len(), table_id),
                e,
            )
        })?;
    }
    Ok(())
}

/// Rewrites an existing column in place, keeping its id.
///
/// `business_description` and the key flags are left as stored.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    column: &ColumnValues,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE source_columns SET column_position = ?1, data_type = ?2, \
         physical_data_type = ?3, is_nullable = ?4, column_comment = ?5, null_count = ?6, \
         distinct_count = ?7, min_value = ?8, max_value = ?9, avg_length = ?10, \
         sample_values = ?11, last_updated = ?12 WHERE id = ?13",
    )
    .bind(column.column_position)
    .bind(&column.data_type)
    .bind(column.physical_data_type.as_deref())
    .bind(column.is_nullable)
    .bind(column.column_comment.as_deref())
    .bind(column.null_count)
    .bind(column.distinct_count)
    .bind(column.min_value.as_deref())
    .bind(column.max_value.as_deref())
    .bind(column.avg_length)
    .bind(encode_samples(&column.sample_values)?)
    .bind(now)
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        LakeSurveyorError::persistence_failed(format!("update column {}", column.column_name), e)
    })?;
    Ok(())
}

/// Refreshes `last_updated` on the given columns without changing anything else.
pub async fn touch(conn: &mut SqliteConnection, ids: &[i64], now: DateTime<Utc>) -> Result<u64> {
    let mut touched = 0;
    for batch in ids.chunks(TOUCH_BATCH_SIZE) {
        let placeholders: Vec<String> = (0..batch.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "UPDATE source_columns SET last_updated = ?1 WHERE id IN ({})",
            placeholders.join(", ")
        );
        let mut query = sqlx::query(&sql).bind(now);
        for id in batch {
            query = query.bind(*id);
        }
        let result = query
            .execute(&mut *conn)
            .await
            .map_err(|e| LakeSurveyorError::persistence_failed("touch vanished columns", e))?;
        touched += result.rows_affected();
    }
    Ok(touched)
}
