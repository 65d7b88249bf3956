//! Local store DDL.
//!
//! Statements are idempotent and run every time the store is opened.

use crate::Result;
use crate::error::LakeSurveyorError;
use sqlx::SqlitePool;

const CREATE_SOURCE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS source_tables (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    catalog_name TEXT NOT NULL,
    schema_name TEXT NOT NULL,
    table_name TEXT NOT NULL,
    full_table_name TEXT NOT NULL UNIQUE,
    table_type TEXT NOT NULL DEFAULT 'TABLE',
    table_format TEXT,
    location TEXT,
    owner TEXT,
    source_owners TEXT,
    row_count INTEGER,
    size_bytes INTEGER,
    discovered_by TEXT,
    discovered_at TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    last_analyzed TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    analysis_status TEXT NOT NULL DEFAULT 'pending'
        CHECK (analysis_status IN ('pending', 'analyzing', 'completed', 'failed')),
    analysis_notes TEXT
)
"#;

const CREATE_SOURCE_COLUMNS: &str = r#"
CREATE TABLE IF NOT EXISTS source_columns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    table_id INTEGER NOT NULL REFERENCES source_tables(id),
    column_name TEXT NOT NULL,
    column_position INTEGER NOT NULL,
    data_type TEXT NOT NULL,
    physical_data_type TEXT,
    is_nullable INTEGER NOT NULL DEFAULT 1,
    is_primary_key INTEGER NOT NULL DEFAULT 0,
    is_foreign_key INTEGER NOT NULL DEFAULT 0,
    null_count INTEGER,
    distinct_count INTEGER,
    min_value TEXT,
    max_value TEXT,
    avg_length REAL,
    column_comment TEXT,
    business_description TEXT,
    sample_values TEXT NOT NULL DEFAULT '[]',
    discovered_at TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    UNIQUE (table_id, column_name)
)
"#;

const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_source_tables_catalog_schema \
     ON source_tables (catalog_name, schema_name)",
    "CREATE INDEX IF NOT EXISTS idx_source_columns_table ON source_columns (table_id)",
];

/// Creates tables and indexes if they do not exist.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    let mut statements = vec![CREATE_SOURCE_TABLES, CREATE_SOURCE_COLUMNS];
    statements.extend_from_slice(CREATE_INDEXES);

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| LakeSurveyorError::persistence_failed("failed to create store schema", e))?;
    }
    tracing::debug!("Store schema ready");
    Ok(())
}
