//! Local SQLite store for discovered tables and columns.
//!
//! The store is opened explicitly with [`SourceStore::open`], which creates
//! the schema if needed, and closed with [`SourceStore::close`]. Foreign keys
//! are enforced so external mapping rows can reference column ids.
//!
//! # Connection Modes
//! - File-based: `sqlite://lakesurveyor.db` (created if missing)
//! - In-memory: `sqlite::memory:` (single pooled connection, kept alive)

pub mod columns;
pub mod schema;
pub mod tables;

pub use columns::ColumnValues;

use crate::Result;
use crate::config::StoreConfig;
use crate::error::LakeSurveyorError;
use crate::models::{AnalysisStatus, SourceColumn, SourceTable};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

/// Handle to the local store.
#[derive(Debug, Clone)]
pub struct SourceStore {
    pool: SqlitePool,
}

impl SourceStore {
    /// Opens (and if needed creates) the store.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the database cannot be opened
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| {
                LakeSurveyorError::configuration(format!("Invalid store URL: {}", e))
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);
        if config.is_in_memory() {
            // An in-memory database lives only as long as its connection.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| LakeSurveyorError::persistence_failed("Failed to open store", e))?;

        schema::ensure_schema(&pool).await?;
        tracing::debug!("Opened store {}", config.url);
        Ok(Self { pool })
    }

    /// The underlying pool, for collaborators that share the database.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| LakeSurveyorError::persistence_failed("Failed to begin transaction", e))
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| LakeSurveyorError::persistence_failed("Failed to acquire connection", e))
    }

    /// Looks a table up by `catalog.schema.table`.
    pub async fn find_table(&self, full_name: &str) -> Result<Option<SourceTable>> {
        let mut conn = self.acquire().await?;
        tables::find_by_full_name(&mut conn, full_name).await
    }

    /// Every stored table.
    pub async fn list_tables(&self) -> Result<Vec<SourceTable>> {
        let mut conn = self.acquire().await?;
        tables::list_all(&mut conn).await
    }

    /// Stored columns of a table in ordinal order.
    pub async fn list_columns(&self, table_id: i64) -> Result<Vec<SourceColumn>> {
        let mut conn = self.acquire().await?;
        columns::load_for_table(&mut conn, table_id).await
    }

    /// Sets a table's analysis status outside any sync transaction.
    ///
    /// Returns false if the table is unknown.
    pub async fn set_table_status(&self, full_name: &str, status: AnalysisStatus) -> Result<bool> {
        let mut conn = self.acquire().await?;
        tables::set_status(&mut conn, full_name, status, Utc::now()).await
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
