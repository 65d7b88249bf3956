//! Databricks catalog client.
//!
//! Metadata comes from the Unity Catalog REST API; profiling and probe
//! queries run through the SQL Statement Execution API on a SQL warehouse.
//!
//! # Security
//! - The access token lives in a zeroizing container
//! - The token is never logged and is scrubbed from echoed error bodies
//! - Only SELECT/DESCRIBE statements are issued by the engine

mod connection;
mod statement;
mod unity;

use crate::Result;
use crate::catalog::types::{CatalogInfo, DiscoveredColumn, DiscoveredTable, QueryRows, SchemaInfo};
use crate::catalog::CatalogClient;
use crate::config::ConnectionConfig;
use crate::error::LakeSurveyorError;
use crate::security::AccessToken;
use async_trait::async_trait;
use connection::ApiConnection;
use std::sync::atomic::{AtomicBool, Ordering};

/// Client for a Databricks workspace.
///
/// # Example
/// ```rust,no_run
/// use lakesurveyor_core::catalog::{CatalogClient, DatabricksClient};
/// use lakesurveyor_core::config::ConnectionConfig;
/// use lakesurveyor_core::security::AccessToken;
///
/// # async fn example() -> lakesurveyor_core::Result<()> {
/// let config = ConnectionConfig::new("adb-123.azuredatabricks.net")
///     .with_http_path("/sql/1.0/warehouses/abc123");
/// let client = DatabricksClient::new(config, AccessToken::new("dapi...".to_string()))?;
/// let catalogs = client.list_catalogs().await?;
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct DatabricksClient {
    config: ConnectionConfig,
    conn: ApiConnection,
    warehouse_id: Option<String>,
    closed: AtomicBool,
}

impl std::fmt::Debug for DatabricksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabricksClient")
            .field("config", &self.config.to_string())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl DatabricksClient {
    /// Opens a client for the configured workspace.
    ///
    /// No request is made until the first call.
    ///
    /// # Errors
    /// Returns a configuration error if the config is invalid or the token
    /// is empty
    pub fn new(config: ConnectionConfig, token: AccessToken) -> Result<Self> {
        config.validate()?;
        let conn = ApiConnection::new(&config, token)?;
        let warehouse_id = config.resolved_warehouse_id();
        if warehouse_id.is_none() {
            tracing::warn!(
                "No SQL warehouse configured for {}; statistics and probes will fail",
                config.host
            );
        }
        tracing::debug!("Created catalog client for {}", config);
        Ok(Self {
            config,
            conn,
            warehouse_id,
            closed: AtomicBool::new(false),
        })
    }

    /// The connection configuration (no credentials).
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LakeSurveyorError::connection_refused("client has been closed"));
        }
        Ok(())
    }

    fn warehouse(&self) -> Result<&str> {
        self.warehouse_id.as_deref().ok_or_else(|| {
            LakeSurveyorError::configuration(
                "a SQL warehouse (http_path or warehouse_id) is required to run statements",
            )
        })
    }
}

#[async_trait]
impl CatalogClient for DatabricksClient {
    async fn test_connection(&self) -> Result<()> {
        let catalogs = self.list_catalogs().await?;
        tracing::info!("Connected to {}, {} catalogs visible", self.config.host, catalogs.len());
        self.execute_query("SELECT 1").await?;
        Ok(())
    }

    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>> {
        self.ensure_open()?;
        unity::list_catalogs(&self.conn).await
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>> {
        self.ensure_open()?;
        unity::list_schemas(&self.conn, catalog).await
    }

    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<DiscoveredTable>> {
        self.ensure_open()?;
        unity::list_tables(&self.conn, catalog, schema).await
    }

    async fn list_columns(&self, full_name: &str) -> Result<Vec<DiscoveredColumn>> {
        self.ensure_open()?;
        unity::list_columns(&self.conn, full_name).await
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryRows> {
        self.ensure_open()?;
        let warehouse = self.warehouse()?;
        statement::execute(
            &self.conn,
            warehouse,
            sql,
            self.config.statement_wait_timeout_secs,
        )
        .await
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Closed catalog client for {}", self.config.host);
        }
    }
}
