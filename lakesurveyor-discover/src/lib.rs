//! Command-line front end for LakeSurveyor catalog discovery.
//!
//! The argument types and the helpers that turn them into core
//! configuration live here so they can be tested without a terminal.
//! The binary itself is in `main.rs`.

pub mod output;

use clap::{Args, Parser, Subcommand};
use lakesurveyor_core::config::{
    ConnectionConfig, DiscoveryConfig, RetryConfig, SamplingConfig, StoreConfig,
};
use lakesurveyor_core::error::LakeSurveyorError;
use lakesurveyor_core::logging::LogFormat;
use lakesurveyor_core::security::AccessToken;
use lakesurveyor_core::Result;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

/// Default identity recorded as `discovered_by`.
pub const DEFAULT_USER: &str = "lakesurveyor";

#[derive(Parser)]
#[command(name = "lakesurveyor-discover")]
#[command(about = "Lakehouse catalog discovery and reconciliation tool")]
#[command(version)]
#[command(long_about = "
LakeSurveyor Discover - catalog discovery for Unity Catalog workspaces

Walks catalogs, schemas and tables, profiles every column with bounded
queries on a SQL warehouse, and merges the result into a local SQLite store.
Stored tables and columns are never deleted.

EXAMPLES:
  lakesurveyor-discover --host adb-123.azuredatabricks.net \\
      --http-path /sql/1.0/warehouses/abc123 sweep --catalogs oztest_dev
  lakesurveyor-discover search customer --user analyst@example.com
  lakesurveyor-discover refresh oztest_dev.raw_data.customers
  lakesurveyor-discover tables --output tables.json
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub sampling: SamplingArgs,

    /// Local store location
    #[arg(
        long,
        env = "LAKESURVEYOR_STORE_URL",
        default_value = "sqlite://lakesurveyor.db",
        help = "SQLite store URL (sqlite://path or sqlite::memory:)"
    )]
    pub store_url: String,

    /// Output file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Write JSON output to FILE instead of stdout"
    )]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reconcile every table of the given (or all visible) catalogs
    Sweep(ScopeArgs),
    /// Reconcile tables whose name or comment contains TERM
    Search {
        /// Case-insensitive search term
        term: String,

        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Re-profile one stored table
    Refresh {
        /// Fully-qualified table name (catalog.schema.table)
        table: String,
    },
    /// Test the catalog connection
    Test,
    /// List tables in the local store
    Tables,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ScopeArgs {
    /// Catalogs to walk
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated catalogs to walk (default: every visible catalog)"
    )]
    pub catalogs: Vec<String>,

    /// Identity recorded on newly discovered tables
    #[arg(long, env = "LAKESURVEYOR_USER", default_value = DEFAULT_USER)]
    pub user: String,
}

impl ScopeArgs {
    /// Catalog list to pass to the orchestrator, `None` meaning "all".
    pub fn catalogs(&self) -> Option<Vec<String>> {
        parse_catalogs(&self.catalogs)
    }
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Log line format
    #[arg(long, default_value = "text", help = "Log format: text or json")]
    pub log_format: LogFormat,
}

#[derive(Args, Clone)]
pub struct ConnectionArgs {
    /// Workspace host
    #[arg(long, env = "DATABRICKS_HOST", help = "Workspace host or URL")]
    pub host: Option<String>,

    /// Access token
    #[arg(
        long,
        env = "DATABRICKS_TOKEN",
        hide_env_values = true,
        help = "Access token (prompted for when absent on a terminal)"
    )]
    pub token: Option<String>,

    /// SQL warehouse HTTP path
    #[arg(long, env = "DATABRICKS_HTTP_PATH", help = "/sql/1.0/warehouses/<id>")]
    pub http_path: Option<String>,

    /// SQL warehouse id
    #[arg(long, env = "DATABRICKS_WAREHOUSE_ID")]
    pub warehouse_id: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "120")]
    pub request_timeout: u64,

    /// Retries for transient failures
    #[arg(long, default_value = "3")]
    pub max_retries: u32,
}

impl ConnectionArgs {
    /// Builds and validates the connection config.
    ///
    /// # Errors
    /// Returns error if no host was given or the config is invalid
    pub fn to_config(&self) -> Result<ConnectionConfig> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                LakeSurveyorError::configuration(
                    "workspace host is required (--host or DATABRICKS_HOST)",
                )
            })?;

        let mut config = ConnectionConfig::new(host)
            .with_request_timeout(Duration::from_secs(self.request_timeout))
            .with_retry(RetryConfig {
                max_retries: self.max_retries,
                ..RetryConfig::default()
            });
        if let Some(path) = self.http_path.as_deref() {
            config = config.with_http_path(path);
        }
        if let Some(id) = self.warehouse_id.as_deref() {
            config = config.with_warehouse_id(id);
        }
        config.validate()?;
        Ok(config)
    }

    /// Resolves the access token from the flag or environment, prompting
    /// on a terminal when neither supplied one.
    ///
    /// # Errors
    /// Returns error if no token is available
    pub fn access_token(&self) -> Result<AccessToken> {
        if let Some(token) = self.token.clone().map(AccessToken::new)
            && !token.is_empty()
        {
            return Ok(token);
        }

        if !std::io::stdin().is_terminal() {
            return Err(LakeSurveyorError::configuration(
                "access token is required (--token or DATABRICKS_TOKEN)",
            ));
        }

        let entered = rpassword::prompt_password("Access token: ").map_err(|e| {
            LakeSurveyorError::configuration(format!("Failed to read access token: {}", e))
        })?;
        let token = AccessToken::new(entered);
        if token.is_empty() {
            return Err(LakeSurveyorError::configuration("access token cannot be empty"));
        }
        Ok(token)
    }
}

#[derive(Args, Debug, Clone)]
pub struct SamplingArgs {
    /// Row bound for distinct counts
    #[arg(long, default_value = "1000000", help = "Rows scanned per distinct count")]
    pub distinct_limit: u64,

    /// Sample values kept per column
    #[arg(long, default_value = "5", help = "Sample values kept per column (max 5)")]
    pub sample_values: u32,

    /// Delay between profiling queries (ms)
    #[arg(long, help = "Delay in milliseconds between profiling queries")]
    pub throttle: Option<u64>,

    /// Delay between tables (ms)
    #[arg(long, help = "Delay in milliseconds between tables")]
    pub table_throttle: Option<u64>,

    /// Per-query timeout in seconds
    #[arg(long, default_value = "30")]
    pub query_timeout: u64,

    /// Skip column profiling
    #[arg(long, help = "Sync metadata only, without column statistics")]
    pub no_profiling: bool,
}

impl SamplingArgs {
    /// Builds and validates the discovery config.
    ///
    /// # Errors
    /// Returns error if a sampling value is out of range
    pub fn to_config(&self) -> Result<DiscoveryConfig> {
        let mut sampling = SamplingConfig::default()
            .with_enabled(!self.no_profiling)
            .with_distinct_count_limit(self.distinct_limit)
            .with_sample_value_limit(self.sample_values)
            .with_query_timeout_secs(self.query_timeout);
        if let Some(ms) = self.throttle {
            sampling = sampling.with_throttle_ms(ms);
        }

        let mut config = DiscoveryConfig::default().with_sampling(sampling);
        if let Some(ms) = self.table_throttle {
            config = config.with_table_throttle_ms(ms);
        }
        config.validate()?;
        Ok(config)
    }
}

impl Cli {
    /// Store config for `--store-url`.
    ///
    /// # Errors
    /// Returns error if the URL is not a SQLite URL
    pub fn store_config(&self) -> Result<StoreConfig> {
        let config = StoreConfig::new(self.store_url.trim());
        config.validate()?;
        Ok(config)
    }

    /// Whether the command talks to the catalog service.
    pub fn needs_connection(&self) -> bool {
        !matches!(self.command, Command::Tables)
    }
}

/// Normalizes `--catalogs`: trims names, drops blanks and duplicates.
///
/// An empty result means "every visible catalog".
pub fn parse_catalogs(raw: &[String]) -> Option<Vec<String>> {
    let mut catalogs: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if !catalogs.iter().any(|c| c == name) {
            catalogs.push(name.to_string());
        }
    }
    if catalogs.is_empty() {
        None
    } else {
        Some(catalogs)
    }
}
