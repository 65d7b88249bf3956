//! Lakehouse catalog discovery tool.
//!
//! Connects to a Unity Catalog workspace, walks catalogs, schemas and
//! tables, and reconciles what it finds into a local SQLite store.
//!
//! # Security Guarantees
//! - Read-only operations against the workspace
//! - Access tokens are never stored or logged
//! - Stored tables and columns are never deleted

use anyhow::Context;
use clap::Parser;
use lakesurveyor_core::logging::init_logging;
use lakesurveyor_core::{
    CatalogClient, DatabricksClient, DiscoveryOrchestrator, DiscoveryReport, SourceStore,
};
use lakesurveyor_discover::{Cli, Command, ScopeArgs, output};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Serialize)]
struct RefreshOutcome<'a> {
    table: &'a str,
    refreshed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format)
        .context("Failed to initialize logging")?;

    let store_config = cli.store_config().context("Invalid store configuration")?;
    let store = SourceStore::open(&store_config)
        .await
        .context("Failed to open local store")?;

    let outcome = if cli.needs_connection() {
        run_remote(&cli, store.clone()).await
    } else {
        list_tables(&cli, &store).await
    };

    store.close().await;
    outcome
}

/// Runs a command that talks to the catalog service.
async fn run_remote(cli: &Cli, store: SourceStore) -> anyhow::Result<()> {
    let connection = cli
        .connection
        .to_config()
        .context("Invalid connection configuration")?;
    let discovery = cli
        .sampling
        .to_config()
        .context("Invalid sampling configuration")?;
    let token = cli.connection.access_token()?;

    info!("Target: {}", connection);
    let client: Arc<dyn CatalogClient> = Arc::new(
        DatabricksClient::new(connection, token).context("Failed to create catalog client")?,
    );

    let orchestrator = DiscoveryOrchestrator::new(Arc::clone(&client), store, discovery);
    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current table");
            cancel.cancel();
        }
    });

    let result = match &cli.command {
        Command::Sweep(scope) => {
            info!("Starting sweep...");
            sweep(cli, &orchestrator, scope, None).await
        }
        Command::Search { term, scope } => {
            info!("Searching for tables matching '{}'...", term);
            sweep(cli, &orchestrator, scope, Some(term)).await
        }
        Command::Refresh { table } => refresh(cli, &orchestrator, table).await,
        Command::Test => test_connection(client.as_ref()).await,
        Command::Tables => list_tables(cli, orchestrator.store()).await,
    };

    client.close().await;
    result
}

async fn sweep(
    cli: &Cli,
    orchestrator: &DiscoveryOrchestrator,
    scope: &ScopeArgs,
    term: Option<&String>,
) -> anyhow::Result<()> {
    let catalogs = scope.catalogs();
    let report: DiscoveryReport = match term {
        Some(term) => {
            orchestrator
                .run_search(term, catalogs.as_deref(), &scope.user)
                .await
        }
        None => orchestrator.run_sweep(catalogs.as_deref(), &scope.user).await,
    }
    .context("Discovery could not start")?;

    info!("✓ Discovery completed: {}", report);
    if !report.is_clean() {
        warn!("{} scopes failed; see the report for details", report.errors.len());
    }

    output::emit(&report, cli.output.as_deref()).await?;
    Ok(())
}

async fn refresh(
    cli: &Cli,
    orchestrator: &DiscoveryOrchestrator,
    table: &str,
) -> anyhow::Result<()> {
    let refreshed = orchestrator.refresh_statistics(table).await;
    output::emit(&RefreshOutcome { table, refreshed }, cli.output.as_deref()).await?;

    if !refreshed {
        error!("Statistics refresh of {} did not complete", table);
        anyhow::bail!("refresh of {} failed", table);
    }
    info!("✓ Statistics refreshed for {}", table);
    Ok(())
}

/// Tests the catalog connection without touching the store.
async fn test_connection(client: &dyn CatalogClient) -> anyhow::Result<()> {
    info!("Testing catalog connection...");
    client.test_connection().await.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;

    info!("✓ Connection test successful");
    println!("Connection to catalog service successful");
    Ok(())
}

/// Prints the tables held in the local store.
async fn list_tables(cli: &Cli, store: &SourceStore) -> anyhow::Result<()> {
    let tables = store
        .list_tables()
        .await
        .context("Failed to read stored tables")?;
    info!("Found {} stored tables", tables.len());
    output::emit(&tables, cli.output.as_deref()).await?;
    Ok(())
}
