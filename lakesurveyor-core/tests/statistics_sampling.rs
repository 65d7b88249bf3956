//! Column statistics and refresh tests.
//!
//! This test suite covers:
//! - Statistics applicable per type class
//! - Failed statistics keeping the previously stored value
//! - Defaults for statistics that fail on a new column
//! - Statistics refresh for known and unknown tables, failed probes and
//!   failed writes

mod common;

use common::{FakeCatalog, FakeStats, memory_store, orchestrator};
use lakesurveyor_core::config::{DiscoveryConfig, SamplingConfig};
use lakesurveyor_core::models::{AnalysisStatus, SourceColumn};
use lakesurveyor_core::{Result, SourceStore};

const USER: &str = "analyst@example.com";
const CUSTOMERS: &str = "oztest_dev.raw_data.customers";

async fn stored_column(store: &SourceStore, table: &str, column: &str) -> Result<SourceColumn> {
    let table = store.find_table(table).await?.expect("table stored");
    Ok(store
        .list_columns(table.id)
        .await?
        .into_iter()
        .find(|c| c.column_name == column)
        .expect("column stored"))
}

// =============================================================================
// Type Class Tests
// =============================================================================

/// Test numeric columns get min/max and text columns get average length
#[tokio::test]
async fn test_statistics_follow_type_class() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    let store = memory_store().await;
    let engine = orchestrator(&fake, store.clone(), DiscoveryConfig::default());
    engine.run_sweep(None, USER).await?;

    let points = stored_column(&store, CUSTOMERS, "loyalty_points").await?;
    assert_eq!(points.min_value.as_deref(), Some("1"));
    assert_eq!(points.max_value.as_deref(), Some("100"));
    assert!(points.avg_length.is_none());

    let email = stored_column(&store, CUSTOMERS, "email").await?;
    assert_eq!(email.avg_length, Some(8.5));
    assert!(email.min_value.is_none());
    assert_eq!(email.sample_values, vec!["alpha", "beta"]);

    let born = stored_column(&store, CUSTOMERS, "date_of_birth").await?;
    assert!(born.min_value.is_none());
    assert!(born.avg_length.is_none());
    assert_eq!(born.null_count, Some(0));
    assert_eq!(born.distinct_count, Some(10));

    Ok(())
}

/// Test the distinct count query is bounded by the configured row limit
#[tokio::test]
async fn test_distinct_count_is_bounded() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    let config = DiscoveryConfig::default()
        .with_sampling(SamplingConfig::default().with_distinct_count_limit(500));
    let engine = orchestrator(&fake, memory_store().await, config);
    engine.run_search("orders", None, USER).await?;

    let distinct: Vec<String> = fake
        .statements()
        .into_iter()
        .filter(|s| s.starts_with("SELECT COUNT(DISTINCT"))
        .collect();
    assert_eq!(distinct.len(), 11);
    assert!(distinct.iter().all(|s| s.contains("LIMIT 500")));

    Ok(())
}

// =============================================================================
// Degradation Tests
// =============================================================================

/// Test a failed statistic keeps the stored value while the others refresh
#[tokio::test]
async fn test_failed_statistic_keeps_prior_value() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    let store = memory_store().await;
    let engine = orchestrator(&fake, store.clone(), DiscoveryConfig::default());
    engine.run_sweep(None, USER).await?;

    fake.set_stats(FakeStats {
        null_count: "7".to_string(),
        distinct_count: "20".to_string(),
        ..FakeStats::default()
    });
    fake.fail_statements_containing("COUNT(DISTINCT `email`)");

    let report = engine.run_sweep(None, USER).await?;
    assert!(report.is_clean(), "statistic failures never fail a table");

    let email = stored_column(&store, CUSTOMERS, "email").await?;
    assert_eq!(email.null_count, Some(7));
    assert_eq!(email.distinct_count, Some(10));

    let phone = stored_column(&store, CUSTOMERS, "phone").await?;
    assert_eq!(phone.distinct_count, Some(20));

    Ok(())
}

/// Test statistics that fail on first discovery default to zero counts
#[tokio::test]
async fn test_failed_statistic_on_new_column() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    fake.fail_statements_containing("COUNT(DISTINCT");
    fake.fail_statements_containing("SELECT MIN(");
    let store = memory_store().await;
    let engine = orchestrator(&fake, store.clone(), DiscoveryConfig::default());

    let report = engine.run_sweep(None, USER).await?;
    assert_eq!(report.columns_created, 24);
    assert!(report.is_clean());

    let points = stored_column(&store, CUSTOMERS, "loyalty_points").await?;
    assert_eq!(points.distinct_count, Some(0));
    assert_eq!(points.null_count, Some(0));
    assert!(points.min_value.is_none());
    assert!(points.max_value.is_none());

    Ok(())
}

/// Test a failed row count keeps the stored count without failing the table
#[tokio::test]
async fn test_failed_row_count_keeps_prior_value() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    let store = memory_store().await;
    let engine = orchestrator(&fake, store.clone(), DiscoveryConfig::default());
    engine.run_sweep(None, USER).await?;

    fake.fail_statements_containing("SELECT COUNT(*) FROM");
    let report = engine.run_sweep(None, USER).await?;
    assert!(report.is_clean());

    let customers = store.find_table(CUSTOMERS).await?.expect("stored");
    assert_eq!(customers.row_count, Some(1_000));
    assert_eq!(customers.analysis_status, AnalysisStatus::Completed);

    Ok(())
}

// =============================================================================
// Refresh Tests
// =============================================================================

/// Test refreshing a stored table updates counts and statistics
#[tokio::test]
async fn test_refresh_statistics() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    let store = memory_store().await;
    let engine = orchestrator(&fake, store.clone(), DiscoveryConfig::default());
    engine.run_sweep(None, USER).await?;
    let before = store.find_table(CUSTOMERS).await?.expect("stored");

    fake.set_row_count(CUSTOMERS, 1_250);
    fake.set_stats(FakeStats {
        null_count: "3".to_string(),
        ..FakeStats::default()
    });
    assert!(engine.refresh_statistics(CUSTOMERS).await);

    let after = store.find_table(CUSTOMERS).await?.expect("stored");
    assert_eq!(after.row_count, Some(1_250));
    assert_eq!(after.analysis_status, AnalysisStatus::Completed);
    assert!(after.last_analyzed >= before.last_analyzed);

    let email = stored_column(&store, CUSTOMERS, "email").await?;
    assert_eq!(email.null_count, Some(3));
    assert_eq!(store.list_columns(after.id).await?.len(), 13);

    Ok(())
}

/// Test refreshing an unknown table returns false and stores nothing
#[tokio::test]
async fn test_refresh_unknown_table() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    let store = memory_store().await;
    let engine = orchestrator(&fake, store.clone(), DiscoveryConfig::default());

    assert!(!engine.refresh_statistics("oztest_dev.raw_data.missing").await);
    assert!(store.list_tables().await?.is_empty());

    Ok(())
}

/// Test a refresh whose row count fails keeps the stored count and still
/// writes the new column statistics
#[tokio::test]
async fn test_refresh_with_failed_row_count() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    let store = memory_store().await;
    let engine = orchestrator(&fake, store.clone(), DiscoveryConfig::default());
    engine.run_sweep(None, USER).await?;

    fake.set_stats(FakeStats {
        null_count: "3".to_string(),
        ..FakeStats::default()
    });
    fake.fail_statements_containing("SELECT COUNT(*) FROM");
    assert!(engine.refresh_statistics(CUSTOMERS).await);

    let customers = store.find_table(CUSTOMERS).await?.expect("stored");
    assert_eq!(customers.analysis_status, AnalysisStatus::Completed);
    assert_eq!(customers.row_count, Some(1_000));
    let email = stored_column(&store, CUSTOMERS, "email").await?;
    assert_eq!(email.null_count, Some(3));

    fake.clear_failures();
    fake.set_row_count(CUSTOMERS, 1_100);
    assert!(engine.refresh_statistics(CUSTOMERS).await);
    let customers = store.find_table(CUSTOMERS).await?.expect("stored");
    assert_eq!(customers.row_count, Some(1_100));

    Ok(())
}

/// Test a refresh whose write fails marks the table failed and keeps the
/// stored statistics
#[tokio::test]
async fn test_refresh_with_failed_write() -> Result<()> {
    let fake = FakeCatalog::oztest_dev();
    let store = memory_store().await;
    let engine = orchestrator(&fake, store.clone(), DiscoveryConfig::default());
    engine.run_sweep(None, USER).await?;

    sqlx::query(
        "CREATE TRIGGER reject_column_updates BEFORE UPDATE ON source_columns
         BEGIN SELECT RAISE(ABORT, 'database is locked'); END",
    )
    .execute(store.pool())
    .await
    .expect("test SQL should run");
    fake.set_row_count(CUSTOMERS, 1_250);
    fake.set_stats(FakeStats {
        null_count: "3".to_string(),
        ..FakeStats::default()
    });

    assert!(!engine.refresh_statistics(CUSTOMERS).await);

    let customers = store.find_table(CUSTOMERS).await?.expect("stored");
    assert_eq!(customers.analysis_status, AnalysisStatus::Failed);
    assert_eq!(customers.row_count, Some(1_000));
    let email = stored_column(&store, CUSTOMERS, "email").await?;
    assert_eq!(email.null_count, Some(0));

    Ok(())
}
