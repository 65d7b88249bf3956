//! Shared helpers for integration tests.
//!
//! [`FakeCatalog`] is an in-memory [`CatalogClient`] whose tree, statistics
//! and failures can be changed between calls.

#![allow(dead_code)]

use async_trait::async_trait;
use lakesurveyor_core::catalog::{
    CatalogClient, CatalogInfo, DiscoveredColumn, DiscoveredTable, QueryRows, SchemaInfo,
};
use lakesurveyor_core::config::{DiscoveryConfig, StoreConfig};
use lakesurveyor_core::error::LakeSurveyorError;
use lakesurveyor_core::reconcile::TableLocks;
use lakesurveyor_core::{DiscoveryOrchestrator, Result, SourceStore};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Statistic values every profiling query answers with.
#[derive(Debug, Clone)]
pub struct FakeStats {
    pub null_count: String,
    pub distinct_count: String,
    pub min_value: String,
    pub max_value: String,
    pub avg_length: String,
    pub samples: Vec<String>,
}

impl Default for FakeStats {
    fn default() -> Self {
        Self {
            null_count: "0".to_string(),
            distinct_count: "10".to_string(),
            min_value: "1".to_string(),
            max_value: "100".to_string(),
            avg_length: "8.5".to_string(),
            samples: vec!["alpha".to_string(), "beta".to_string()],
        }
    }
}

/// Holds one column listing until released.
#[derive(Clone, Default)]
pub struct ListingGate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl ListingGate {
    /// Waits until the held listing has started.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Lets the held listing return.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct FakeState {
    /// catalog -> schema -> tables
    tree: BTreeMap<String, BTreeMap<String, Vec<DiscoveredTable>>>,
    columns: HashMap<String, Vec<DiscoveredColumn>>,
    row_counts: HashMap<String, i64>,
    stats: FakeStats,
    fail_list_catalogs: bool,
    failing_schema_listings: HashSet<String>,
    failing_table_listings: HashSet<String>,
    failing_column_listings: HashSet<String>,
    /// Statements containing any of these fragments fail
    failing_statements: Vec<String>,
    cancel_on_columns: Option<(String, CancellationToken)>,
    held_listings: HashMap<String, ListingGate>,
    statements: Vec<String>,
}

/// In-memory catalog service.
#[derive(Default)]
pub struct FakeCatalog {
    state: Mutex<FakeState>,
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `oztest_dev.raw_data` with `customers` (13 columns) and `orders` (11 columns).
    pub fn oztest_dev() -> Arc<Self> {
        let fake = Self::new();
        fake.add_table(
            table("oztest_dev", "raw_data", "customers", Some("Customer master data")),
            customers_columns(),
        );
        fake.add_table(
            table("oztest_dev", "raw_data", "orders", Some("Customer purchase orders")),
            orders_columns(),
        );
        fake.set_row_count("oztest_dev.raw_data.customers", 1_000);
        fake.set_row_count("oztest_dev.raw_data.orders", 5_000);
        fake
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().expect("fake state lock");
        f(&mut state)
    }

    pub fn add_catalog(&self, catalog: &str) {
        self.with_state(|s| {
            s.tree.entry(catalog.to_string()).or_default();
        });
    }

    pub fn add_schema(&self, catalog: &str, schema: &str) {
        self.with_state(|s| {
            s.tree
                .entry(catalog.to_string())
                .or_default()
                .entry(schema.to_string())
                .or_default();
        });
    }

    pub fn add_table(&self, table: DiscoveredTable, columns: Vec<DiscoveredColumn>) {
        self.with_state(|s| {
            s.columns.insert(table.full_name(), columns);
            s.tree
                .entry(table.catalog_name.clone())
                .or_default()
                .entry(table.schema_name.clone())
                .or_default()
                .push(table);
        });
    }

    pub fn set_columns(&self, full_name: &str, columns: Vec<DiscoveredColumn>) {
        self.with_state(|s| {
            s.columns.insert(full_name.to_string(), columns);
        });
    }

    /// Drops a column from a table's listing, renumbering the rest.
    pub fn remove_column(&self, full_name: &str, column: &str) {
        self.with_state(|s| {
            if let Some(columns) = s.columns.get_mut(full_name) {
                columns.retain(|c| c.name != column);
                for (i, c) in columns.iter_mut().enumerate() {
                    c.position = i as i64 + 1;
                }
            }
        });
    }

    pub fn set_row_count(&self, full_name: &str, count: i64) {
        self.with_state(|s| {
            s.row_counts.insert(full_name.to_string(), count);
        });
    }

    pub fn set_stats(&self, stats: FakeStats) {
        self.with_state(|s| s.stats = stats);
    }

    pub fn fail_list_catalogs(&self) {
        self.with_state(|s| s.fail_list_catalogs = true);
    }

    pub fn fail_schema_listing(&self, catalog: &str) {
        self.with_state(|s| {
            s.failing_schema_listings.insert(catalog.to_string());
        });
    }

    pub fn fail_table_listing(&self, catalog: &str, schema: &str) {
        self.with_state(|s| {
            s.failing_table_listings
                .insert(format!("{}.{}", catalog, schema));
        });
    }

    pub fn fail_column_listing(&self, full_name: &str) {
        self.with_state(|s| {
            s.failing_column_listings.insert(full_name.to_string());
        });
    }

    /// Fails every statement containing `fragment`.
    pub fn fail_statements_containing(&self, fragment: &str) {
        self.with_state(|s| s.failing_statements.push(fragment.to_string()));
    }

    pub fn clear_failures(&self) {
        self.with_state(|s| {
            s.fail_list_catalogs = false;
            s.failing_schema_listings.clear();
            s.failing_table_listings.clear();
            s.failing_column_listings.clear();
            s.failing_statements.clear();
        });
    }

    /// Cancels `token` when the columns of `full_name` are listed.
    pub fn cancel_when_listing(&self, full_name: &str, token: CancellationToken) {
        self.with_state(|s| s.cancel_on_columns = Some((full_name.to_string(), token)));
    }

    /// Makes the next column listing of `full_name` wait for the gate.
    pub fn hold_column_listing(&self, full_name: &str) -> ListingGate {
        let gate = ListingGate::default();
        self.with_state(|s| s.held_listings.insert(full_name.to_string(), gate.clone()));
        gate
    }

    /// Statements executed so far.
    pub fn statements(&self) -> Vec<String> {
        self.with_state(|s| s.statements.clone())
    }

    fn unavailable(context: String) -> LakeSurveyorError {
        LakeSurveyorError::connection_refused(context)
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn test_connection(&self) -> Result<()> {
        self.list_catalogs().await.map(|_| ())
    }

    async fn list_catalogs(&self) -> Result<Vec<CatalogInfo>> {
        self.with_state(|s| {
            if s.fail_list_catalogs {
                return Err(Self::unavailable("HTTP 503 listing catalogs".to_string()));
            }
            Ok(s.tree
                .keys()
                .map(|name| CatalogInfo {
                    name: name.clone(),
                    comment: None,
                    owner: None,
                })
                .collect())
        })
    }

    async fn list_schemas(&self, catalog: &str) -> Result<Vec<SchemaInfo>> {
        self.with_state(|s| {
            if s.failing_schema_listings.contains(catalog) {
                return Err(Self::unavailable(format!("HTTP 403 on catalog {}", catalog)));
            }
            let schemas = s.tree.get(catalog).ok_or_else(|| {
                LakeSurveyorError::query_failed(format!("CATALOG_DOES_NOT_EXIST: {}", catalog))
            })?;
            Ok(schemas
                .keys()
                .map(|name| SchemaInfo {
                    name: name.clone(),
                    catalog_name: catalog.to_string(),
                    comment: None,
                    owner: None,
                })
                .collect())
        })
    }

    async fn list_tables(&self, catalog: &str, schema: &str) -> Result<Vec<DiscoveredTable>> {
        self.with_state(|s| {
            let scope = format!("{}.{}", catalog, schema);
            if s.failing_table_listings.contains(&scope) {
                return Err(Self::unavailable(format!("HTTP 403 on schema {}", scope)));
            }
            Ok(s.tree
                .get(catalog)
                .and_then(|schemas| schemas.get(schema))
                .cloned()
                .unwrap_or_default())
        })
    }

    async fn list_columns(&self, full_name: &str) -> Result<Vec<DiscoveredColumn>> {
        let held = self.with_state(|s| s.held_listings.remove(full_name));
        if let Some(gate) = held {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.with_state(|s| {
            if let Some((name, token)) = &s.cancel_on_columns
                && name == full_name
            {
                token.cancel();
            }
            if s.failing_column_listings.contains(full_name) {
                return Err(Self::unavailable(format!("HTTP 503 describing {}", full_name)));
            }
            s.columns.get(full_name).cloned().ok_or_else(|| {
                LakeSurveyorError::query_failed(format!("TABLE_OR_VIEW_NOT_FOUND: {}", full_name))
            })
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryRows> {
        self.with_state(|s| {
            s.statements.push(sql.to_string());
            if s.failing_statements.iter().any(|f| sql.contains(f.as_str())) {
                return Err(LakeSurveyorError::query_failed(format!(
                    "statement failed: {}",
                    sql
                )));
            }

            let stats = &s.stats;
            let rows = if sql.starts_with("SELECT COUNT(*) - COUNT(") {
                QueryRows::scalar(Some(stats.null_count.clone()))
            } else if sql.starts_with("SELECT COUNT(DISTINCT") {
                QueryRows::scalar(Some(stats.distinct_count.clone()))
            } else if sql.starts_with("SELECT AVG(LENGTH(") {
                QueryRows::scalar(Some(stats.avg_length.clone()))
            } else if sql.starts_with("SELECT MIN(") {
                QueryRows::new(
                    vec!["min".to_string(), "max".to_string()],
                    vec![vec![
                        Some(stats.min_value.clone()),
                        Some(stats.max_value.clone()),
                    ]],
                )
            } else if sql.starts_with("SELECT DISTINCT") {
                QueryRows::new(
                    vec!["value".to_string()],
                    stats.samples.iter().map(|v| vec![Some(v.clone())]).collect(),
                )
            } else if sql.starts_with("SELECT COUNT(*) FROM") {
                let count = s
                    .tree
                    .values()
                    .flat_map(|schemas| schemas.values().flatten())
                    .find(|t| sql.ends_with(&t.table_ref().quoted()))
                    .and_then(|t| s.row_counts.get(&t.full_name()).copied())
                    .unwrap_or(0);
                QueryRows::scalar(Some(count.to_string()))
            } else if sql.starts_with("DESCRIBE DETAIL") {
                QueryRows::new(
                    vec!["format".to_string(), "sizeInBytes".to_string()],
                    vec![vec![Some("delta".to_string()), Some("4096".to_string())]],
                )
            } else if sql == "SELECT 1" {
                QueryRows::scalar(Some("1".to_string()))
            } else {
                return Err(LakeSurveyorError::query_failed(format!(
                    "unsupported statement: {}",
                    sql
                )));
            };
            Ok(rows)
        })
    }
}

pub fn table(catalog: &str, schema: &str, name: &str, comment: Option<&str>) -> DiscoveredTable {
    let mut table = DiscoveredTable::new(catalog, schema, name);
    table.format = Some("DELTA".to_string());
    table.location = Some(format!("s3://lake/{}/{}/{}", catalog, schema, name));
    table.owner = Some("data-eng".to_string());
    table.comment = comment.map(str::to_string);
    table
}

pub fn columns(specs: &[(&str, &str)]) -> Vec<DiscoveredColumn> {
    specs
        .iter()
        .enumerate()
        .map(|(i, (name, type_name))| {
            let mut column = DiscoveredColumn::new(*name, i as i64 + 1, *type_name);
            column.type_text = Some(type_name.to_ascii_lowercase());
            column
        })
        .collect()
}

pub fn customers_columns() -> Vec<DiscoveredColumn> {
    columns(&[
        ("customer_id", "BIGINT"),
        ("first_name", "STRING"),
        ("last_name", "STRING"),
        ("email", "STRING"),
        ("phone", "STRING"),
        ("address_line1", "STRING"),
        ("city", "STRING"),
        ("state", "STRING"),
        ("postal_code", "STRING"),
        ("country", "STRING"),
        ("date_of_birth", "DATE"),
        ("created_at", "TIMESTAMP"),
        ("loyalty_points", "INT"),
    ])
}

pub fn orders_columns() -> Vec<DiscoveredColumn> {
    columns(&[
        ("order_id", "BIGINT"),
        ("customer_id", "BIGINT"),
        ("order_date", "DATE"),
        ("status", "STRING"),
        ("total_amount", "DECIMAL"),
        ("currency", "STRING"),
        ("shipping_method", "STRING"),
        ("ship_date", "DATE"),
        ("discount", "DOUBLE"),
        ("tax", "DOUBLE"),
        ("notes", "STRING"),
    ])
}

/// Fresh in-memory store.
pub async fn memory_store() -> SourceStore {
    SourceStore::open(&StoreConfig::in_memory())
        .await
        .expect("in-memory store should open")
}

/// Orchestrator over `fake` with its own lock registry.
pub fn orchestrator(
    fake: &Arc<FakeCatalog>,
    store: SourceStore,
    config: DiscoveryConfig,
) -> DiscoveryOrchestrator {
    let client: Arc<dyn CatalogClient> = fake.clone();
    DiscoveryOrchestrator::new(client, store, config).with_locks(TableLocks::new())
}
