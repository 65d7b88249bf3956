//! Column profiling against the remote warehouse.
//!
//! Every statistic is an independent bounded query. A statistic that fails
//! or times out comes back as `None` so the caller keeps the previously
//! stored value; the failure is logged as a warning and never aborts the
//! table.

mod queries;
mod type_class;

pub use queries::{
    avg_length_sql, distinct_count_sql, min_max_sql, null_count_sql, sample_values_sql,
};
pub use type_class::TypeClass;

use crate::catalog::sql::parse_count;
use crate::catalog::{CatalogClient, QueryRows, TableRef};
use crate::config::{MAX_SAMPLE_VALUES, SamplingConfig};
use crate::error::LakeSurveyorError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Statistics computed for one column in one profiling pass.
///
/// `None` means "not computed this time", either because the statistic does
/// not apply to the column type or because its query failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub avg_length: Option<f64>,
    pub sample_values: Option<Vec<String>>,
}

impl ColumnStatistics {
    /// True when nothing was computed.
    pub fn is_empty(&self) -> bool {
        self.null_count.is_none()
            && self.distinct_count.is_none()
            && self.min_value.is_none()
            && self.max_value.is_none()
            && self.avg_length.is_none()
            && self.sample_values.is_none()
    }
}

/// Issues profiling queries through a [`CatalogClient`].
pub struct StatisticsSampler {
    client: Arc<dyn CatalogClient>,
    config: SamplingConfig,
}

impl StatisticsSampler {
    pub fn new(client: Arc<dyn CatalogClient>, config: SamplingConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Profiles one column.
    ///
    /// Returns empty statistics when profiling is disabled.
    pub async fn profile_column(
        &self,
        table: &TableRef,
        column: &str,
        data_type: &str,
    ) -> ColumnStatistics {
        let mut stats = ColumnStatistics::default();
        if !self.config.enabled {
            return stats;
        }

        let class = TypeClass::of(data_type);
        let scope = format!("{}.{}", table, column);

        stats.null_count = self
            .run(&scope, "null_count", null_count_sql(table, column), first_count)
            .await;

        stats.distinct_count = self
            .run(
                &scope,
                "distinct_count",
                distinct_count_sql(table, column, self.config.distinct_count_limit),
                first_count,
            )
            .await;

        if class.is_text() {
            stats.avg_length = self
                .run(&scope, "avg_length", avg_length_sql(table, column), |rows| {
                    rows.cell(0, 0).and_then(|v| v.trim().parse::<f64>().ok())
                })
                .await;
        }

        if class.is_numeric()
            && let Some((min, max)) = self
                .run(&scope, "min_max", min_max_sql(table, column), |rows| {
                    Some((
                        rows.cell(0, 0).map(str::to_string),
                        rows.cell(0, 1).map(str::to_string),
                    ))
                })
                .await
        {
            stats.min_value = min;
            stats.max_value = max;
        }

        if self.config.sample_value_limit > 0 {
            stats.sample_values = self
                .run(
                    &scope,
                    "sample_values",
                    sample_values_sql(
                        table,
                        column,
                        self.config.sample_value_limit.min(MAX_SAMPLE_VALUES),
                    ),
                    |rows| {
                        Some(
                            rows.rows
                                .iter()
                                .filter_map(|row| row.first().cloned().flatten())
                                .collect::<Vec<String>>(),
                        )
                    },
                )
                .await;
        }

        tracing::trace!("Profiled {}: {:?}", scope, stats);
        stats
    }

    /// Runs one profiling query. Any failure degrades to `None`.
    async fn run<T, F>(&self, scope: &str, statistic: &str, sql: String, parse: F) -> Option<T>
    where
        F: FnOnce(&QueryRows) -> Option<T>,
    {
        if let Some(throttle_ms) = self.config.throttle_ms {
            tokio::time::sleep(Duration::from_millis(throttle_ms)).await;
        }

        let outcome =
            match tokio::time::timeout(self.config.query_timeout(), self.client.execute_query(&sql))
                .await
            {
                Ok(Ok(rows)) => parse(&rows).ok_or_else(|| {
                    LakeSurveyorError::profiling_failed(format!(
                        "{} for {} returned no usable value",
                        statistic, scope
                    ))
                }),
                Ok(Err(e)) => Err(LakeSurveyorError::profiling_failed(format!(
                    "{} for {}: {}",
                    statistic, scope, e
                ))),
                Err(_) => Err(LakeSurveyorError::profiling_failed(format!(
                    "{} for {} timed out after {}s",
                    statistic, scope, self.config.query_timeout_secs
                ))),
            };

        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("{}; keeping previous value", e);
                None
            }
        }
    }
}

fn first_count(rows: &QueryRows) -> Option<i64> {
    rows.cell(0, 0).and_then(parse_count)
}
