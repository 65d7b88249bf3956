//! Three-way column diff.
//!
//! Pure planning: given the stored columns of a table and the columns the
//! source reports now, decide which rows to create, which to update in
//! place and which have vanished. Nothing here touches the store.

use crate::catalog::DiscoveredColumn;
use crate::models::SourceColumn;
use crate::sampler::ColumnStatistics;
use crate::store::ColumnValues;
use std::collections::{HashMap, HashSet};

/// A discovered column together with the statistics just computed for it.
#[derive(Debug, Clone)]
pub struct ProfiledColumn {
    pub column: DiscoveredColumn,
    pub stats: ColumnStatistics,
}

/// Writes needed to bring a table's columns in line with the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnPlan {
    /// New columns, in source order
    pub creates: Vec<ColumnValues>,
    /// Existing column ids with their merged values
    pub updates: Vec<(i64, ColumnValues)>,
    /// Ids of stored columns the source no longer reports
    pub vanished: Vec<i64>,
}

impl ColumnPlan {
    pub fn is_noop(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.vanished.is_empty()
    }
}

/// Merges fresh source metadata and statistics over an optional stored row.
///
/// Values the source did not supply this time keep their stored value. A
/// brand new column with no computed counts starts at zero.
pub fn merge_values(
    column: &DiscoveredColumn,
    stats: &ColumnStatistics,
    prior: Option<&SourceColumn>,
) -> ColumnValues {
    ColumnValues {
        column_name: column.name.clone(),
        column_position: column.position,
        data_type: column.type_name.clone(),
        physical_data_type: column
            .type_text
            .clone()
            .or_else(|| prior.and_then(|p| p.physical_data_type.clone())),
        is_nullable: column.nullable,
        column_comment: column
            .comment
            .clone()
            .or_else(|| prior.and_then(|p| p.column_comment.clone())),
        null_count: stats
            .null_count
            .or_else(|| prior.and_then(|p| p.null_count))
            .or(Some(0)),
        distinct_count: stats
            .distinct_count
            .or_else(|| prior.and_then(|p| p.distinct_count))
            .or(Some(0)),
        min_value: stats
            .min_value
            .clone()
            .or_else(|| prior.and_then(|p| p.min_value.clone())),
        max_value: stats
            .max_value
            .clone()
            .or_else(|| prior.and_then(|p| p.max_value.clone())),
        avg_length: stats.avg_length.or_else(|| prior.and_then(|p| p.avg_length)),
        sample_values: stats
            .sample_values
            .clone()
            .or_else(|| prior.map(|p| p.sample_values.clone()))
            .unwrap_or_default(),
    }
}

/// Re-merges statistics onto a stored column, keeping its metadata.
pub fn restat_values(prior: &SourceColumn, stats: &ColumnStatistics) -> ColumnValues {
    let column = DiscoveredColumn {
        name: prior.column_name.clone(),
        position: prior.column_position,
        type_name: prior.data_type.clone(),
        type_text: prior.physical_data_type.clone(),
        nullable: prior.is_nullable,
        comment: prior.column_comment.clone(),
        partition_index: None,
    };
    merge_values(&column, stats, Some(prior))
}

/// Plans the column writes for one table.
///
/// `existing` is keyed by column name. Column names are matched exactly;
/// a name repeated in `discovered` is planned once, from its first entry.
pub fn plan_columns(
    existing: &HashMap<String, SourceColumn>,
    discovered: &[ProfiledColumn],
) -> ColumnPlan {
    let mut plan = ColumnPlan::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(discovered.len());

    for profiled in discovered {
        let name = profiled.column.name.as_str();
        if !seen.insert(name) {
            continue;
        }
        match existing.get(name) {
            Some(prior) => plan.updates.push((
                prior.id,
                merge_values(&profiled.column, &profiled.stats, Some(prior)),
            )),
            None => plan
                .creates
                .push(merge_values(&profiled.column, &profiled.stats, None)),
        }
    }

    let mut vanished: Vec<&SourceColumn> = existing
        .values()
        .filter(|c| !seen.contains(c.column_name.as_str()))
        .collect();
    vanished.sort_by_key(|c| (c.column_position, c.id));
    plan.vanished = vanished.into_iter().map(|c| c.id).collect();

    plan
}
