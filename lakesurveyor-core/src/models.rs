//! Persisted records for discovered source tables and columns.
//!
//! These are the rows held in the local store. Rows are keyed by natural
//! key (`full_table_name` for tables, `(table_id, column_name)` for columns);
//! the surrogate `id`s are what external mapping records reference.

use crate::catalog::TableRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of table as stored locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableKind {
    #[default]
    Table,
    View,
    External,
    Temporary,
}

impl TableKind {
    /// Normalizes a remote `table_type` value to a stored kind.
    ///
    /// Unknown values fall back to [`TableKind::Table`].
    pub fn from_remote(table_type: &str) -> Self {
        match table_type.trim().to_ascii_uppercase().as_str() {
            "MANAGED" | "STREAMING_TABLE" | "TABLE" => Self::Table,
            "VIEW" | "MATERIALIZED_VIEW" | "METRIC_VIEW" => Self::View,
            "EXTERNAL" | "EXTERNAL_SHALLOW_CLONE" | "MANAGED_SHALLOW_CLONE" | "FOREIGN" => {
                Self::External
            }
            "TEMPORARY" | "TEMP" => Self::Temporary,
            other => {
                tracing::debug!("Unrecognized table type '{}', storing as TABLE", other);
                Self::Table
            }
        }
    }

    /// Value stored in the `table_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::External => "EXTERNAL",
            Self::Temporary => "TEMPORARY",
        }
    }

    /// Parses a stored value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TABLE" => Some(Self::Table),
            "VIEW" => Some(Self::View),
            "EXTERNAL" => Some(Self::External),
            "TEMPORARY" => Some(Self::Temporary),
            _ => None,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis lifecycle of a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    /// Value stored in the `analysis_status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parses a stored value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "analyzing" => Some(Self::Analyzing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the `catalog.schema.table` natural key.
pub fn full_table_name(catalog: &str, schema: &str, table: &str) -> String {
    format!("{}.{}.{}", catalog, schema, table)
}

/// A source table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTable {
    pub id: i64,
    pub catalog_name: String,
    pub schema_name: String,
    pub table_name: String,
    pub full_table_name: String,
    pub table_type: TableKind,
    pub table_format: Option<String>,
    pub location: Option<String>,
    pub owner: Option<String>,
    /// Comma-separated list of users allowed to access the table.
    /// Curated locally; discovery never writes it.
    pub source_owners: Option<String>,
    pub row_count: Option<i64>,
    pub size_bytes: Option<i64>,
    pub discovered_by: Option<String>,
    pub discovered_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub last_analyzed: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub analysis_status: AnalysisStatus,
    /// Free-text notes curated locally; discovery never writes them.
    pub analysis_notes: Option<String>,
}

impl SourceTable {
    /// Name parts as stored, for generating SQL against the table.
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.catalog_name, &self.schema_name, &self.table_name)
    }

    /// Parses the `source_owners` list, trimming blanks.
    pub fn owners(&self) -> Vec<&str> {
        self.source_owners
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_table_name)
    }
}

/// A source column row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceColumn {
    pub id: i64,
    pub table_id: i64,
    pub column_name: String,
    pub column_position: i64,
    pub data_type: String,
    pub physical_data_type: Option<String>,
    pub is_nullable: bool,
    /// Best effort; the catalog service does not report key constraints.
    pub is_primary_key: bool,
    /// Best effort; the catalog service does not report key constraints.
    pub is_foreign_key: bool,
    pub null_count: Option<i64>,
    pub distinct_count: Option<i64>,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub avg_length: Option<f64>,
    pub column_comment: Option<String>,
    /// Curated locally; discovery never writes it.
    pub business_description: Option<String>,
    pub sample_values: Vec<String>,
    pub discovered_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_kind_from_remote() {
        assert_eq!(TableKind::from_remote("MANAGED"), TableKind::Table);
        assert_eq!(TableKind::from_remote("STREAMING_TABLE"), TableKind::Table);
        assert_eq!(TableKind::from_remote("view"), TableKind::View);
        assert_eq!(TableKind::from_remote("MATERIALIZED_VIEW"), TableKind::View);
        assert_eq!(TableKind::from_remote("EXTERNAL"), TableKind::External);
        assert_eq!(TableKind::from_remote("FOREIGN"), TableKind::External);
        assert_eq!(TableKind::from_remote("TEMPORARY"), TableKind::Temporary);
        assert_eq!(TableKind::from_remote("SOMETHING_NEW"), TableKind::Table);
    }

    #[test]
    fn test_stored_values_round_trip() {
        for kind in [
            TableKind::Table,
            TableKind::View,
            TableKind::External,
            TableKind::Temporary,
        ] {
            assert_eq!(TableKind::parse(kind.as_str()), Some(kind));
        }
        for status in [
            AnalysisStatus::Pending,
            AnalysisStatus::Analyzing,
            AnalysisStatus::Completed,
            AnalysisStatus::Failed,
        ] {
            assert_eq!(AnalysisStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AnalysisStatus::parse("done"), None);
    }

    #[test]
    fn test_full_table_name() {
        assert_eq!(
            full_table_name("oztest_dev", "raw_data", "customers"),
            "oztest_dev.raw_data.customers"
        );
    }

    #[test]
    fn test_source_owners_parsing() {
        let now = Utc::now();
        let table = SourceTable {
            id: 1,
            catalog_name: "c".to_string(),
            schema_name: "s".to_string(),
            table_name: "t".to_string(),
            full_table_name: "c.s.t".to_string(),
            table_type: TableKind::Table,
            table_format: None,
            location: None,
            owner: None,
            source_owners: Some("alice, bob,, carol ".to_string()),
            row_count: None,
            size_bytes: None,
            discovered_by: None,
            discovered_at: now,
            last_updated: now,
            last_analyzed: None,
            is_active: true,
            analysis_status: AnalysisStatus::Pending,
            analysis_notes: None,
        };
        assert_eq!(table.owners(), vec!["alice", "bob", "carol"]);
        assert_eq!(table.to_string(), "c.s.t");
    }
}
