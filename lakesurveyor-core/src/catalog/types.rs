//! Explicit value types decoded from the catalog service.

use crate::catalog::sql::quote_table;
use crate::models::{TableKind, full_table_name};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub name: String,
    pub comment: Option<String>,
    pub owner: Option<String>,
}

/// A schema inside a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub name: String,
    pub catalog_name: String,
    pub comment: Option<String>,
    pub owner: Option<String>,
}

/// A table addressed by its catalog, schema and table names.
///
/// Generated SQL quotes each part separately, so a part containing a dot
/// is still addressed correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// The `catalog.schema.table` natural key.
    pub fn full_name(&self) -> String {
        full_table_name(&self.catalog, &self.schema, &self.table)
    }

    /// Backtick-quoted name for use in SQL text.
    pub fn quoted(&self) -> String {
        quote_table(&self.catalog, &self.schema, &self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// A table as reported by the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredTable {
    pub catalog_name: String,
    pub schema_name: String,
    pub name: String,
    pub kind: TableKind,
    /// Storage format such as `DELTA` or `PARQUET`
    pub format: Option<String>,
    pub location: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

impl DiscoveredTable {
    /// Creates a plain managed table with no optional attributes.
    pub fn new(
        catalog_name: impl Into<String>,
        schema_name: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            catalog_name: catalog_name.into(),
            schema_name: schema_name.into(),
            name: name.into(),
            kind: TableKind::Table,
            format: None,
            location: None,
            owner: None,
            comment: None,
        }
    }

    /// The `catalog.schema.table` natural key.
    pub fn full_name(&self) -> String {
        full_table_name(&self.catalog_name, &self.schema_name, &self.name)
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.catalog_name, &self.schema_name, &self.name)
    }

    /// Case-insensitive substring match on the table name or comment.
    ///
    /// An empty term matches every table.
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self
                .comment
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle))
    }
}

/// A column as reported by the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredColumn {
    pub name: String,
    /// 1-based ordinal position
    pub position: i64,
    /// Logical type name (`STRING`, `BIGINT`, ...)
    pub type_name: String,
    /// Full type text (`decimal(10,2)`, `array<string>`, ...)
    pub type_text: Option<String>,
    pub nullable: bool,
    pub comment: Option<String>,
    pub partition_index: Option<i64>,
}

impl DiscoveredColumn {
    /// Creates a nullable column with no comment.
    pub fn new(name: impl Into<String>, position: i64, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position,
            type_name: type_name.into(),
            type_text: None,
            nullable: true,
            comment: None,
            partition_index: None,
        }
    }

    /// Type used for statistic selection: the type text when present.
    pub fn profile_type(&self) -> &str {
        self.type_text.as_deref().unwrap_or(&self.type_name)
    }
}

/// Rows returned by an ad-hoc statement, each cell as a nullable string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryRows {
    /// Builds a result set from raw rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// A single-row, single-column result.
    pub fn scalar(value: Option<String>) -> Self {
        Self {
            columns: vec!["value".to_string()],
            rows: vec![vec![value]],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `(row, column)`, `None` when absent or NULL.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Index of a named column, compared case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// Table-level probe results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProbe {
    /// `None` when the count query failed
    pub row_count: Option<i64>,
    /// Zero when size is unavailable for the table kind
    pub size_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_and_matches() {
        let mut table = DiscoveredTable::new("oztest_dev", "raw_data", "Customers");
        assert_eq!(table.full_name(), "oztest_dev.raw_data.Customers");
        assert!(table.matches("cust"));
        assert!(table.matches("CUSTOMERS"));
        assert!(!table.matches("order"));

        table.comment = Some("Purchase ORDERS by customer".to_string());
        assert!(table.matches("orders"));
        assert!(table.matches(""));
    }

    #[test]
    fn test_table_ref_quotes_each_part() {
        let table = DiscoveredTable::new("team.lake", "raw", "events");
        let table_ref = table.table_ref();
        assert_eq!(table_ref.full_name(), "team.lake.raw.events");
        assert_eq!(table_ref.to_string(), "team.lake.raw.events");
        assert_eq!(table_ref.quoted(), "`team.lake`.`raw`.`events`");
    }

    #[test]
    fn test_profile_type_prefers_type_text() {
        let mut column = DiscoveredColumn::new("amount", 3, "DECIMAL");
        assert_eq!(column.profile_type(), "DECIMAL");
        column.type_text = Some("decimal(10,2)".to_string());
        assert_eq!(column.profile_type(), "decimal(10,2)");
    }

    #[test]
    fn test_query_rows_access() {
        let rows = QueryRows::new(
            vec!["format".to_string(), "sizeInBytes".to_string()],
            vec![vec![Some("delta".to_string()), None]],
        );
        assert_eq!(rows.cell(0, 0), Some("delta"));
        assert_eq!(rows.cell(0, 1), None);
        assert_eq!(rows.cell(1, 0), None);
        assert_eq!(rows.column_index("SIZEINBYTES"), Some(1));
        assert!(QueryRows::default().is_empty());
        assert_eq!(QueryRows::scalar(Some("1".to_string())).cell(0, 0), Some("1"));
    }
}
