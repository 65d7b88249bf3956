//! SQL text generation for the warehouse dialect.
//!
//! Identifiers are backtick-quoted with embedded backticks doubled.

use crate::catalog::TableRef;

/// Quotes a single identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a three-part table name.
pub fn quote_table(catalog: &str, schema: &str, table: &str) -> String {
    format!(
        "{}.{}.{}",
        quote_identifier(catalog),
        quote_identifier(schema),
        quote_identifier(table)
    )
}

/// Row count probe.
pub fn count_rows_sql(table: &TableRef) -> String {
    format!("SELECT COUNT(*) FROM {}", table.quoted())
}

/// Size probe. Not every table kind supports it.
pub fn describe_detail_sql(table: &TableRef) -> String {
    format!("DESCRIBE DETAIL {}", table.quoted())
}

/// Position of `sizeInBytes` in `DESCRIBE DETAIL` output when the result
/// carries no column names.
pub const DETAIL_SIZE_INDEX: usize = 5;

/// Parses an integer cell, accepting `"42"`, `"42.0"` and `"4.2E1"` forms.
pub fn parse_count(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f as i64)
    })
}
