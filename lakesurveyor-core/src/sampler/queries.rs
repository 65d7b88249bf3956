//! Profiling query text.

use crate::catalog::TableRef;
use crate::catalog::sql::quote_identifier;

pub fn null_count_sql(table: &TableRef, column: &str) -> String {
    format!(
        "SELECT COUNT(*) - COUNT({col}) FROM {table}",
        col = quote_identifier(column),
        table = table.quoted()
    )
}

/// Distinct count over at most `row_limit` rows.
pub fn distinct_count_sql(table: &TableRef, column: &str, row_limit: u64) -> String {
    let col = quote_identifier(column);
    format!(
        "SELECT COUNT(DISTINCT {col}) FROM (SELECT {col} FROM {table} LIMIT {limit}) AS bounded",
        col = col,
        table = table.quoted(),
        limit = row_limit
    )
}

pub fn avg_length_sql(table: &TableRef, column: &str) -> String {
    let col = quote_identifier(column);
    format!(
        "SELECT AVG(LENGTH({col})) FROM {table} WHERE {col} IS NOT NULL",
        col = col,
        table = table.quoted()
    )
}

pub fn min_max_sql(table: &TableRef, column: &str) -> String {
    let col = quote_identifier(column);
    format!(
        "SELECT MIN({col}), MAX({col}) FROM {table} WHERE {col} IS NOT NULL",
        col = col,
        table = table.quoted()
    )
}

pub fn sample_values_sql(table: &TableRef, column: &str, limit: u32) -> String {
    let col = quote_identifier(column);
    format!(
        "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL LIMIT {limit}",
        col = col,
        table = table.quoted(),
        limit = limit
    )
}
