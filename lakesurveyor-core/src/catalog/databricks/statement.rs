//! SQL Statement Execution API 2.0.
//!
//! Statements run synchronously against a SQL warehouse: the request waits
//! server-side up to `wait_timeout` and the statement is cancelled if it has
//! not finished by then. Results come back inline as JSON arrays of
//! nullable strings.

use super::connection::ApiConnection;
use crate::Result;
use crate::catalog::types::QueryRows;
use crate::error::LakeSurveyorError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct StatementRequest<'a> {
    pub warehouse_id: &'a str,
    pub statement: &'a str,
    pub wait_timeout: String,
    pub on_wait_timeout: &'static str,
    pub disposition: &'static str,
    pub format: &'static str,
}

impl<'a> StatementRequest<'a> {
    pub(crate) fn new(warehouse_id: &'a str, statement: &'a str, wait_secs: u64) -> Self {
        Self {
            warehouse_id,
            statement,
            wait_timeout: format!("{}s", wait_secs),
            on_wait_timeout: "CANCEL",
            disposition: "INLINE",
            format: "JSON_ARRAY",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatementError {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatementStatus {
    pub state: String,
    #[serde(default)]
    pub error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ColumnSchema {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResultSchema {
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Manifest {
    #[serde(default)]
    pub schema: ResultSchema,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResultChunk {
    #[serde(default)]
    pub data_array: Vec<Vec<Option<String>>>,
    #[serde(default)]
    pub next_chunk_internal_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatementResponse {
    #[serde(default)]
    pub statement_id: Option<String>,
    pub status: StatementStatus,
    #[serde(default)]
    pub manifest: Option<Manifest>,
    #[serde(default)]
    pub result: Option<ResultChunk>,
}

impl StatementResponse {
    /// Fails unless the statement reached `SUCCEEDED`.
    fn ensure_succeeded(&self) -> Result<()> {
        if self.status.state == "SUCCEEDED" {
            return Ok(());
        }
        let detail = self
            .status
            .error
            .as_ref()
            .and_then(|e| match (&e.error_code, &e.message) {
                (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
                (None, Some(message)) => Some(message.clone()),
                (Some(code), None) => Some(code.clone()),
                (None, None) => None,
            })
            .unwrap_or_else(|| "no error detail".to_string());
        Err(LakeSurveyorError::query_failed(format!(
            "statement {} ended in state {}: {}",
            self.statement_id.as_deref().unwrap_or("<unknown>"),
            self.status.state,
            detail
        )))
    }
}

/// Runs one statement and gathers every inline result chunk.
pub(crate) async fn execute(
    conn: &ApiConnection,
    warehouse_id: &str,
    statement: &str,
    wait_secs: u64,
) -> Result<QueryRows> {
    tracing::debug!("Executing statement: {}", statement);

    let url = conn.endpoint(&["api", "2.0", "sql", "statements"])?;
    let request = StatementRequest::new(warehouse_id, statement, wait_secs);
    let response: StatementResponse = conn.post_json(url, &request).await?;
    response.ensure_succeeded()?;

    let columns = response
        .manifest
        .map(|m| m.schema.columns.into_iter().map(|c| c.name).collect())
        .unwrap_or_default();

    let mut chunk = response.result.unwrap_or_default();
    let mut rows = std::mem::take(&mut chunk.data_array);
    while let Some(link) = chunk.next_chunk_internal_link.take() {
        let next: ResultChunk = conn.get_json(conn.link(&link)?, &[]).await?;
        chunk = next;
        rows.append(&mut chunk.data_array);
    }

    Ok(QueryRows::new(columns, rows))
}
