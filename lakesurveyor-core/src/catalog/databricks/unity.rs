//! Unity Catalog REST API 2.1 payloads and paginated listings.

use super::connection::ApiConnection;
use crate::Result;
use crate::catalog::types::{CatalogInfo, DiscoveredColumn, DiscoveredTable, SchemaInfo};
use crate::models::TableKind;
use serde::Deserialize;
use serde::de::DeserializeOwned;

const API_PREFIX: [&str; 3] = ["api", "2.1", "unity-catalog"];

/// One page of a listing.
pub(crate) trait Page: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogPayload {
    pub name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogPage {
    #[serde(default)]
    catalogs: Vec<CatalogPayload>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Page for CatalogPage {
    type Item = CatalogPayload;

    fn into_parts(self) -> (Vec<CatalogPayload>, Option<String>) {
        (self.catalogs, self.next_page_token)
    }
}

impl From<CatalogPayload> for CatalogInfo {
    fn from(p: CatalogPayload) -> Self {
        Self {
            name: p.name,
            comment: p.comment,
            owner: p.owner,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaPayload {
    pub name: String,
    #[serde(default)]
    pub catalog_name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaPage {
    #[serde(default)]
    schemas: Vec<SchemaPayload>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Page for SchemaPage {
    type Item = SchemaPayload;

    fn into_parts(self) -> (Vec<SchemaPayload>, Option<String>) {
        (self.schemas, self.next_page_token)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ColumnPayload {
    pub name: String,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub type_text: Option<String>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub partition_index: Option<i64>,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct TablePayload {
    pub name: String,
    #[serde(default)]
    pub catalog_name: Option<String>,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub table_type: Option<String>,
    #[serde(default)]
    pub data_source_format: Option<String>,
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TablePage {
    #[serde(default)]
    tables: Vec<TablePayload>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Page for TablePage {
    type Item = TablePayload;

    fn into_parts(self) -> (Vec<TablePayload>, Option<String>) {
        (self.tables, self.next_page_token)
    }
}

impl TablePayload {
    fn into_discovered(self, catalog: &str, schema: &str) -> DiscoveredTable {
        DiscoveredTable {
            catalog_name: self.catalog_name.unwrap_or_else(|| catalog.to_string()),
            schema_name: self.schema_name.unwrap_or_else(|| schema.to_string()),
            name: self.name,
            kind: self
                .table_type
                .as_deref()
                .map(TableKind::from_remote)
                .unwrap_or_default(),
            format: self.data_source_format,
            location: self.storage_location,
            owner: self.owner,
            comment: self.comment,
        }
    }

    /// Columns in ordinal order with 1-based positions.
    fn into_columns(self) -> Vec<DiscoveredColumn> {
        let mut columns = self.columns;
        if columns.iter().all(|c| c.position.is_some()) {
            columns.sort_by_key(|c| c.position);
        }
        columns
            .into_iter()
            .enumerate()
            .map(|(i, c)| DiscoveredColumn {
                type_name: c
                    .type_name
                    .or_else(|| c.type_text.clone())
                    .unwrap_or_else(|| "STRING".to_string()),
                name: c.name,
                position: i as i64 + 1,
                type_text: c.type_text,
                nullable: c.nullable,
                comment: c.comment,
                partition_index: c.partition_index,
            })
            .collect()
    }
}

/// Follows `next_page_token` until the listing is exhausted.
async fn list_all<P>(
    conn: &ApiConnection,
    resource: &str,
    params: &[(&str, &str)],
) -> Result<Vec<P::Item>>
where
    P: Page,
{
    let mut segments: Vec<&str> = API_PREFIX.to_vec();
    segments.push(resource);
    let url = conn.endpoint(&segments)?;

    let mut items = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page: P = {
            let mut query: Vec<(&str, &str)> = params.to_vec();
            if let Some(t) = token.as_deref() {
                query.push(("page_token", t));
            }
            conn.get_json(url.clone(), &query).await?
        };
        let (batch, next) = page.into_parts();
        items.extend(batch);

        match next {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }
    Ok(items)
}

pub(crate) async fn list_catalogs(conn: &ApiConnection) -> Result<Vec<CatalogInfo>> {
    let catalogs = list_all::<CatalogPage>(conn, "catalogs", &[]).await?;
    Ok(catalogs.into_iter().map(CatalogInfo::from).collect())
}

pub(crate) async fn list_schemas(conn: &ApiConnection, catalog: &str) -> Result<Vec<SchemaInfo>> {
    let schemas =
        list_all::<SchemaPage>(conn, "schemas", &[("catalog_name", catalog)]).await?;
    Ok(schemas
        .into_iter()
        .map(|s| SchemaInfo {
            catalog_name: s.catalog_name.unwrap_or_else(|| catalog.to_string()),
            name: s.name,
            comment: s.comment,
            owner: s.owner,
        })
        .collect())
}

pub(crate) async fn list_tables(
    conn: &ApiConnection,
    catalog: &str,
    schema: &str,
) -> Result<Vec<DiscoveredTable>> {
    let tables = list_all::<TablePage>(
        conn,
        "tables",
        &[
            ("catalog_name", catalog),
            ("schema_name", schema),
            ("omit_columns", "true"),
        ],
    )
    .await?;
    Ok(tables
        .into_iter()
        .map(|t| t.into_discovered(catalog, schema))
        .collect())
}

pub(crate) async fn list_columns(
    conn: &ApiConnection,
    full_name: &str,
) -> Result<Vec<DiscoveredColumn>> {
    let mut segments: Vec<&str> = API_PREFIX.to_vec();
    segments.extend(["tables", full_name]);
    let url = conn.endpoint(&segments)?;
    let table: TablePayload = conn.get_json(url, &[]).await?;
    Ok(table.into_columns())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_payload_decoding() {
        let json = r#"{
            "name": "customers",
            "catalog_name": "oztest_dev",
            "schema_name": "raw_data",
            "table_type": "MANAGED",
            "data_source_format": "DELTA",
            "storage_location": "s3://bucket/customers",
            "owner": "data-eng",
            "columns": [
                {"name": "email", "type_name": "STRING", "type_text": "string", "position": 1},
                {"name": "customer_id", "type_name": "LONG", "type_text": "bigint", "nullable": false, "position": 0}
            ]
        }"#;
        let payload: TablePayload = serde_json::from_str(json).expect("valid payload");
        let listed: TablePayload = serde_json::from_str(json).expect("valid payload");
        let table = listed.into_discovered("ignored", "ignored");
        assert_eq!(table.full_name(), "oztest_dev.raw_data.customers");
        assert_eq!(table.kind, TableKind::Table);
        assert_eq!(table.format.as_deref(), Some("DELTA"));

        let columns = payload.into_columns();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].name, "customer_id");
        assert_eq!(columns[0].position, 1);
        assert!(!columns[0].nullable);
        assert_eq!(columns[1].name, "email");
        assert_eq!(columns[1].position, 2);
        assert!(columns[1].nullable);
    }

    #[test]
    fn test_missing_fields_default() {
        let payload: TablePayload =
            serde_json::from_str(r#"{"name": "v", "table_type": "VIEW"}"#).expect("valid");
        let table = payload.into_discovered("c", "s");
        assert_eq!(table.full_name(), "c.s.v");
        assert_eq!(table.kind, TableKind::View);
        assert!(table.location.is_none());

        let page: CatalogPage = serde_json::from_str("{}").expect("valid");
        let (items, next) = page.into_parts();
        assert!(items.is_empty());
        assert!(next.is_none());
    }
}
