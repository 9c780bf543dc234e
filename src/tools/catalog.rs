//! Catalog browsing tools.
//!
//! This module implements `list_catalogs`, `list_schemas`, `list_tables`,
//! `describe_table`, `show_create_table` and `get_table_stats`. Missing
//! catalog/schema arguments fall back to the configured defaults.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::config::TrinoConnection;
use crate::db::QueryExecutor;
use crate::error::{ServerError, ServerResult};

/// Input for the list_schemas tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListSchemasInput {
    /// Catalog name. Defaults to TRINO_CATALOG.
    #[serde(default)]
    pub catalog: Option<String>,
}

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Catalog name. Defaults to TRINO_CATALOG.
    #[serde(default)]
    pub catalog: Option<String>,
    /// Schema name. Defaults to TRINO_SCHEMA.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Input for the table-level tools.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TableInput {
    /// Table name
    pub table: String,
    /// Catalog name. Defaults to TRINO_CATALOG.
    #[serde(default)]
    pub catalog: Option<String>,
    /// Schema name. Defaults to TRINO_SCHEMA.
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListCatalogsOutput {
    pub catalogs: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListSchemasOutput {
    pub catalog: String,
    pub schemas: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    pub catalog: String,
    pub schema: String,
    pub tables: Vec<String>,
    pub count: usize,
}

/// Output shared by describe_table and get_table_stats.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableRowsOutput {
    /// Fully qualified table name
    pub table: String,
    /// One object per result row, keyed by column name
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ShowCreateTableOutput {
    pub table: String,
    /// CREATE TABLE statement, empty if Trino returned none
    pub statement: String,
}

/// Quote an identifier as a Trino delimited identifier.
///
/// ```
/// use trino_mcp_server::tools::catalog::quote_identifier;
///
/// assert_eq!(quote_identifier("orders"), "\"orders\"");
/// assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn pick(explicit: Option<&str>, default: Option<&str>) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(default)
        .map(String::from)
}

pub struct CatalogToolHandler {
    executor: QueryExecutor,
    default_catalog: Option<String>,
    default_schema: Option<String>,
}

impl CatalogToolHandler {
    pub fn new(
        executor: QueryExecutor,
        default_catalog: Option<String>,
        default_schema: Option<String>,
    ) -> Self {
        Self {
            executor,
            default_catalog,
            default_schema,
        }
    }

    pub fn from_connection(executor: QueryExecutor, connection: &TrinoConnection) -> Self {
        Self::new(
            executor,
            connection.catalog.clone(),
            connection.schema.clone(),
        )
    }

    fn resolve_catalog(&self, catalog: Option<&str>) -> ServerResult<String> {
        pick(catalog, self.default_catalog.as_deref())
            .ok_or_else(|| ServerError::invalid_input("Catalog must be specified"))
    }

    fn resolve_schema(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> ServerResult<(String, String)> {
        match (
            pick(catalog, self.default_catalog.as_deref()),
            pick(schema, self.default_schema.as_deref()),
        ) {
            (Some(catalog), Some(schema)) => Ok((catalog, schema)),
            _ => Err(ServerError::invalid_input(
                "Both catalog and schema must be specified",
            )),
        }
    }

    fn resolve_table(&self, input: &TableInput) -> ServerResult<String> {
        let table = input.table.trim();
        if table.is_empty() {
            return Err(ServerError::invalid_input("Table name must be specified"));
        }
        let (catalog, schema) =
            self.resolve_schema(input.catalog.as_deref(), input.schema.as_deref())?;
        Ok(format!(
            "{}.{}.{}",
            quote_identifier(&catalog),
            quote_identifier(&schema),
            quote_identifier(table)
        ))
    }

    pub async fn list_catalogs(&self) -> ServerResult<ListCatalogsOutput> {
        let catalogs = self
            .executor
            .fetch_rows("SHOW CATALOGS")
            .await?
            .column_strings("Catalog")?;
        info!(count = catalogs.len(), "Listed catalogs");
        Ok(ListCatalogsOutput {
            count: catalogs.len(),
            catalogs,
        })
    }

    pub async fn list_schemas(&self, input: ListSchemasInput) -> ServerResult<ListSchemasOutput> {
        let catalog = self.resolve_catalog(input.catalog.as_deref())?;
        let sql = format!("SHOW SCHEMAS FROM {}", quote_identifier(&catalog));
        let schemas = self.executor.fetch_rows(&sql).await?.column_strings("Schema")?;
        info!(catalog = %catalog, count = schemas.len(), "Listed schemas");
        Ok(ListSchemasOutput {
            catalog,
            count: schemas.len(),
            schemas,
        })
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> ServerResult<ListTablesOutput> {
        let (catalog, schema) =
            self.resolve_schema(input.catalog.as_deref(), input.schema.as_deref())?;
        let sql = format!(
            "SHOW TABLES FROM {}.{}",
            quote_identifier(&catalog),
            quote_identifier(&schema)
        );
        let tables = self.executor.fetch_rows(&sql).await?.column_strings("Table")?;
        info!(catalog = %catalog, schema = %schema, count = tables.len(), "Listed tables");
        Ok(ListTablesOutput {
            catalog,
            schema,
            count: tables.len(),
            tables,
        })
    }

    pub async fn describe_table(&self, input: TableInput) -> ServerResult<TableRowsOutput> {
        let table = self.resolve_table(&input)?;
        let rows = self
            .executor
            .fetch_rows(&format!("DESCRIBE {}", table))
            .await?;
        Ok(TableRowsOutput {
            rows: rows.rows_as_maps(usize::MAX),
            table,
        })
    }

    pub async fn show_create_table(&self, input: TableInput) -> ServerResult<ShowCreateTableOutput> {
        let table = self.resolve_table(&input)?;
        let statement = self
            .executor
            .fetch_rows(&format!("SHOW CREATE TABLE {}", table))
            .await?
            .column_strings("Create Table")?
            .into_iter()
            .next()
            .unwrap_or_default();
        Ok(ShowCreateTableOutput { table, statement })
    }

    pub async fn get_table_stats(&self, input: TableInput) -> ServerResult<TableRowsOutput> {
        let table = self.resolve_table(&input)?;
        let rows = self
            .executor
            .fetch_rows(&format!("SHOW STATS FOR {}", table))
            .await?;
        Ok(TableRowsOutput {
            rows: rows.rows_as_maps(usize::MAX),
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::QueryEngine;
    use crate::models::{ColumnMetadata, QueryOutcome, ResultSet};
    use crate::sql::WatermarkFields;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Answers every statement with a single-column result named after the SHOW target.
    #[derive(Default)]
    struct FakeTrino {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueryEngine for FakeTrino {
        async fn execute(&self, sql: &str) -> ServerResult<QueryOutcome> {
            self.seen.lock().unwrap().push(sql.to_string());
            let body = sql.lines().last().unwrap_or_default();
            let (column, values) = if body.starts_with("SHOW CATALOGS") {
                ("Catalog", vec!["hive", "system"])
            } else if body.starts_with("SHOW SCHEMAS") {
                ("Schema", vec!["default", "web"])
            } else if body.starts_with("SHOW TABLES") {
                ("Table", vec!["orders"])
            } else if body.starts_with("SHOW CREATE TABLE") {
                ("Create Table", vec![])
            } else {
                ("Column", vec!["id"])
            };
            Ok(QueryOutcome::Rows(ResultSet::new(
                vec![ColumnMetadata::new(column, "varchar")],
                values.into_iter().map(|v| vec![json!(v)]).collect(),
            )))
        }
    }

    fn handler(
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> (CatalogToolHandler, Arc<FakeTrino>) {
        let engine = Arc::new(FakeTrino::default());
        let executor = QueryExecutor::new(engine.clone(), WatermarkFields::new());
        (
            CatalogToolHandler::new(executor, catalog.map(String::from), schema.map(String::from)),
            engine,
        )
    }

    fn last_statement(engine: &FakeTrino) -> String {
        let seen = engine.seen.lock().unwrap();
        seen.last().unwrap().lines().last().unwrap().to_string()
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("hive"), "\"hive\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_identifier("x; DROP TABLE y"), "\"x; DROP TABLE y\"");
    }

    #[tokio::test]
    async fn test_list_catalogs() {
        let (handler, _) = handler(None, None);
        let out = handler.list_catalogs().await.unwrap();
        assert_eq!(out.catalogs, vec!["hive", "system"]);
        assert_eq!(out.count, 2);
    }

    #[tokio::test]
    async fn test_list_schemas_uses_default_catalog() {
        let (handler, engine) = handler(Some("hive"), None);
        let out = handler.list_schemas(ListSchemasInput::default()).await.unwrap();
        assert_eq!(out.catalog, "hive");
        assert_eq!(out.schemas, vec!["default", "web"]);
        assert_eq!(last_statement(&engine), "SHOW SCHEMAS FROM \"hive\"");
    }

    #[tokio::test]
    async fn test_list_schemas_requires_catalog() {
        let (handler, engine) = handler(None, None);
        let err = handler
            .list_schemas(ListSchemasInput {
                catalog: Some("  ".into()),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Catalog must be specified"));
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_tables_requires_both() {
        let (handler, _) = handler(Some("hive"), None);
        let err = handler
            .list_tables(ListTablesInput::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Both catalog and schema must be specified"));
    }

    #[tokio::test]
    async fn test_list_tables_explicit_overrides_default() {
        let (handler, engine) = handler(Some("hive"), Some("default"));
        let out = handler
            .list_tables(ListTablesInput {
                catalog: Some("iceberg".into()),
                schema: None,
            })
            .await
            .unwrap();
        assert_eq!(out.tables, vec!["orders"]);
        assert_eq!(
            last_statement(&engine),
            "SHOW TABLES FROM \"iceberg\".\"default\""
        );
    }

    #[tokio::test]
    async fn test_describe_table() {
        let (handler, engine) = handler(Some("hive"), Some("web"));
        let out = handler
            .describe_table(TableInput {
                table: "orders".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(out.table, "\"hive\".\"web\".\"orders\"");
        assert_eq!(out.rows[0]["Column"], json!("id"));
        assert_eq!(
            last_statement(&engine),
            "DESCRIBE \"hive\".\"web\".\"orders\""
        );
    }

    #[tokio::test]
    async fn test_show_create_table_empty() {
        let (handler, _) = handler(Some("hive"), Some("web"));
        let out = handler
            .show_create_table(TableInput {
                table: "orders".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(out.statement, "");
    }

    #[tokio::test]
    async fn test_table_name_required() {
        let (handler, _) = handler(Some("hive"), Some("web"));
        let err = handler
            .get_table_stats(TableInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidInput { .. }));
    }
}
