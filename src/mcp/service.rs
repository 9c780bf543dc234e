//! MCP service implementation using rmcp.
//!
//! This module defines the TrinoService struct with all Trino tools
//! exposed via the MCP protocol using the rmcp framework's macros.

use crate::config::ServerSettings;
use crate::db::{QueryEngine, QueryExecutor};
use crate::tools::catalog::{
    CatalogToolHandler, ListCatalogsOutput, ListSchemasInput, ListSchemasOutput, ListTablesInput,
    ListTablesOutput, ShowCreateTableOutput, TableInput, TableRowsOutput,
};
use crate::tools::export::{ExportInput, ExportOutput, ExportToolHandler};
use crate::tools::policy::QueryGate;
use crate::tools::query::{QueryInput, QueryOutput, QueryToolHandler};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct TrinoService {
    /// Watermarking executor shared by every tool
    executor: QueryExecutor,
    /// Settings resolved once at startup
    settings: Arc<ServerSettings>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl TrinoService {
    /// Create a new TrinoService instance.
    ///
    /// # Arguments
    ///
    /// * `engine` - Query engine statements are sent to (the Trino client in production)
    /// * `settings` - Immutable server settings
    pub fn new(engine: Arc<dyn QueryEngine>, settings: Arc<ServerSettings>) -> Self {
        Self {
            executor: QueryExecutor::new(engine, settings.watermark.clone()),
            settings,
            tool_router: Self::tool_router(),
        }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    fn catalog_handler(&self) -> CatalogToolHandler {
        CatalogToolHandler::from_connection(self.executor.clone(), &self.settings.connection)
    }

    fn gate(&self) -> QueryGate {
        QueryGate::new(self.settings.write_policy)
    }
}

#[tool_router]
impl TrinoService {
    #[tool(description = "List all catalogs available in Trino.")]
    async fn list_catalogs(&self) -> Result<Json<ListCatalogsOutput>, McpError> {
        self.catalog_handler()
            .list_catalogs()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "List all schemas in a catalog.\nCatalog defaults to the configured TRINO_CATALOG."
    )]
    async fn list_schemas(
        &self,
        Parameters(input): Parameters<ListSchemasInput>,
    ) -> Result<Json<ListSchemasOutput>, McpError> {
        self.catalog_handler()
            .list_schemas(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "List all tables in a schema.\nCatalog and schema default to TRINO_CATALOG and TRINO_SCHEMA."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        self.catalog_handler()
            .list_tables(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Describe the columns of a table (DESCRIBE).")]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<Json<TableRowsOutput>, McpError> {
        self.catalog_handler()
            .describe_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Show the CREATE TABLE statement for a table.")]
    async fn show_create_table(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<Json<ShowCreateTableOutput>, McpError> {
        self.catalog_handler()
            .show_create_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Get table statistics (SHOW STATS FOR).")]
    async fn get_table_stats(
        &self,
        Parameters(input): Parameters<TableInput>,
    ) -> Result<Json<TableRowsOutput>, McpError> {
        self.catalog_handler()
            .get_table_stats(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Execute a read-only SQL query (SELECT, SHOW, DESCRIBE, EXPLAIN).\nQueries that may modify data are rejected without being sent to Trino.\nOutput format: json (default), table, or markdown."
    )]
    async fn execute_query_read_only(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        QueryToolHandler::new(self.executor.clone(), self.gate())
            .execute_read_only(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Execute any SQL query, including writes.\nOnly available when the server runs with ALLOW_WRITE_QUERIES=true; otherwise use execute_query_read_only.\nOutput format: json (default), table, or markdown."
    )]
    async fn execute_query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        QueryToolHandler::new(self.executor.clone(), self.gate())
            .execute(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Run a read-only query and write all result rows to a local file.\nA .csv path writes CSV with a header row; any other extension writes JSON."
    )]
    async fn export_query_results(
        &self,
        Parameters(input): Parameters<ExportInput>,
    ) -> Result<Json<ExportOutput>, McpError> {
        ExportToolHandler::new(self.executor.clone(), self.gate())
            .export(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for TrinoService {
    fn get_info(&self) -> ServerInfo {
        let writes = if self.settings.write_policy.allows_writes() {
            "enabled"
        } else {
            "disabled (ALLOW_WRITE_QUERIES is not set)"
        };
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "trino-mcp-server".to_owned(),
                title: Some("Trino MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Tools for browsing and querying a Trino cluster.\n\
                \n\
                ## Workflow\n\
                1. `list_catalogs`, then `list_schemas` and `list_tables` to find data\n\
                2. `describe_table`, `show_create_table`, `get_table_stats` to inspect a table\n\
                3. `execute_query_read_only` for SELECT/SHOW/DESCRIBE/EXPLAIN\n\
                4. `export_query_results` to save a read-only query's rows to a file\n\
                \n\
                ## Writes\n\
                `execute_query` runs any statement. Write queries are currently {}.\n\
                \n\
                Every statement is sent with a leading traceability comment.",
                writes
            )),
        }
    }
}
