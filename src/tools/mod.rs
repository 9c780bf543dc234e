//! MCP tool implementations.
//!
//! This module contains all Trino tool handlers:
//! - `catalog`: list catalogs/schemas/tables, describe, show create, table stats
//! - `query`: `execute_query_read_only` and `execute_query`
//! - `export`: write query results to a CSV or JSON file
//! - `policy`: the read-only / write-policy gate in front of query execution
//! - `format`: table and markdown rendering

pub mod catalog;
pub mod export;
pub mod format;
pub mod policy;
pub mod query;

pub use catalog::{
    CatalogToolHandler, ListCatalogsOutput, ListSchemasInput, ListSchemasOutput, ListTablesInput,
    ListTablesOutput, ShowCreateTableOutput, TableInput, TableRowsOutput,
};
pub use export::{ExportInput, ExportOutput, ExportToolHandler};
pub use format::OutputFormat;
pub use policy::{QueryGate, WritePolicy};
pub use query::{QueryInput, QueryOutput, QueryToolHandler};
