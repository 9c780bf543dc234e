//! Query execution tools.
//!
//! This module implements `execute_query_read_only` and `execute_query`.
//! Both go through the [`QueryGate`] before anything is sent to Trino.

use std::time::Instant;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::db::QueryExecutor;
use crate::error::{ServerError, ServerResult};
use crate::models::{ColumnMetadata, QueryOutcome, effective_limit};
use crate::sql::{DefaultClassifier, QueryClassifier};
use crate::tools::format::{OutputFormat, format_as_markdown, format_as_table};
use crate::tools::policy::QueryGate;

pub const STATUS_MESSAGE: &str = "Query executed successfully without output.";

/// Input for the query tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL statement to execute
    pub query: String,
    /// Output format: "json" returns structured data, "table" returns ASCII table, "markdown" returns markdown table
    #[serde(default)]
    pub format: OutputFormat,
    /// Maximum rows to return. Default: 100, max: 10000
    #[serde(default)]
    pub limit: Option<u32>,
}

impl QueryInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            format: OutputFormat::Json,
            limit: None,
        }
    }
}

/// Output from the query tools.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Column metadata (name, Trino type). Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnMetadata>,
    /// Result rows as key-value maps. Empty if format is table/markdown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// Pre-formatted output when format is table or markdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    /// True if result was truncated due to limit
    pub truncated: bool,
    /// Number of rows returned
    pub row_count: usize,
    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
    /// Set for statements that produced no result set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_count: Option<u64>,
}

impl QueryOutput {
    /// Shape an engine outcome for the caller.
    pub fn from_outcome(
        outcome: QueryOutcome,
        format: OutputFormat,
        limit: usize,
        execution_time_ms: u64,
    ) -> Self {
        let result = match outcome {
            QueryOutcome::Status(status) => {
                return Self {
                    columns: Vec::new(),
                    rows: Vec::new(),
                    formatted: None,
                    truncated: false,
                    row_count: 0,
                    execution_time_ms,
                    message: Some(STATUS_MESSAGE.to_string()),
                    update_type: status.update_type,
                    update_count: status.update_count,
                };
            }
            QueryOutcome::Rows(result) => result,
        };

        let truncated = result.row_count() > limit;
        let row_count = result.row_count().min(limit);

        let (columns, rows, formatted) = match format {
            OutputFormat::Json => {
                let rows = result.rows_as_maps(limit);
                (result.columns, rows, None)
            }
            OutputFormat::Table => (
                Vec::new(),
                Vec::new(),
                Some(format_as_table(
                    &result.columns,
                    &result.rows[..row_count],
                    truncated,
                    execution_time_ms,
                )),
            ),
            OutputFormat::Markdown => (
                Vec::new(),
                Vec::new(),
                Some(format_as_markdown(
                    &result.columns,
                    &result.rows[..row_count],
                    truncated,
                )),
            ),
        };

        Self {
            columns,
            rows,
            formatted,
            truncated,
            row_count,
            execution_time_ms,
            message: None,
            update_type: None,
            update_count: None,
        }
    }
}

pub struct QueryToolHandler<C = DefaultClassifier> {
    executor: QueryExecutor,
    gate: QueryGate<C>,
}

impl<C: QueryClassifier> QueryToolHandler<C> {
    pub fn new(executor: QueryExecutor, gate: QueryGate<C>) -> Self {
        Self { executor, gate }
    }

    /// `execute_query_read_only`: only statements classified read-only run.
    pub async fn execute_read_only(&self, input: QueryInput) -> ServerResult<QueryOutput> {
        validate_query(&input.query)?;
        self.gate.authorize_read_only(&input.query)?;
        self.run(input).await
    }

    /// `execute_query`: anything runs, provided writes are enabled.
    pub async fn execute(&self, input: QueryInput) -> ServerResult<QueryOutput> {
        validate_query(&input.query)?;
        self.gate.authorize_general(&input.query)?;
        self.run(input).await
    }

    async fn run(&self, input: QueryInput) -> ServerResult<QueryOutput> {
        let limit = effective_limit(input.limit);
        let start = Instant::now();
        // One extra row tells us whether the result was truncated
        let outcome = self
            .executor
            .execute_limited(&input.query, limit.saturating_add(1))
            .await?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let output = QueryOutput::from_outcome(outcome, input.format, limit, execution_time_ms);
        info!(
            rows = output.row_count,
            truncated = output.truncated,
            execution_time_ms,
            "Query completed"
        );
        Ok(output)
    }
}

fn validate_query(query: &str) -> ServerResult<()> {
    if query.trim().is_empty() {
        return Err(ServerError::invalid_input("query must not be empty"));
    }
    Ok(())
}
