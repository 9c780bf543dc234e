//! Query export tool.
//!
//! This module implements `export_query_results`: run a read-only query and
//! write every row to a local file. The file extension picks the format.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

use crate::db::QueryExecutor;
use crate::error::{ServerError, ServerResult};
use crate::models::{QueryOutcome, ResultSet};
use crate::sql::{DefaultClassifier, QueryClassifier};
use crate::tools::policy::QueryGate;
use crate::tools::query::STATUS_MESSAGE;

/// Input for the export_query_results tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExportInput {
    /// Read-only SQL statement to execute
    pub query: String,
    /// Destination path. ".csv" writes CSV with a header row, anything else writes JSON.
    pub output_file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExportOutput {
    pub output_file: String,
    pub format: ExportFormat,
    /// Data rows written (1 for a status record)
    pub rows_written: usize,
    pub size_bytes: u64,
    pub size_formatted: String,
}

/// Format bytes as human-readable size string (1024-based units).
///
/// ```
/// use trino_mcp_server::tools::export::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1048576), "1 MB");
/// ```
pub fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::WINDOWS)
}

pub struct ExportToolHandler<C = DefaultClassifier> {
    executor: QueryExecutor,
    gate: QueryGate<C>,
}

impl<C: QueryClassifier> ExportToolHandler<C> {
    pub fn new(executor: QueryExecutor, gate: QueryGate<C>) -> Self {
        Self { executor, gate }
    }

    pub async fn export(&self, input: ExportInput) -> ServerResult<ExportOutput> {
        if input.query.trim().is_empty() {
            return Err(ServerError::invalid_input("query must not be empty"));
        }
        if input.output_file.trim().is_empty() {
            return Err(ServerError::invalid_input("output_file must not be empty"));
        }
        self.gate.authorize_read_only(&input.query)?;

        let path = Path::new(&input.output_file);
        let format = ExportFormat::from_path(path);
        let outcome = self.executor.execute(&input.query).await?;
        let (bytes, rows_written) = render(&outcome, format)?;

        tokio::fs::write(path, &bytes).await.map_err(|e| {
            ServerError::io(format!("Cannot write {}: {}", input.output_file, e))
        })?;

        let size_bytes = bytes.len() as u64;
        info!(
            output_file = %input.output_file,
            rows = rows_written,
            size_bytes,
            "Exported query results"
        );
        Ok(ExportOutput {
            output_file: input.output_file,
            format,
            rows_written,
            size_bytes,
            size_formatted: format_size(size_bytes),
        })
    }
}

/// Serialize an outcome; returns the file body and the number of data rows.
pub fn render(outcome: &QueryOutcome, format: ExportFormat) -> ServerResult<(Vec<u8>, usize)> {
    match (outcome, format) {
        (QueryOutcome::Rows(result), ExportFormat::Csv) => {
            Ok((rows_to_csv(result)?, result.row_count()))
        }
        (QueryOutcome::Rows(result), ExportFormat::Json) => {
            let body = serde_json::to_vec_pretty(&result.rows_as_maps(usize::MAX))
                .map_err(|e| ServerError::internal(format!("JSON encoding failed: {}", e)))?;
            Ok((body, result.row_count()))
        }
        (QueryOutcome::Status(_), ExportFormat::Csv) => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["status", "message"]).map_err(csv_error)?;
            writer.write_record(["success", STATUS_MESSAGE]).map_err(csv_error)?;
            Ok((finish_csv(writer)?, 1))
        }
        (QueryOutcome::Status(_), ExportFormat::Json) => {
            let status = serde_json::json!({
                "status": "success",
                "message": STATUS_MESSAGE,
            });
            let body = serde_json::to_vec_pretty(&status)
                .map_err(|e| ServerError::internal(format!("JSON encoding failed: {}", e)))?;
            Ok((body, 1))
        }
    }
}

fn rows_to_csv(result: &ResultSet) -> ServerResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(result.columns.iter().map(|c| c.name.as_str()))
        .map_err(csv_error)?;
    for row in &result.rows {
        let record: Vec<String> = (0..result.columns.len())
            .map(|i| csv_field(row.get(i).unwrap_or(&JsonValue::Null)))
            .collect();
        writer.write_record(&record).map_err(csv_error)?;
    }
    finish_csv(writer)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> ServerResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| ServerError::internal(format!("CSV encoding failed: {}", e)))
}

fn csv_field(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_error(err: csv::Error) -> ServerError {
    ServerError::internal(format!("CSV encoding failed: {}", err))
}
