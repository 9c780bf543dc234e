//! Query-related data models.
//!
//! This module defines the result types produced by the query engine.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ServerError, ServerResult};

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Clamp a requested row limit to `[1, MAX_ROW_LIMIT]`, defaulting to `DEFAULT_ROW_LIMIT`.
pub fn effective_limit(limit: Option<u32>) -> usize {
    limit
        .map(|l| l.clamp(1, MAX_ROW_LIMIT))
        .unwrap_or(DEFAULT_ROW_LIMIT) as usize
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnMetadata {
    pub name: String,
    /// Trino type signature (e.g., "varchar", "bigint", "array(integer)")
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Rows returned by a statement, in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnMetadata>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Values of one column as strings. Non-string values use their JSON text.
    pub fn column_strings(&self, name: &str) -> ServerResult<Vec<String>> {
        let idx = self.column_index(name).ok_or_else(|| {
            ServerError::internal(format!(
                "Expected column '{}' in result, got [{}]",
                name,
                self.column_names().join(", ")
            ))
        })?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(value_to_string).unwrap_or_default())
            .collect())
    }

    /// First `limit` rows as column-name keyed objects.
    ///
    /// With duplicate column names the last one wins.
    pub fn rows_as_maps(&self, limit: usize) -> Vec<serde_json::Map<String, JsonValue>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter().chain(std::iter::repeat(&JsonValue::Null)))
                    .map(|(col, value)| (col.name.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }
}

/// Outcome of a statement that produced no result columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StatementStatus {
    /// Trino update type, e.g. "INSERT", "CREATE TABLE"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
    /// Affected row count when the engine reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_count: Option<u64>,
}

/// What the engine returned for a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Rows(ResultSet),
    Status(StatementStatus),
}

impl QueryOutcome {
    /// The rows, or an internal error for metadata queries that must return rows.
    pub fn into_rows(self, context: &str) -> ServerResult<ResultSet> {
        match self {
            Self::Rows(rows) => Ok(rows),
            Self::Status(_) => Err(ServerError::internal(format!(
                "{} returned no result set",
                context
            ))),
        }
    }
}

fn value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultSet {
        ResultSet::new(
            vec![
                ColumnMetadata::new("Column", "varchar"),
                ColumnMetadata::new("Type", "varchar"),
                ColumnMetadata::new("Position", "integer"),
            ],
            vec![
                vec![json!("id"), json!("bigint"), json!(1)],
                vec![json!("name"), json!("varchar"), json!(2)],
            ],
        )
    }

    #[test]
    fn test_effective_limit_bounds() {
        assert_eq!(effective_limit(None), 100);
        assert_eq!(effective_limit(Some(0)), 1);
        assert_eq!(effective_limit(Some(50)), 50);
        assert_eq!(effective_limit(Some(99999)), 10000);
    }

    #[test]
    fn test_column_strings() {
        let rs = sample();
        assert_eq!(rs.column_strings("Column").unwrap(), vec!["id", "name"]);
        assert_eq!(rs.column_strings("Position").unwrap(), vec!["1", "2"]);
    }

    #[test]
    fn test_column_strings_missing_column() {
        let err = sample().column_strings("Catalog").unwrap_err();
        assert!(err.to_string().contains("Catalog"));
    }

    #[test]
    fn test_rows_as_maps_respects_limit() {
        let maps = sample().rows_as_maps(1);
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0]["Column"], json!("id"));
        assert_eq!(maps[0]["Position"], json!(1));
    }

    #[test]
    fn test_rows_as_maps_pads_short_rows() {
        let rs = ResultSet::new(
            vec![ColumnMetadata::new("a", "integer"), ColumnMetadata::new("b", "integer")],
            vec![vec![json!(1)]],
        );
        assert_eq!(rs.rows_as_maps(10)[0]["b"], JsonValue::Null);
    }

    #[test]
    fn test_status_into_rows_is_error() {
        let outcome = QueryOutcome::Status(StatementStatus::default());
        assert!(outcome.into_rows("SHOW CATALOGS").is_err());
    }

    #[test]
    fn test_column_metadata_serializes_type() {
        let value = serde_json::to_value(ColumnMetadata::new("id", "bigint")).unwrap();
        assert_eq!(value, json!({"name": "id", "type": "bigint"}));
    }
}
