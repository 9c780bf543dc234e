//! Trino client REST protocol types.
//!
//! Only the fields the client reads are modelled; everything else in the
//! coordinator's response is ignored.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::ServerError;
use crate::models::ColumnMetadata;

pub const HEADER_USER: &str = "X-Trino-User";
pub const HEADER_SOURCE: &str = "X-Trino-Source";
pub const HEADER_CATALOG: &str = "X-Trino-Catalog";
pub const HEADER_SCHEMA: &str = "X-Trino-Schema";

/// One page of a statement's results (`POST /v1/statement` or a `nextUri` GET).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub next_uri: Option<String>,
    #[serde(default)]
    pub columns: Option<Vec<Column>>,
    #[serde(default)]
    pub data: Option<Vec<Vec<JsonValue>>>,
    #[serde(default)]
    pub stats: Option<StatementStats>,
    #[serde(default)]
    pub error: Option<QueryError>,
    #[serde(default)]
    pub update_type: Option<String>,
    #[serde(default)]
    pub update_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl From<Column> for ColumnMetadata {
    fn from(col: Column) -> Self {
        ColumnMetadata::new(col.name, col.type_name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementStats {
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    pub message: String,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_name: Option<String>,
    #[serde(default)]
    pub error_type: Option<String>,
}

impl From<QueryError> for ServerError {
    fn from(err: QueryError) -> Self {
        ServerError::execution(err.message, err.error_name, err.error_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_first_page() {
        let page: QueryResults = serde_json::from_str(
            r#"{
                "id": "20240101_000000_00001_abcde",
                "infoUri": "http://localhost:8080/ui/query.html?x",
                "nextUri": "http://localhost:8080/v1/statement/queued/x/1",
                "stats": {"state": "QUEUED", "queued": true}
            }"#,
        )
        .unwrap();
        assert_eq!(page.id, "20240101_000000_00001_abcde");
        assert!(page.next_uri.is_some());
        assert!(page.columns.is_none());
        assert_eq!(page.stats.unwrap().state, "QUEUED");
    }

    #[test]
    fn test_deserialize_data_page() {
        let page: QueryResults = serde_json::from_str(
            r#"{
                "id": "q",
                "columns": [{"name": "Catalog", "type": "varchar(6)", "typeSignature": {}}],
                "data": [["hive"], ["system"]]
            }"#,
        )
        .unwrap();
        let columns: Vec<ColumnMetadata> =
            page.columns.unwrap().into_iter().map(Into::into).collect();
        assert_eq!(columns, vec![ColumnMetadata::new("Catalog", "varchar(6)")]);
        assert_eq!(page.data.unwrap().len(), 2);
    }

    #[test]
    fn test_error_converts_to_execution_error() {
        let page: QueryResults = serde_json::from_str(
            r#"{
                "id": "q",
                "stats": {"state": "FAILED"},
                "error": {
                    "message": "line 1:15: Table 'hive.default.nope' does not exist",
                    "errorCode": 46,
                    "errorName": "TABLE_NOT_FOUND",
                    "errorType": "USER_ERROR"
                }
            }"#,
        )
        .unwrap();
        let err: ServerError = page.error.unwrap().into();
        match err {
            ServerError::Execution {
                error_name,
                error_code,
                ..
            } => {
                assert_eq!(error_name.as_deref(), Some("TABLE_NOT_FOUND"));
                assert_eq!(error_code, Some(46));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
