//! End-to-end tests for the query write policy.
//!
//! These tests drive the query tool handlers against a recording engine and
//! verify that rejected statements never reach it, while accepted ones arrive
//! with the watermark attached.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use trino_mcp_server::ServerError;
use trino_mcp_server::db::{QueryEngine, QueryExecutor};
use trino_mcp_server::error::ServerResult;
use trino_mcp_server::models::{ColumnMetadata, QueryOutcome, ResultSet, StatementStatus};
use trino_mcp_server::sql::{LexicalClassifier, QueryClassifier, WatermarkFields};
use trino_mcp_server::tools::{QueryGate, QueryInput, QueryToolHandler, WritePolicy};

/// Engine that records every statement it receives.
#[derive(Default)]
struct RecordingEngine {
    received: Mutex<Vec<String>>,
}

impl RecordingEngine {
    fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEngine for RecordingEngine {
    async fn execute(&self, sql: &str) -> ServerResult<QueryOutcome> {
        self.received.lock().unwrap().push(sql.to_string());
        if sql.contains("INSERT") {
            return Ok(QueryOutcome::Status(StatementStatus {
                update_type: Some("INSERT".to_string()),
                update_count: Some(1),
            }));
        }
        Ok(QueryOutcome::Rows(ResultSet::new(
            vec![ColumnMetadata::new("id", "bigint")],
            vec![vec![json!(1)], vec![json!(2)]],
        )))
    }
}

fn watermark() -> WatermarkFields {
    WatermarkFields::new()
        .with("trino_mcp_version", "0.1.0")
        .with("user", "alice")
}

/// Helper to setup a handler over a fresh recording engine
fn setup(allow_writes: bool) -> (QueryToolHandler, Arc<RecordingEngine>) {
    let engine = Arc::new(RecordingEngine::default());
    let executor = QueryExecutor::new(engine.clone(), watermark());
    let handler = QueryToolHandler::new(executor, QueryGate::new(WritePolicy::new(allow_writes)));
    (handler, engine)
}

fn setup_with<C: QueryClassifier>(
    classifier: C,
    allow_writes: bool,
) -> (QueryToolHandler<C>, Arc<RecordingEngine>) {
    let engine = Arc::new(RecordingEngine::default());
    let executor = QueryExecutor::new(engine.clone(), watermark());
    let gate = QueryGate::with_classifier(classifier, WritePolicy::new(allow_writes));
    (QueryToolHandler::new(executor, gate), engine)
}

// =========================================================================
// execute_query_read_only
// =========================================================================

#[tokio::test]
async fn test_drop_table_rejected_by_read_only_tool() {
    let (handler, engine) = setup(true);

    let err = handler
        .execute_read_only(QueryInput::new("DROP TABLE t"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServerError::PolicyViolation { .. }));
    assert!(err.to_string().contains("execute_query"));
    assert!(engine.received().is_empty());
}

#[tokio::test]
async fn test_read_only_tool_rejects_writes_even_when_writes_enabled() {
    for (sql, allow_writes) in [
        ("INSERT INTO t VALUES (1)", true),
        ("EXPLAIN ANALYZE SELECT 1", true),
        ("/* SELECT */ DELETE FROM t", false),
        ("SELECT 1; DROP TABLE t", false),
        ("SELEC * FRM t", false),
    ] {
        let (handler, engine) = setup(allow_writes);
        let result = handler.execute_read_only(QueryInput::new(sql)).await;
        assert!(result.is_err(), "{} should be rejected", sql);
        assert!(engine.received().is_empty(), "{} reached the engine", sql);
    }
}

#[tokio::test]
async fn test_write_after_unbalanced_nested_comment_never_runs() {
    for sql in [
        "/* /* */ DROP TABLE t -- */ SELECT 1",
        "/* /* */ DROP TABLE t /* */ */ SELECT 1",
    ] {
        let (handler, engine) = setup(true);
        let err = handler
            .execute_read_only(QueryInput::new(sql))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::PolicyViolation { .. }), "{}", sql);
        assert!(engine.received().is_empty(), "{} reached the engine", sql);

        let (handler, engine) = setup_with(LexicalClassifier, true);
        assert!(handler.execute_read_only(QueryInput::new(sql)).await.is_err());
        assert!(engine.received().is_empty(), "{} reached the engine", sql);
    }
}

#[tokio::test]
async fn test_read_only_query_runs_with_watermark() {
    let (handler, engine) = setup(false);

    let output = handler
        .execute_read_only(QueryInput::new("SELECT id FROM t"))
        .await
        .unwrap();

    assert_eq!(output.row_count, 2);
    assert!(!output.truncated);

    let received = engine.received();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0],
        "-- {\"trino_mcp_version\":\"0.1.0\",\"user\":\"alice\"} --\nSELECT id FROM t"
    );
}

#[tokio::test]
async fn test_read_only_tool_with_lexical_classifier() {
    let (handler, engine) = setup_with(LexicalClassifier, false);

    assert!(
        handler
            .execute_read_only(QueryInput::new("SHOW CREATE TABLE t"))
            .await
            .is_ok()
    );
    assert!(
        handler
            .execute_read_only(QueryInput::new("DROP TABLE t"))
            .await
            .is_err()
    );
    assert_eq!(engine.received().len(), 1);
}

#[tokio::test]
async fn test_blank_query_is_invalid_input() {
    let (handler, engine) = setup(true);

    let err = handler
        .execute_read_only(QueryInput::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ServerError::InvalidInput { .. }));

    let err = handler.execute(QueryInput::new("")).await.unwrap_err();
    assert!(matches!(err, ServerError::InvalidInput { .. }));

    assert!(engine.received().is_empty());
}

// =========================================================================
// execute_query
// =========================================================================

#[tokio::test]
async fn test_insert_rejected_when_writes_disabled() {
    let (handler, engine) = setup(false);

    let err = handler
        .execute(QueryInput::new("INSERT INTO t VALUES (1)"))
        .await
        .unwrap_err();

    assert!(matches!(err, ServerError::PolicyViolation { .. }));
    assert!(err.to_string().contains("ALLOW_WRITE_QUERIES"));
    assert!(engine.received().is_empty());
}

#[tokio::test]
async fn test_general_tool_rejects_reads_when_writes_disabled() {
    let (handler, engine) = setup(false);

    let result = handler.execute(QueryInput::new("SELECT 1")).await;

    assert!(result.is_err());
    assert!(engine.received().is_empty());
}

#[tokio::test]
async fn test_insert_runs_when_writes_enabled() {
    let (handler, engine) = setup(true);

    let output = handler
        .execute(QueryInput::new("INSERT INTO t VALUES (1)"))
        .await
        .unwrap();

    assert_eq!(output.row_count, 0);
    assert!(output.message.is_some());
    assert_eq!(output.update_type.as_deref(), Some("INSERT"));
    assert_eq!(output.update_count, Some(1));

    let received = engine.received();
    assert_eq!(received.len(), 1);
    assert!(received[0].starts_with("-- {"));
    assert!(received[0].ends_with("\nINSERT INTO t VALUES (1)"));
}

#[tokio::test]
async fn test_limit_applies_to_general_tool() {
    let (handler, _engine) = setup(true);

    let mut input = QueryInput::new("SELECT id FROM t");
    input.limit = Some(1);
    let output = handler.execute(input).await.unwrap();

    assert_eq!(output.row_count, 1);
    assert!(output.truncated);
}
