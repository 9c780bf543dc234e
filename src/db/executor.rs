//! Query execution.
//!
//! Every statement, whether typed by the caller or generated by a metadata
//! tool, goes through [`QueryExecutor`] so it carries the watermark.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::db::QueryEngine;
use crate::error::ServerResult;
use crate::models::{QueryOutcome, ResultSet};
use crate::sql::WatermarkFields;

#[derive(Clone)]
pub struct QueryExecutor {
    engine: Arc<dyn QueryEngine>,
    watermark: WatermarkFields,
}

impl QueryExecutor {
    pub fn new(engine: Arc<dyn QueryEngine>, watermark: WatermarkFields) -> Self {
        Self { engine, watermark }
    }

    pub fn watermark(&self) -> &WatermarkFields {
        &self.watermark
    }

    /// Watermark `sql` and run it.
    pub async fn execute(&self, sql: &str) -> ServerResult<QueryOutcome> {
        let start = Instant::now();
        debug!(sql = %sql, "Executing query");

        let statement = self.watermark.inject(sql);
        let result = self.engine.execute(&statement).await;
        log_outcome(&result, start);
        result
    }

    /// Watermark `sql` and run it, reading at most `max_rows` rows.
    pub async fn execute_limited(&self, sql: &str, max_rows: usize) -> ServerResult<QueryOutcome> {
        let start = Instant::now();
        debug!(sql = %sql, limit = max_rows, "Executing query");

        let statement = self.watermark.inject(sql);
        let result = self.engine.execute_limited(&statement, max_rows).await;
        log_outcome(&result, start);
        result
    }

    /// Run a statement that must produce rows.
    pub async fn fetch_rows(&self, sql: &str) -> ServerResult<ResultSet> {
        self.execute(sql).await?.into_rows(sql)
    }
}

fn log_outcome(result: &ServerResult<QueryOutcome>, start: Instant) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(QueryOutcome::Rows(rows)) => {
            debug!(rows = rows.row_count(), elapsed_ms, "Query returned rows")
        }
        Ok(QueryOutcome::Status(status)) => debug!(
            update_type = ?status.update_type,
            update_count = ?status.update_count,
            elapsed_ms,
            "Statement completed"
        ),
        Err(e) => warn!(error = %e, elapsed_ms, "Query failed"),
    }
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("watermark", &self.watermark)
            .finish_non_exhaustive()
    }
}
