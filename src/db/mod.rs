//! Query engine access.
//!
//! - `protocol`: Trino REST wire types
//! - `client`: [`TrinoClient`], the HTTP implementation of [`QueryEngine`]
//! - `executor`: [`QueryExecutor`], which watermarks statements before they reach the engine

pub mod client;
pub mod executor;
pub mod protocol;

pub use client::{RetryPolicy, TrinoClient};
pub use executor::QueryExecutor;

use async_trait::async_trait;

use crate::error::ServerResult;
use crate::models::QueryOutcome;

/// Something that runs SQL text and returns its outcome.
///
/// Implementations receive the statement exactly as it should be sent,
/// watermark included.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn execute(&self, sql: &str) -> ServerResult<QueryOutcome>;

    /// Run `sql`, returning at most `max_rows` rows.
    ///
    /// Engines that can stop reading early should do so and release the
    /// query; the default reads everything and truncates.
    async fn execute_limited(&self, sql: &str, max_rows: usize) -> ServerResult<QueryOutcome> {
        let mut outcome = self.execute(sql).await?;
        if let QueryOutcome::Rows(result) = &mut outcome {
            result.rows.truncate(max_rows);
        }
        Ok(outcome)
    }
}
