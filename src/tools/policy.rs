//! Execution gate for the query tools.
//!
//! A rejected query never reaches the query engine.

use tracing::warn;

use crate::error::{ServerError, ServerResult};
use crate::sql::{DefaultClassifier, QueryClassifier};

/// Whether the general-purpose `execute_query` tool may run.
///
/// Set once from `ALLOW_WRITE_QUERIES` and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WritePolicy {
    allow_writes: bool,
}

impl WritePolicy {
    pub fn new(allow_writes: bool) -> Self {
        Self { allow_writes }
    }

    pub fn read_only() -> Self {
        Self::new(false)
    }

    pub fn allows_writes(&self) -> bool {
        self.allow_writes
    }
}

/// Classifier plus write policy.
#[derive(Debug, Clone, Default)]
pub struct QueryGate<C = DefaultClassifier> {
    classifier: C,
    policy: WritePolicy,
}

impl QueryGate<DefaultClassifier> {
    /// Gate using the classifier selected at build time.
    pub fn new(policy: WritePolicy) -> Self {
        Self::with_classifier(DefaultClassifier::default(), policy)
    }
}

impl<C: QueryClassifier> QueryGate<C> {
    pub fn with_classifier(classifier: C, policy: WritePolicy) -> Self {
        Self { classifier, policy }
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    /// Allow only queries positively classified as read-only.
    pub fn authorize_read_only(&self, sql: &str) -> ServerResult<()> {
        let verdict = self.classifier.classify(sql);
        if verdict.is_read_only() {
            return Ok(());
        }
        warn!(verdict = verdict.label(), "Rejected query on read-only tool");
        Err(ServerError::policy_violation(
            "Query does not appear to be read-only. Use the execute_query tool for write operations.",
            "Use execute_query (requires ALLOW_WRITE_QUERIES=true) for statements that modify data",
        ))
    }

    /// Allow any query when writes are enabled, nothing otherwise.
    ///
    /// The flag alone decides; the query is not classified.
    pub fn authorize_general(&self, _sql: &str) -> ServerResult<()> {
        if self.policy.allows_writes() {
            return Ok(());
        }
        warn!("Rejected execute_query call: write queries are disabled");
        Err(ServerError::policy_violation(
            "Write queries are disabled. Set ALLOW_WRITE_QUERIES=true to enable execute_query, \
             or use execute_query_read_only for read-only queries.",
            "Use execute_query_read_only for SELECT, SHOW, DESCRIBE and EXPLAIN",
        ))
    }
}
