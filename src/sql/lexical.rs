//! Keyword-based read-only classification.
//!
//! Used instead of the AST classifier when the crate is built with the
//! `lexical-classifier` feature. Strips comments, normalizes whitespace and
//! case, then looks for whole-word write keywords and statements led by a
//! session or maintenance command.

use crate::sql::classifier::{QueryClassifier, QueryVerdict};
use regex::Regex;
use std::sync::LazyLock;

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--[^\n]*").expect("line comment pattern is valid"));

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Inspection commands that contain a write keyword.
static SHOW_CREATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bSHOW CREATE (TABLE|VIEW|SCHEMA)\b").expect("show create pattern is valid")
});

static WRITE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(INSERT|UPDATE|DELETE|CREATE|DROP|ALTER|TRUNCATE|MERGE|REPLACE|GRANT|REVOKE|CALL)\b",
    )
    .expect("write keyword pattern is valid")
});

/// Statements that change tables or session state without a write keyword.
static LEADING_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|;) ?(ANALYZE|REFRESH|COMMENT|SET|RESET|USE|PREPARE|EXECUTE|DEALLOCATE|START|COMMIT|ROLLBACK)\b",
    )
    .expect("leading command pattern is valid")
});

static EXPLAIN_ANALYZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^EXPLAIN\b.*\bANALYZE\b").expect("explain analyze pattern is valid")
});

/// Keyword matcher.
///
/// Matching is whole-word, so a column named `inserted` or a literal
/// `'INSERTED'` does not count. A literal that *is* a write keyword
/// (`'DELETE'`) does, which errs towards rejecting.
///
/// # Examples
///
/// ```
/// use trino_mcp_server::sql::{LexicalClassifier, QueryClassifier, QueryVerdict};
///
/// let classifier = LexicalClassifier;
/// assert_eq!(classifier.classify("SHOW CREATE VIEW v"), QueryVerdict::ReadOnly);
/// assert_eq!(classifier.classify("insert into t values (1)"), QueryVerdict::Write);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalClassifier;

impl LexicalClassifier {
    /// Remove comments, collapse whitespace and upper-case the query.
    pub fn normalize(sql: &str) -> String {
        let without_block = BLOCK_COMMENT.replace_all(sql, " ");
        let without_line = LINE_COMMENT.replace_all(&without_block, " ");
        WHITESPACE
            .replace_all(&without_line, " ")
            .trim()
            .to_uppercase()
    }
}

impl QueryClassifier for LexicalClassifier {
    fn classify(&self, sql: &str) -> QueryVerdict {
        let normalized = Self::normalize(sql);
        if normalized.is_empty() {
            return QueryVerdict::Unparseable;
        }

        if EXPLAIN_ANALYZE.is_match(&normalized) {
            return QueryVerdict::Write;
        }

        // Drop the CREATE from SHOW CREATE ... so that anything following
        // (`SHOW CREATE TABLE t; DROP TABLE t`) is still inspected.
        let inspected = SHOW_CREATE.replace_all(&normalized, "SHOW $1");

        if WRITE_KEYWORD.is_match(&inspected) || LEADING_COMMAND.is_match(&inspected) {
            QueryVerdict::Write
        } else {
            QueryVerdict::ReadOnly
        }
    }
}
