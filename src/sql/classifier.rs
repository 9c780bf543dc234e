//! Read-only classification of client-supplied SQL.
//!
//! Decides whether a statement may run through the read-only query tool.
//! Uses [sqlparser](https://docs.rs/sqlparser/) to walk the statement tree so
//! that writes hidden in CTEs or behind comments are still found. Anything the
//! classifier cannot positively identify as read-only is treated as a write.

use sqlparser::ast::{Query, SetExpr, Statement, Visit, Visitor};
use sqlparser::dialect::{Dialect, GenericDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use std::ops::ControlFlow;
use tracing::debug;

/// Outcome of classifying a SQL string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryVerdict {
    /// Statement only reads data (SELECT, SHOW, DESCRIBE, EXPLAIN)
    ReadOnly,
    /// Statement may modify data or metadata
    Write,
    /// Statement could not be parsed. Handled like `Write`.
    Unparseable,
}

impl QueryVerdict {
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }

    /// `Unparseable` counts as a write.
    pub fn is_write(self) -> bool {
        !self.is_read_only()
    }

    /// Short label used in logs and rejection messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::Write => "write",
            Self::Unparseable => "unparseable",
        }
    }
}

/// Strategy for classifying SQL text.
///
/// Implementations are pure and stateless; they never fail; malformed input
/// yields a verdict like any other input.
pub trait QueryClassifier: Send + Sync {
    fn classify(&self, sql: &str) -> QueryVerdict;
}

/// AST-based classifier.
///
/// # Examples
///
/// ```
/// use trino_mcp_server::sql::{QueryClassifier, QueryVerdict, StructuralClassifier};
///
/// let classifier = StructuralClassifier;
/// assert_eq!(classifier.classify("SELECT * FROM orders"), QueryVerdict::ReadOnly);
/// assert_eq!(classifier.classify("SHOW CREATE TABLE orders"), QueryVerdict::ReadOnly);
/// assert_eq!(classifier.classify("EXPLAIN ANALYZE SELECT 1"), QueryVerdict::Write);
/// assert_eq!(classifier.classify("DROP TABLE orders"), QueryVerdict::Write);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralClassifier;

impl QueryClassifier for StructuralClassifier {
    fn classify(&self, sql: &str) -> QueryVerdict {
        let dialect = GenericDialect {};

        let Some(lexed) = Lexed::new(&dialect, sql) else {
            return QueryVerdict::Unparseable;
        };
        if lexed.statements == 0 || lexed.nested_comment {
            return QueryVerdict::Unparseable;
        }

        match Parser::parse_sql(&dialect, sql) {
            Ok(statements) if statements.is_empty() => QueryVerdict::Unparseable,
            // Some SHOW forms swallow every remaining token, `;` included
            Ok(statements) if statements.len() != lexed.statements => QueryVerdict::Write,
            Ok(statements) => {
                if statements
                    .iter()
                    .all(|stmt| classify_statement(stmt, &lexed).is_read_only())
                {
                    QueryVerdict::ReadOnly
                } else {
                    QueryVerdict::Write
                }
            }
            Err(e) => {
                debug!(error = %e, "SQL not parseable, trying command form");
                classify_command(&lexed)
            }
        }
    }
}

/// Token-level view of the input, used for command forms the grammar does not model.
struct Lexed {
    /// Unquoted word tokens, upper-cased, comments removed
    words: Vec<String>,
    /// Number of non-empty `;`-separated statements
    statements: usize,
    /// A block comment contains `/*`. The tokenizer nests block comments
    /// while Trino ends one at the first `*/`, so the two disagree on where
    /// the comment stops.
    nested_comment: bool,
}

impl Lexed {
    fn new(dialect: &dyn Dialect, sql: &str) -> Option<Self> {
        let tokens = Tokenizer::new(dialect, sql).tokenize().ok()?;
        let nested_comment = tokens.iter().any(|t| {
            matches!(t, Token::Whitespace(Whitespace::MultiLineComment(body)) if body.contains("/*"))
        });
        let significant: Vec<&Token> = tokens
            .iter()
            .filter(|t| !matches!(**t, Token::Whitespace(_) | Token::EOF))
            .collect();

        let words = significant
            .iter()
            .filter_map(|t| match t {
                Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_ascii_uppercase()),
                _ => None,
            })
            .collect();

        let statements = significant
            .split(|t| matches!(**t, Token::SemiColon))
            .filter(|part| !part.is_empty())
            .count();

        Some(Self {
            words,
            statements,
            nested_comment,
        })
    }

    fn first_word(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    fn mentions(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }
}

/// Classify a statement the parser rejected.
///
/// Trino accepts `SHOW CATALOGS`, `SHOW STATS FOR`, `EXPLAIN (TYPE ...)` and
/// similar forms that sqlparser does not know. Only single statements led by
/// an inspection keyword qualify.
fn classify_command(lexed: &Lexed) -> QueryVerdict {
    if lexed.statements != 1 {
        return QueryVerdict::Unparseable;
    }
    match lexed.first_word() {
        Some("EXPLAIN") if lexed.mentions("ANALYZE") => QueryVerdict::Write,
        Some("SHOW" | "EXPLAIN" | "DESCRIBE" | "DESC") => QueryVerdict::ReadOnly,
        _ => QueryVerdict::Unparseable,
    }
}

/// Classify a single parsed statement.
fn classify_statement(stmt: &Statement, lexed: &Lexed) -> QueryVerdict {
    match stmt {
        // DESCRIBE / DESC / EXPLAIN <table>
        Statement::ExplainTable { .. } => QueryVerdict::ReadOnly,

        // EXPLAIN ANALYZE runs the statement. The option-list form
        // `EXPLAIN (ANALYZE) ...` does not set `analyze`, hence the word check.
        Statement::Explain { analyze, .. } => {
            if *analyze || lexed.mentions("ANALYZE") {
                QueryVerdict::Write
            } else {
                QueryVerdict::ReadOnly
            }
        }

        Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowDatabases { .. }
        | Statement::ShowSchemas { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowVariable { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => QueryVerdict::ReadOnly,

        Statement::Query(_) => {
            let mut finder = WriteFinder;
            match stmt.visit(&mut finder) {
                ControlFlow::Break(()) => QueryVerdict::Write,
                ControlFlow::Continue(()) => QueryVerdict::ReadOnly,
            }
        }

        // INSERT, UPDATE, DELETE, MERGE, CREATE, DROP, ALTER, TRUNCATE, GRANT,
        // REVOKE, ANALYZE, CALL, SET, USE and everything else.
        _ => QueryVerdict::Write,
    }
}

/// Walks a query looking for embedded writes.
///
/// Inside a query, nested statements only appear as data-modifying CTE bodies
/// (`WITH x AS (DELETE ... RETURNING *)`), so any nested statement that is not
/// itself a query is a write. `SELECT ... INTO` creates a table.
struct WriteFinder;

impl Visitor for WriteFinder {
    type Break = ();

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        if matches!(statement, Statement::Query(_)) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if selects_into(&query.body) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

fn selects_into(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_some(),
        SetExpr::SetOperation { left, right, .. } => selects_into(left) || selects_into(right),
        _ => false,
    }
}
