//! Data models for the Trino MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;

// Re-export commonly used types
pub use query::{
    ColumnMetadata, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryOutcome, ResultSet, StatementStatus,
    effective_limit,
};
