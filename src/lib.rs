//! Trino MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to browse and query a Trino cluster. Queries go through a read-only
//! classifier or a global write switch, and every executed statement carries
//! a traceability watermark.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod sql;
pub mod tools;
pub mod transport;

pub use config::{Config, ServerSettings};
pub use error::{ServerError, ServerResult};
pub use mcp::TrinoService;
