//! Error types for the Trino MCP Server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each error variant provides actionable messages to help AI assistants understand
//! and recover from error conditions.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Query failed: {message}")]
    Execution {
        message: String,
        /// Trino error name, e.g. "TABLE_NOT_FOUND"
        error_name: Option<String>,
        error_code: Option<i64>,
        suggestion: String,
    },

    #[error("{message}")]
    PolicyViolation { message: String, suggestion: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ServerError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an execution error reported by the query engine.
    pub fn execution(
        message: impl Into<String>,
        error_name: Option<String>,
        error_code: Option<i64>,
    ) -> Self {
        Self::Execution {
            message: message.into(),
            error_name,
            error_code,
            suggestion: "Check the SQL syntax, referenced objects and your permissions".to_string(),
        }
    }

    /// Create a policy violation. The query was rejected before reaching the engine.
    pub fn policy_violation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::PolicyViolation {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Execution { suggestion, .. } => Some(suggestion),
            Self::PolicyViolation { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServerError::timeout("Trino HTTP request", 0)
        } else if err.is_connect() {
            ServerError::connection(
                format!("Cannot reach Trino coordinator: {}", err),
                "Check TRINO_HOST, TRINO_PORT and TRINO_HTTP_SCHEME",
            )
        } else if err.is_decode() {
            ServerError::internal(format!("Malformed response from Trino: {}", err))
        } else if err.is_status() {
            ServerError::connection(
                format!("Trino returned an error status: {}", err),
                "Check credentials and coordinator health",
            )
        } else {
            ServerError::connection(
                format!("HTTP error: {}", err),
                "Check network connectivity and coordinator status",
            )
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::io(err.to_string())
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert ServerError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<ServerError> for rmcp::ErrorData {
    fn from(err: ServerError) -> Self {
        match &err {
            ServerError::PolicyViolation { .. } | ServerError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }

            // Engine errors carry Trino's error name in the message
            ServerError::Execution {
                error_name,
                suggestion,
                ..
            } => {
                let msg = match error_name {
                    Some(name) => format!("{} ({})", err, name),
                    None => err.to_string(),
                };
                rmcp::ErrorData::invalid_params(msg, suggestion_data(Some(suggestion)))
            }

            ServerError::Timeout { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some(
                    "Consider narrowing the query or increasing MCP_QUERY_TIMEOUT",
                )),
            ),

            ServerError::Connection { .. }
            | ServerError::Configuration { .. }
            | ServerError::Io { .. }
            | ServerError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(err.suggestion()))
            }
        }
    }
}
