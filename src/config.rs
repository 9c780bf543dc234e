//! Configuration handling for the Trino MCP Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.
//! [`Config`] is what the user types; [`ServerSettings`] is the validated, immutable view
//! built from it once at startup and shared by every tool call.

use std::collections::BTreeMap;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use serde_json::Value as JsonValue;
use url::Url;

use crate::auth::{AuthMethod, Credentials, user_from_jwt};
use crate::error::{ServerError, ServerResult};
use crate::sql::WatermarkFields;
use crate::tools::policy::WritePolicy;

pub const DEFAULT_TRINO_HOST: &str = "localhost";
pub const DEFAULT_TRINO_PORT: u16 = 8080;
pub const DEFAULT_TRINO_USER: &str = "trino";
pub const DEFAULT_HTTP_SCHEME: &str = "http";
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 300;

/// Value sent as `X-Trino-Source`.
pub const TRINO_SOURCE: &str = "trino-mcp-server";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Parse a boolean switch: `true`, `1` and `yes` enable (case-insensitive), anything else disables.
pub fn parse_flag(s: &str) -> Result<bool, String> {
    Ok(matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    ))
}

/// Configuration for the Trino MCP Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "trino-mcp-server",
    about = "MCP server for Trino - lets AI assistants browse catalogs and run guarded SQL queries",
    version,
    author
)]
pub struct Config {
    /// Trino coordinator host
    #[arg(long, default_value = DEFAULT_TRINO_HOST, env = "TRINO_HOST")]
    pub host: String,

    /// Trino coordinator port (forced to 443 for OAUTH2 and AZURE_SPN)
    #[arg(long, default_value_t = DEFAULT_TRINO_PORT, env = "TRINO_PORT")]
    pub port: u16,

    /// Trino user
    #[arg(long, default_value = DEFAULT_TRINO_USER, env = "TRINO_USER")]
    pub user: String,

    /// Password for AUTH_METHOD=PASSWORD
    #[arg(long, env = "TRINO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Default catalog for metadata tools and unqualified queries
    #[arg(long, env = "TRINO_CATALOG")]
    pub catalog: Option<String>,

    /// Default schema for metadata tools and unqualified queries
    #[arg(long, env = "TRINO_SCHEMA")]
    pub schema: Option<String>,

    /// Scheme used to reach the coordinator (http or https)
    #[arg(long, default_value = DEFAULT_HTTP_SCHEME, env = "TRINO_HTTP_SCHEME")]
    pub http_scheme: String,

    /// Authentication method
    #[arg(
        long,
        value_enum,
        ignore_case = true,
        default_value = "password",
        env = "AUTH_METHOD"
    )]
    pub auth_method: AuthMethod,

    /// Pre-acquired bearer token for OAUTH2 and AZURE_SPN
    #[arg(long, env = "TRINO_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Allow the execute_query tool to run (true/1/yes)
    #[arg(
        long,
        env = "ALLOW_WRITE_QUERIES",
        value_parser = parse_flag,
        default_value = "false",
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub allow_write_queries: bool,

    /// Extra watermark fields as a JSON object mapping key to the name of an
    /// environment variable holding the value, e.g. {"team":"TEAM_NAME"}
    #[arg(long, env = "TRINO_MCP_CUSTOM_WATERMARK")]
    pub custom_watermark: Option<String>,

    /// Query timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "MCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

/// Where and as whom to reach the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrinoConnection {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Effective user, sent as `X-Trino-User`
    pub user: String,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub source: String,
}

impl TrinoConnection {
    /// Coordinator base URL, e.g. `https://trino.example.com:443/`.
    pub fn base_url(&self) -> ServerResult<Url> {
        Url::parse(&format!("{}://{}:{}/", self.scheme, self.host, self.port)).map_err(|e| {
            ServerError::configuration(format!(
                "Invalid Trino endpoint {}://{}:{}: {}",
                self.scheme, self.host, self.port, e
            ))
        })
    }

    /// `POST` target for new statements.
    pub fn statement_url(&self) -> ServerResult<Url> {
        self.base_url()?
            .join("v1/statement")
            .map_err(|e| ServerError::configuration(format!("Invalid statement URL: {}", e)))
    }
}

/// Immutable settings shared by all tool handlers.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub connection: TrinoConnection,
    pub credentials: Credentials,
    pub write_policy: WritePolicy,
    pub watermark: WatermarkFields,
    pub query_timeout: Duration,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            host: DEFAULT_TRINO_HOST.to_string(),
            port: DEFAULT_TRINO_PORT,
            user: DEFAULT_TRINO_USER.to_string(),
            password: None,
            catalog: None,
            schema: None,
            http_scheme: DEFAULT_HTTP_SCHEME.to_string(),
            auth_method: AuthMethod::None,
            access_token: None,
            allow_write_queries: false,
            custom_watermark: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Resolve settings against the process environment.
    pub fn resolve(&self) -> ServerResult<ServerSettings> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve settings, looking up custom watermark sources through `env`.
    pub fn resolve_with<F>(&self, env: F) -> ServerResult<ServerSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.query_timeout == 0 {
            return Err(ServerError::configuration(
                "MCP_QUERY_TIMEOUT must be greater than 0",
            ));
        }

        let (scheme, port) = if self.auth_method.forces_https() {
            ("https".to_string(), 443)
        } else {
            let scheme = self.http_scheme.trim().to_ascii_lowercase();
            if scheme != "http" && scheme != "https" {
                return Err(ServerError::configuration(format!(
                    "TRINO_HTTP_SCHEME must be http or https, got '{}'",
                    self.http_scheme
                )));
            }
            (scheme, self.port)
        };

        let credentials = Credentials::resolve(
            self.auth_method,
            &self.user,
            self.password.as_deref(),
            self.access_token.as_deref(),
        )?;

        let user = match (&self.auth_method, &credentials) {
            (AuthMethod::AzureSpn, Credentials::Bearer { token, .. }) => {
                user_from_jwt(token).unwrap_or_else(|| self.user.clone())
            }
            _ => self.user.clone(),
        };

        let connection = TrinoConnection {
            scheme,
            host: self.host.clone(),
            port,
            user,
            catalog: non_empty(self.catalog.as_deref()),
            schema: non_empty(self.schema.as_deref()),
            source: TRINO_SOURCE.to_string(),
        };
        // Fail at startup rather than on the first query.
        connection.base_url()?;

        let watermark = build_watermark(&connection.user, self.custom_watermark.as_deref(), env)?;

        Ok(ServerSettings {
            connection,
            credentials,
            write_policy: WritePolicy::new(self.allow_write_queries),
            watermark,
            query_timeout: self.query_timeout_duration(),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

/// Built-in fields first, then custom fields sorted by key.
fn build_watermark<F>(user: &str, custom: Option<&str>, env: F) -> ServerResult<WatermarkFields>
where
    F: Fn(&str) -> Option<String>,
{
    let mut fields = WatermarkFields::new()
        .with("trino_mcp_version", env!("CARGO_PKG_VERSION"))
        .with("user", user);

    let Some(raw) = custom.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(fields);
    };

    let parsed: JsonValue = serde_json::from_str(raw).map_err(|e| {
        ServerError::configuration(format!("TRINO_MCP_CUSTOM_WATERMARK is not valid JSON: {}", e))
    })?;
    let JsonValue::Object(map) = parsed else {
        return Err(ServerError::configuration(
            "TRINO_MCP_CUSTOM_WATERMARK must be a JSON object mapping keys to environment variable names",
        ));
    };

    let mut sources = BTreeMap::new();
    for (key, value) in map {
        let JsonValue::String(var) = value else {
            return Err(ServerError::configuration(format!(
                "TRINO_MCP_CUSTOM_WATERMARK value for '{}' must be an environment variable name",
                key
            )));
        };
        sources.insert(key, var);
    }

    for (key, var) in sources {
        fields.insert(key, env(&var).unwrap_or_default());
    }
    Ok(fields)
}
