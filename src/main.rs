//! Trino MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to browse and query a Trino cluster.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use trino_mcp_server::config::{Config, TransportMode};
use trino_mcp_server::db::TrinoClient;
use trino_mcp_server::transport::{HttpTransport, StdioTransport, Transport};

/// Initialize the tracing subscriber for logging.
///
/// Logs always go to stderr: stdout carries the stdio transport's JSON-RPC stream.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    let settings = match config.resolve() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    info!(
        transport = %config.transport,
        host = %settings.connection.host,
        port = settings.connection.port,
        scheme = %settings.connection.scheme,
        user = %settings.connection.user,
        auth_method = %config.auth_method,
        "Starting Trino MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );
    if settings.write_policy.allows_writes() {
        warn!("Write queries are enabled (ALLOW_WRITE_QUERIES)");
    }

    let engine = Arc::new(TrinoClient::from_settings(&settings)?);

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            let transport = StdioTransport::new(engine, settings);
            transport.run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                engine,
                settings,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
