//! Trino REST client.
//!
//! Submits a statement with `POST /v1/statement` and follows `nextUri` until
//! the coordinator stops returning one, collecting columns and rows on the way.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::config::{ServerSettings, TrinoConnection};
use crate::db::QueryEngine;
use crate::db::protocol::{
    HEADER_CATALOG, HEADER_SCHEMA, HEADER_SOURCE, HEADER_USER, QueryResults,
};
use crate::error::{ServerError, ServerResult};
use crate::models::{ColumnMetadata, QueryOutcome, ResultSet, StatementStatus};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Retries for transient coordinator responses (502, 503, 504).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Delay before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

pub struct TrinoClient {
    http: reqwest::Client,
    connection: TrinoConnection,
    credentials: Credentials,
    query_timeout: Duration,
    retry: RetryPolicy,
}

impl TrinoClient {
    pub fn new(
        connection: TrinoConnection,
        credentials: Credentials,
        query_timeout: Duration,
    ) -> ServerResult<Self> {
        // Validate the endpoint up front
        connection.statement_url()?;

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("trino-mcp-server/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServerError::configuration(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            connection,
            credentials,
            query_timeout,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_settings(settings: &ServerSettings) -> ServerResult<Self> {
        Self::new(
            settings.connection.clone(),
            settings.credentials.clone(),
            settings.query_timeout,
        )
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn connection(&self) -> &TrinoConnection {
        &self.connection
    }

    /// Session headers and credentials.
    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request
            .header(HEADER_USER, &self.connection.user)
            .header(HEADER_SOURCE, &self.connection.source);
        if let Some(catalog) = &self.connection.catalog {
            request = request.header(HEADER_CATALOG, catalog);
        }
        if let Some(schema) = &self.connection.schema {
            request = request.header(HEADER_SCHEMA, schema);
        }
        self.credentials.apply(request)
    }

    async fn send_with_retry<F>(&self, build: F) -> ServerResult<QueryResults>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = build().send().await?;
            let status = response.status();

            if is_transient(status) && attempt < self.retry.max_attempts {
                let delay = self.retry.backoff * attempt;
                warn!(
                    status = status.as_u16(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Trino coordinator unavailable, retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(status_error(status, &body));
            }

            return Ok(response.json::<QueryResults>().await?);
        }
    }

    async fn submit(&self, sql: &str) -> ServerResult<QueryResults> {
        let statement_url = self.connection.statement_url()?;
        let page = self
            .send_with_retry(|| {
                self.prepare(self.http.post(statement_url.clone()))
                    .body(sql.to_string())
            })
            .await?;
        debug!(query_id = %page.id, "Statement submitted");
        Ok(page)
    }

    /// Follow `nextUri` from the first page until the statement finishes or
    /// `max_rows` rows have arrived. `next_uri` tracks the page still to be
    /// fetched so the caller can cancel on timeout.
    async fn collect(
        &self,
        mut page: QueryResults,
        max_rows: Option<usize>,
        next_uri: &mut Option<String>,
    ) -> ServerResult<QueryOutcome> {
        let mut columns: Option<Vec<ColumnMetadata>> = None;
        let mut rows = Vec::new();
        let mut status = StatementStatus::default();

        loop {
            if let Some(error) = page.error.take() {
                *next_uri = None;
                return Err(error.into());
            }
            if columns.is_none() {
                columns = page
                    .columns
                    .take()
                    .map(|cols| cols.into_iter().map(Into::into).collect());
            }
            if let Some(data) = page.data.take() {
                rows.extend(data);
            }
            if page.update_type.is_some() {
                status.update_type = page.update_type.take();
            }
            if page.update_count.is_some() {
                status.update_count = page.update_count;
            }

            let Some(uri) = page.next_uri.take() else {
                *next_uri = None;
                break;
            };
            *next_uri = Some(uri.clone());

            if columns.is_some() && max_rows.is_some_and(|max| rows.len() >= max) {
                debug!(rows = rows.len(), "Row limit reached, cancelling remaining pages");
                self.cancel(&uri).await;
                *next_uri = None;
                break;
            }

            page = match self
                .send_with_retry(|| self.prepare(self.http.get(&uri)))
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    self.cancel(&uri).await;
                    *next_uri = None;
                    return Err(e);
                }
            };
        }

        if let Some(max) = max_rows {
            rows.truncate(max);
        }
        Ok(match columns {
            Some(columns) if !columns.is_empty() => {
                QueryOutcome::Rows(ResultSet::new(columns, rows))
            }
            _ => QueryOutcome::Status(status),
        })
    }

    /// Run a statement under the query deadline.
    async fn run(&self, sql: &str, max_rows: Option<usize>) -> ServerResult<QueryOutcome> {
        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.query_timeout;

        let submit = self.submit(sql);
        tokio::pin!(submit);
        let first = match tokio::time::timeout_at(deadline, &mut submit).await {
            Ok(page) => page?,
            Err(_) => {
                // No query id yet: give the submission a moment to answer so
                // the query does not keep running on the cluster.
                warn!(
                    timeout_secs = self.query_timeout.as_secs(),
                    "Query timed out before submission completed"
                );
                if let Ok(Ok(page)) = tokio::time::timeout(CANCEL_TIMEOUT, &mut submit).await {
                    if let Some(uri) = page.next_uri {
                        self.cancel(&uri).await;
                    }
                }
                return Err(self.timed_out());
            }
        };

        let mut next_uri = None;
        let result =
            tokio::time::timeout_at(deadline, self.collect(first, max_rows, &mut next_uri)).await;

        match result {
            Ok(outcome) => {
                debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Statement finished");
                outcome
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.query_timeout.as_secs(),
                    "Query timed out, cancelling"
                );
                if let Some(uri) = next_uri {
                    self.cancel(&uri).await;
                }
                Err(self.timed_out())
            }
        }
    }

    fn timed_out(&self) -> ServerError {
        ServerError::timeout("Trino query", self.query_timeout.as_secs())
    }

    /// Best-effort cancellation of a running query.
    async fn cancel(&self, uri: &str) {
        let request = self.prepare(self.http.delete(uri)).timeout(CANCEL_TIMEOUT);
        match request.send().await {
            Ok(resp) => debug!(status = resp.status().as_u16(), "Cancelled Trino query"),
            Err(e) => debug!(error = %e, "Failed to cancel Trino query"),
        }
    }
}

#[async_trait]
impl QueryEngine for TrinoClient {
    async fn execute(&self, sql: &str) -> ServerResult<QueryOutcome> {
        self.run(sql, None).await
    }

    async fn execute_limited(&self, sql: &str, max_rows: usize) -> ServerResult<QueryOutcome> {
        self.run(sql, Some(max_rows)).await
    }
}

fn status_error(status: StatusCode, body: &str) -> ServerError {
    let body = body.trim();
    let detail: String = body.chars().take(200).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServerError::connection(
            format!("Trino rejected the credentials (HTTP {})", status.as_u16()),
            "Check AUTH_METHOD, TRINO_USER and TRINO_PASSWORD or TRINO_ACCESS_TOKEN",
        ),
        _ if detail.is_empty() => ServerError::connection(
            format!("Trino returned HTTP {}", status.as_u16()),
            "Check coordinator health and TRINO_HOST/TRINO_PORT",
        ),
        _ => ServerError::connection(
            format!("Trino returned HTTP {}: {}", status.as_u16(), detail),
            "Check coordinator health and TRINO_HOST/TRINO_PORT",
        ),
    }
}
