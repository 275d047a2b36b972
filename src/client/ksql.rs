// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! `KsqlClient`: the public entry point.
//!
//! Statements go to `/ksql` and come back as one JSON document; queries go to
//! `/query` and come back as a live chunked body decoded by [`QueryStream`].

use crate::builder::{
    terminate, CreateAsOptions, CreateAsStatement, CreateStatement, Statement, StatementParams,
    TableKind,
};
use crate::client::{
    HttpResponse, KsqlHttpClient, Transport, INFO_ENDPOINT, KSQL_ENDPOINT, QUERY_ENDPOINT,
};
use crate::config::{BuildInfo, ClientConfig};
use crate::error::{Error, Result, StatementError, TransportError, TransportErrorKind};
use crate::logging::init_logging;
use crate::reader::{ChunkStream, QueryStream};
use crate::retry::RetryPolicy;
use crate::types::ksql::{
    CommandStatus, ErrorEnvelope, KsqlRequest, ServerInfoResponse, ServerProperty,
    StreamsProperties,
};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const STATEMENT_ERROR_TYPES: [&str; 2] = ["statement_error", "generic_error"];

/// Options for [`KsqlClient::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub streams_properties: Option<StreamsProperties>,
    /// End the stream once only keep-alives have arrived for this long.
    pub idle_timeout: Option<Duration>,
    /// Yield decoded rows instead of raw lines.
    pub return_objects: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_streams_properties(mut self, properties: StreamsProperties) -> Self {
        self.streams_properties = Some(properties);
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn with_return_objects(mut self, return_objects: bool) -> Self {
        self.return_objects = return_objects;
        self
    }
}

/// Client for a KSQL server.
///
/// Holds no mutable state: concurrent calls are fine as long as the
/// transport supports concurrent requests, which `KsqlHttpClient` does.
#[derive(Debug, Clone)]
pub struct KsqlClient {
    transport: Arc<dyn Transport>,
    url: String,
    timeout: Duration,
    build_info: BuildInfo,
    retry_policy: RetryPolicy,
}

impl KsqlClient {
    /// Build an HTTP-backed client, initializing logging and optionally
    /// checking that the server answers on `/info`.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        init_logging(&config.log);

        let transport =
            KsqlHttpClient::new(&config.url, config.http_config(), config.auth_provider())?;
        let client = Self::with_transport(&config, Arc::new(transport));

        if config.check_version {
            let version = client.server_version().await?;
            info!(
                "Connected to KSQL server {} at {} (client {})",
                version,
                client.url,
                client.build_info.version()
            );
        }

        Ok(client)
    }

    /// Build a client over an existing transport. Performs no I/O.
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            url: config.url.clone(),
            timeout: config.timeout,
            build_info: BuildInfo::current(),
            retry_policy: config.retry_policy(),
        }
    }

    pub fn with_build_info(mut self, build_info: BuildInfo) -> Self {
        self.build_info = build_info;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn build_info(&self) -> &BuildInfo {
        &self.build_info
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Execute a statement on `/ksql` and return the parsed result array.
    pub async fn ksql(
        &self,
        statement: &str,
        streams_properties: Option<&StreamsProperties>,
    ) -> Result<Value> {
        let statement = terminate(statement)?;
        debug!("Executing statement: {}", statement);

        let request = KsqlRequest::new(statement, streams_properties);
        let response = self.transport.post(KSQL_ENDPOINT, &request).await?;
        parse_statement_response(response)
    }

    /// Start a query on `/query`.
    ///
    /// The returned stream holds the connection open until it ends, times
    /// out, or is dropped.
    pub async fn query(&self, query: &str, options: QueryOptions) -> Result<QueryStream> {
        let statement = terminate(query)?;
        debug!("Starting query: {}", statement);

        let request = KsqlRequest::new(statement, options.streams_properties.as_ref());
        let response = self
            .transport
            .post_streaming(QUERY_ENDPOINT, &request)
            .await?;

        if !response.is_success() {
            let body = drain_body(response.body).await?;
            return Err(error_from_body(response.status, &body));
        }

        Ok(QueryStream::new(
            response.body,
            options.return_objects,
            options.idle_timeout,
        ))
    }

    /// `CREATE STREAM name (columns) WITH (kafka_topic, value_format)`.
    pub async fn create_stream<I, S>(
        &self,
        name: &str,
        columns: I,
        topic: &str,
        value_format: Option<&str>,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut create = CreateStatement::new(TableKind::Stream.as_sql(), name, columns, topic);
        if let Some(format) = value_format {
            create = create.with_value_format(format);
        }
        self.execute_built(&Statement::Create(create)).await
    }

    /// `CREATE TABLE`; fails with [`Error::MissingKey`] when `key` is empty.
    pub async fn create_table<I, S>(
        &self,
        name: &str,
        columns: I,
        topic: &str,
        value_format: Option<&str>,
        key: &str,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut create = CreateStatement::new(TableKind::Table.as_sql(), name, columns, topic)
            .with_key(key);
        if let Some(format) = value_format {
            create = create.with_value_format(format);
        }
        self.execute_built(&Statement::Create(create)).await
    }

    /// `CREATE STREAM name WITH (...) AS SELECT ... FROM source`, retried
    /// according to the client's retry policy.
    pub async fn create_stream_as(
        &self,
        name: &str,
        source: &str,
        options: CreateAsOptions,
    ) -> Result<bool> {
        self.create_as(TableKind::Stream, name, source, options)
            .await
    }

    /// Table counterpart of [`create_stream_as`](Self::create_stream_as).
    pub async fn create_table_as(
        &self,
        name: &str,
        source: &str,
        options: CreateAsOptions,
    ) -> Result<bool> {
        self.create_as(TableKind::Table, name, source, options).await
    }

    /// Build and run a statement chosen by kind name (`create` or
    /// `create_as`). `create_as` goes through the retry policy like
    /// [`create_stream_as`](Self::create_stream_as).
    pub async fn create(&self, kind: &str, params: StatementParams) -> Result<bool> {
        match Statement::from_kind(kind, params)? {
            statement @ Statement::Create(_) => self.execute_built(&statement).await,
            statement @ Statement::CreateAs(_) => self.execute_retried(&statement).await,
        }
    }

    /// Version reported by `GET /info`.
    pub async fn server_version(&self) -> Result<String> {
        let response = self.transport.get(INFO_ENDPOINT).await?;
        if !response.is_success() {
            return Err(error_from_body(response.status, &response.body));
        }
        let info: ServerInfoResponse = serde_json::from_str(&response.body)?;
        Ok(info.server_info.version)
    }

    /// Server configuration from `SHOW PROPERTIES`.
    pub async fn server_properties(&self) -> Result<Vec<ServerProperty>> {
        let result = self.ksql("SHOW PROPERTIES;", None).await?;
        first_result(&result)
            .and_then(|first| first.get("properties"))
            .and_then(ServerProperty::parse_list)
            .ok_or_else(|| Error::decode("SHOW PROPERTIES result has no properties"))
    }

    async fn create_as(
        &self,
        kind: TableKind,
        name: &str,
        source: &str,
        options: CreateAsOptions,
    ) -> Result<bool> {
        let statement = Statement::CreateAs(
            CreateAsStatement::new(kind.as_sql(), name, source).with_options(options),
        );
        self.execute_retried(&statement).await
    }

    async fn execute_retried(&self, statement: &Statement) -> Result<bool> {
        // Rendering errors are deterministic, so build once outside the loop.
        let sql = statement.build()?;
        self.retry_policy
            .run(|| async { self.ksql(&sql, None).await.map(|_| true) })
            .await
    }

    async fn execute_built(&self, statement: &Statement) -> Result<bool> {
        let sql = statement.build()?;
        self.ksql(&sql, None).await?;
        Ok(true)
    }
}

/// Turn a `/ksql` response into its JSON result, or the error it reports.
fn parse_statement_response(response: HttpResponse) -> Result<Value> {
    if !response.is_success() {
        return Err(error_from_body(response.status, &response.body));
    }
    let result: Value = serde_json::from_str(&response.body)?;
    check_statement_result(&result)?;
    Ok(result)
}

/// Error for a non-2xx body: the server's envelope when it decodes, the
/// plain status otherwise.
fn error_from_body(status: u16, body: &str) -> Error {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => StatementError::from(envelope).into(),
        Err(_) => TransportError::new(
            TransportErrorKind::Status(status),
            format!("HTTP {} - {}", status, body),
        )
        .into(),
    }
}

fn first_result(result: &Value) -> Option<&Value> {
    match result {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(result),
        _ => None,
    }
}

/// Inspect the first element of a 2xx statement result for failures.
fn check_statement_result(result: &Value) -> Result<()> {
    let Some(first) = first_result(result) else {
        return Ok(());
    };
    let statement_text = first
        .get("statementText")
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(error) = first.get("error").filter(|e| !e.is_null()) {
        let mut err = match error {
            Value::String(message) => StatementError::new(message.clone()),
            other => serde_json::from_value::<ErrorEnvelope>(other.clone())
                .map(StatementError::from)
                .unwrap_or_else(|_| StatementError::new(other.to_string())),
        };
        err.statement_text = err.statement_text.or(statement_text);
        return Err(err.into());
    }

    let error_type = first.get("@type").and_then(Value::as_str);
    if error_type.is_some_and(|t| STATEMENT_ERROR_TYPES.contains(&t)) {
        let envelope: ErrorEnvelope = serde_json::from_value(first.clone())?;
        return Err(StatementError::from(envelope).into());
    }

    let command_status = first
        .get("commandStatus")
        .or_else(|| first.get("currentStatus").and_then(|s| s.get("commandStatus")));
    if let Some(status) = command_status {
        let status: CommandStatus = serde_json::from_value(status.clone())?;
        if !status.is_success() {
            let message = status
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("statement finished with status {}", status.status));
            let mut err = StatementError::new(message);
            err.statement_text = statement_text;
            return Err(err.into());
        }
    }

    Ok(())
}

/// Read a whole streaming body, for error responses.
async fn drain_body(mut body: ChunkStream) -> Result<String> {
    let mut buffer = Vec::new();
    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
