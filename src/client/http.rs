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


//! HTTP transport for the KSQL REST API.
//!
//! This module provides a low-level HTTP client with:
//! - Connection pooling
//! - Basic authentication
//! - JSON request bodies with `Accept`/`Content-Type: application/json`
//! - Configurable timeouts, applied per read for streaming responses

use crate::auth::AuthProvider;
use crate::client::{HttpResponse, StreamingResponse, Transport};
use crate::error::{Error, Result, TransportError, TransportErrorKind};
use crate::types::ksql::KsqlRequest;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Timeout for buffered requests, and for each read of a streaming body.
    pub read_timeout: Duration,
    /// Maximum number of idle connections per host.
    pub max_connections_per_host: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(15),
            max_connections_per_host: 100,
            user_agent: format!("ksql-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client for communicating with a KSQL server.
///
/// Buffered calls (`/ksql`, `/info`) get a whole-request timeout. Streaming
/// calls (`/query`) only get the per-read timeout, since a push query may
/// legitimately stay open for hours.
#[derive(Debug)]
pub struct KsqlHttpClient {
    client: Client,
    base_url: Url,
    config: HttpClientConfig,
    auth_provider: Arc<dyn AuthProvider>,
}

impl KsqlHttpClient {
    /// Creates a new HTTP client for `base_url`.
    pub fn new(
        base_url: &str,
        config: HttpClientConfig,
        auth_provider: Arc<dyn AuthProvider>,
    ) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(config.max_connections_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                TransportError::new(
                    TransportErrorKind::Other,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            config,
            auth_provider,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path.trim_start_matches('/')).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Other,
                format!("Invalid endpoint '{}': {}", path, e),
            )
            .into()
        })
    }

    fn with_headers(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let builder = builder
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        Ok(match self.auth_provider.auth_header()? {
            Some(value) => builder.header(AUTHORIZATION, value),
            None => builder,
        })
    }

    async fn buffered(&self, builder: RequestBuilder) -> Result<HttpResponse> {
        let response = self
            .with_headers(builder)?
            .timeout(self.config.read_timeout)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Response status {} ({} bytes)", status, body.len());
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for KsqlHttpClient {
    async fn get(&self, path: &str) -> Result<HttpResponse> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        self.buffered(self.client.get(url)).await
    }

    async fn post(&self, path: &str, request: &KsqlRequest) -> Result<HttpResponse> {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);
        self.buffered(self.client.post(url).json(request)).await
    }

    async fn post_streaming(
        &self,
        path: &str,
        request: &KsqlRequest,
    ) -> Result<StreamingResponse> {
        let url = self.endpoint(path)?;
        debug!("POST {} (streaming)", url);
        let response = self
            .with_headers(self.client.post(url).json(request))?
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(Error::from))
            .boxed();
        Ok(StreamingResponse { status, body })
    }
}

/// Parse the server URL, making sure relative joins keep any path prefix.
fn parse_base_url(url: &str) -> Result<Url> {
    let normalized = if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    };
    Url::parse(&normalized).map_err(|e| {
        TransportError::new(
            TransportErrorKind::Other,
            format!("Invalid server URL '{}': {}", url, e),
        )
        .into()
    })
}
