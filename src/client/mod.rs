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


//! Client implementations for communicating with a KSQL server.
//!
//! This module provides:
//! - `Transport` trait: Abstract interface for the HTTP exchanges the client needs
//! - `KsqlHttpClient`: reqwest-backed transport
//! - `KsqlClient`: Statement, query and admin facade on top of a transport

pub mod admin;
pub mod http;
pub mod ksql;

use crate::error::Result;
use crate::reader::ChunkStream;
use crate::types::ksql::KsqlRequest;
use async_trait::async_trait;

pub use admin::DependentQueries;
pub use http::{HttpClientConfig, KsqlHttpClient};
pub use ksql::{KsqlClient, QueryOptions};

/// Path of the statement endpoint.
pub const KSQL_ENDPOINT: &str = "ksql";
/// Path of the streaming query endpoint.
pub const QUERY_ENDPOINT: &str = "query";
/// Path of the server info endpoint.
pub const INFO_ENDPOINT: &str = "info";

/// Fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Response whose body is consumed incrementally.
pub struct StreamingResponse {
    pub status: u16,
    pub body: ChunkStream,
}

impl StreamingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Abstract interface for the KSQL HTTP exchanges.
///
/// Paths are relative to the server base URL (`ksql`, `query`, `info`).
/// Implementations return non-2xx responses as values; only failures to
/// complete the exchange are errors.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Issue a GET and buffer the body.
    async fn get(&self, path: &str) -> Result<HttpResponse>;

    /// POST a statement and buffer the body.
    async fn post(&self, path: &str, request: &KsqlRequest) -> Result<HttpResponse>;

    /// POST a query and hand back the body as a chunk stream.
    async fn post_streaming(&self, path: &str, request: &KsqlRequest)
        -> Result<StreamingResponse>;
}
