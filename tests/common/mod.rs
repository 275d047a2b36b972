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


//! Shared mock transport for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use ksql_client::client::{HttpResponse, StreamingResponse, Transport};
use ksql_client::error::{Error, Result};
use ksql_client::reader::ChunkStream;
use ksql_client::types::KsqlRequest;
use ksql_client::{ClientConfig, KsqlClient};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One piece of a scripted streaming body.
#[derive(Debug, Clone)]
pub enum Chunk {
    Data(&'static str),
    Pause(Duration),
}

/// Transport that replays scripted responses and records every request.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    streams: Mutex<VecDeque<(u16, Vec<Chunk>)>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_response(&self, status: u16, body: &str) {
        self.push_result(Ok(HttpResponse::new(status, body)));
    }

    pub fn push_result(&self, result: Result<HttpResponse>) {
        self.responses.lock().unwrap().push_back(result);
    }

    pub fn push_stream(&self, status: u16, chunks: Vec<Chunk>) {
        self.streams.lock().unwrap().push_back((status, chunks));
    }

    /// `(path, statement)` pairs in request order.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.requests().into_iter().map(|(_, ksql)| ksql).collect()
    }

    fn record(&self, path: &str, ksql: &str) {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), ksql.to_string()));
    }

    fn next_response(&self) -> Result<HttpResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted response left")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str) -> Result<HttpResponse> {
        self.record(path, "");
        self.next_response()
    }

    async fn post(&self, path: &str, request: &KsqlRequest) -> Result<HttpResponse> {
        self.record(path, &request.ksql);
        self.next_response()
    }

    async fn post_streaming(
        &self,
        path: &str,
        request: &KsqlRequest,
    ) -> Result<StreamingResponse> {
        self.record(path, &request.ksql);
        let (status, chunks) = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted stream left");
        Ok(StreamingResponse {
            status,
            body: scripted_body(chunks),
        })
    }
}

/// Body that yields data chunks and sleeps on pauses.
pub fn scripted_body(chunks: Vec<Chunk>) -> ChunkStream {
    futures::stream::iter(chunks)
        .filter_map(|chunk| async move {
            match chunk {
                Chunk::Data(data) => Some(Ok::<_, Error>(Bytes::from_static(data.as_bytes()))),
                Chunk::Pause(duration) => {
                    tokio::time::sleep(duration).await;
                    None
                }
            }
        })
        .boxed()
}

pub fn client(transport: &Arc<MockTransport>) -> KsqlClient {
    let config = ClientConfig::new("http://localhost:8088").with_retry_delay(Duration::ZERO);
    KsqlClient::with_transport(&config, transport.clone())
}

pub const SUCCESS: &str = r#"[{"@type":"currentStatus","statementText":"x;","commandStatus":{"status":"SUCCESS","message":"done"}}]"#;
