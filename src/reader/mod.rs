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


//! Readers for streaming query results.
//!
//! This module provides:
//! - `schema`: header and row fragment parsing
//! - `stream`: `QueryStream`, the async pull-based decoder over a chunked body
//! - `QueryReader`: blocking iterator adapter over a `QueryStream`

pub mod schema;
pub mod stream;

use crate::error::Result;
use tokio::runtime::Handle as RuntimeHandle;

pub use schema::{decode_row, parse_schema, Column, ColumnType, Row, RowFrame};
pub use stream::{ChunkStream, QueryItem, QueryStream, StreamState};

/// Blocking iterator over a [`QueryStream`].
///
/// Each call to `next` blocks the current thread on the runtime until the
/// next item arrives. Must not be used from inside an async context.
#[derive(Debug)]
pub struct QueryReader {
    stream: QueryStream,
    runtime_handle: RuntimeHandle,
}

impl QueryReader {
    pub fn new(stream: QueryStream, runtime_handle: RuntimeHandle) -> Self {
        Self {
            stream,
            runtime_handle,
        }
    }

    /// Underlying stream, e.g. to inspect its state or columns.
    pub fn stream(&self) -> &QueryStream {
        &self.stream
    }
}

impl Iterator for QueryReader {
    type Item = Result<QueryItem>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime_handle
            .block_on(self.stream.next_item())
            .transpose()
    }
}
