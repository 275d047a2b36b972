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


//! Streaming query result decoder.
//!
//! `QueryStream` is a pull-based cursor over the chunked body of a `/query`
//! response. It frames the body into lines, parses the schema header once,
//! and decodes every following line into a [`Row`].
//!
//! ## States
//!
//! ```text
//! STREAMING ──empty line──▶ IDLE_WAIT ──data──▶ STREAMING
//!     │                         │
//!     │                   idle timeout
//!     │                         ▼
//!     └──end of body──▶ CLOSED ◀── TIMED_OUT
//! ```
//!
//! Blank lines and chunks that carry no data are keep-alives. With an idle
//! timeout set, the idle clock runs from the last data line (or from the
//! first keep-alive if no data has arrived yet), so a server that goes
//! silent ends the stream the same way.
//!
//! The body is dropped as soon as the stream reaches `TIMED_OUT` or
//! `CLOSED`, or fails, which releases the underlying connection. Dropping
//! the `QueryStream` early does the same.

use crate::error::{Error, Result};
use crate::reader::schema::{decode_row, parse_schema, strip_framing, Column, Row, RowFrame};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest body line accepted before the stream fails.
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

/// Chunked response body as delivered by the transport.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Item produced by a query stream.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryItem {
    /// An undecoded body line, passed through as received.
    Raw(String),
    /// A decoded row.
    Row(Row),
}

impl QueryItem {
    pub fn into_row(self) -> Option<Row> {
        match self {
            QueryItem::Row(row) => Some(row),
            QueryItem::Raw(_) => None,
        }
    }

    pub fn into_raw(self) -> Option<String> {
        match self {
            QueryItem::Raw(line) => Some(line),
            QueryItem::Row(_) => None,
        }
    }
}

/// Decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    IdleWait,
    TimedOut,
    Closed,
}

impl StreamState {
    pub fn is_finished(&self) -> bool {
        matches!(self, StreamState::TimedOut | StreamState::Closed)
    }
}

/// Lazy, non-restartable sequence of query results.
pub struct QueryStream {
    body: Option<ChunkStream>,
    partial_line: Vec<u8>,
    lines: VecDeque<String>,
    columns: Option<Vec<Column>>,
    return_objects: bool,
    idle_timeout: Option<Duration>,
    last_activity: Option<Instant>,
    idle_since: Option<Instant>,
    max_line_bytes: usize,
    state: StreamState,
}

impl std::fmt::Debug for QueryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStream")
            .field("state", &self.state)
            .field("return_objects", &self.return_objects)
            .field("idle_timeout", &self.idle_timeout)
            .field("columns", &self.columns)
            .field("buffered_lines", &self.lines.len())
            .finish()
    }
}

impl QueryStream {
    /// Wrap a response body.
    ///
    /// With `return_objects` the header is consumed internally and rows are
    /// yielded as [`QueryItem::Row`]; otherwise every non-empty line is
    /// yielded unmodified as [`QueryItem::Raw`].
    pub fn new(body: ChunkStream, return_objects: bool, idle_timeout: Option<Duration>) -> Self {
        Self {
            body: Some(body),
            partial_line: Vec::new(),
            lines: VecDeque::new(),
            columns: None,
            return_objects,
            idle_timeout,
            last_activity: None,
            idle_since: None,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            state: StreamState::Streaming,
        }
    }

    /// Fail with a decode error once a single line grows past `max` bytes.
    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Schema columns, once the header has been decoded.
    pub fn columns(&self) -> Option<&[Column]> {
        self.columns.as_deref()
    }

    /// Pull the next item, or `None` once the stream has ended.
    ///
    /// An idle timeout ends the stream normally. A decode or transport error
    /// ends it too; items already returned stay valid.
    pub async fn next_item(&mut self) -> Result<Option<QueryItem>> {
        loop {
            if self.state.is_finished() {
                return Ok(None);
            }

            if let Some(line) = self.lines.pop_front() {
                match self.process_line(line) {
                    Ok(Some(item)) => return Ok(Some(item)),
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Aborting query stream: {}", e);
                        self.close(StreamState::Closed);
                        return Err(e);
                    }
                }
            }

            match self.read_chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = self.push_chunk(&chunk) {
                        warn!("Aborting query stream: {}", e);
                        self.close(StreamState::Closed);
                        return Err(e);
                    }
                    // A chunk that completes no line and carries no data is a keep-alive.
                    if self.lines.is_empty()
                        && self.partial_line.iter().all(u8::is_ascii_whitespace)
                    {
                        self.on_keep_alive();
                    }
                }
                Ok(None) => self.finish_body()?,
                Err(e) => {
                    self.close(StreamState::Closed);
                    return Err(e);
                }
            }
        }
    }

    /// Convert into a `futures::Stream` of items.
    pub fn into_stream(self) -> impl Stream<Item = Result<QueryItem>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            match stream.next_item().await {
                Ok(Some(item)) => Some((Ok(item), stream)),
                Ok(None) => None,
                Err(e) => Some((Err(e), stream)),
            }
        })
    }

    /// Start of the current idle period: the last data line, or the first
    /// keep-alive when no data has arrived yet.
    fn idle_anchor(&self) -> Option<Instant> {
        self.idle_since.or(self.last_activity)
    }

    /// Read the next chunk, bounded by the remaining idle time once the
    /// idle clock has an anchor.
    async fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        let remaining = match (self.idle_timeout, self.idle_anchor()) {
            (Some(timeout), Some(since)) => Some(timeout.saturating_sub(since.elapsed())),
            _ => None,
        };

        let Some(body) = self.body.as_mut() else {
            return Ok(None);
        };

        let next = match remaining {
            Some(remaining) => match tokio::time::timeout(remaining, body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    self.time_out();
                    return Ok(None);
                }
            },
            None => body.next().await,
        };

        next.transpose()
    }

    /// Split a chunk into complete lines, keeping any trailing partial line.
    fn push_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        self.partial_line.extend_from_slice(chunk);
        while let Some(pos) = self.partial_line.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial_line.drain(..=pos).collect();
            self.lines.push_back(Self::line_to_string(&line[..line.len() - 1])?);
        }
        if self.partial_line.len() > self.max_line_bytes {
            return Err(Error::decode(format!(
                "response line exceeds {} bytes without a newline",
                self.max_line_bytes
            )));
        }
        Ok(())
    }

    /// Handle end of body: a trailing partial line is still a line.
    fn finish_body(&mut self) -> Result<()> {
        if self.state.is_finished() {
            return Ok(());
        }
        if self.partial_line.is_empty() {
            debug!("Query response body ended");
            self.close(StreamState::Closed);
            return Ok(());
        }
        let rest = std::mem::take(&mut self.partial_line);
        self.body = None;
        match Self::line_to_string(&rest) {
            Ok(line) => {
                self.lines.push_back(line);
                Ok(())
            }
            Err(e) => {
                self.close(StreamState::Closed);
                Err(e)
            }
        }
    }

    fn line_to_string(bytes: &[u8]) -> Result<String> {
        let line = std::str::from_utf8(bytes)
            .map_err(|e| Error::decode(format!("response line is not valid UTF-8: {}", e)))?;
        Ok(line.strip_suffix('\r').unwrap_or(line).to_string())
    }

    fn process_line(&mut self, line: String) -> Result<Option<QueryItem>> {
        if line.trim().is_empty() {
            self.on_keep_alive();
            return Ok(None);
        }

        self.state = StreamState::Streaming;
        self.idle_since = None;
        self.last_activity = Some(Instant::now());

        if !self.return_objects {
            return Ok(Some(QueryItem::Raw(line)));
        }

        if strip_framing(&line).is_empty() {
            return Ok(None);
        }

        if self.columns.is_none() {
            let columns = parse_schema(&line)?;
            debug!("Query schema: {} columns", columns.len());
            self.columns = Some(columns);
            return Ok(None);
        }

        let frame = decode_row(&line, self.columns.as_deref().unwrap_or_default())?;
        match frame {
            RowFrame::Row(row) => Ok(Some(QueryItem::Row(row))),
            RowFrame::End(message) => {
                debug!("Query completed: {}", message.as_deref().unwrap_or("no message"));
                self.close(StreamState::Closed);
                Ok(None)
            }
        }
    }

    fn on_keep_alive(&mut self) {
        let Some(timeout) = self.idle_timeout else {
            return;
        };

        let last_activity = self.last_activity;
        let since = *self
            .idle_since
            .get_or_insert_with(|| last_activity.unwrap_or_else(Instant::now));
        self.state = StreamState::IdleWait;

        if since.elapsed() >= timeout {
            self.time_out();
        }
    }

    fn time_out(&mut self) {
        info!(
            "Ending query because of idle timeout ({:?})",
            self.idle_timeout.unwrap_or_default()
        );
        self.close(StreamState::TimedOut);
    }

    fn close(&mut self, state: StreamState) {
        self.state = state;
        self.body = None;
        self.lines.clear();
        self.partial_line.clear();
    }
}
