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


//! Administrative helpers for managing streams.

use crate::client::KsqlClient;
use crate::error::{Error, Result};
use serde_json::Value;
use tracing::{debug, info};

/// Error code the server uses for an unknown stream or table.
pub const OBJECT_NOT_FOUND: i64 = 40001;

/// Ids of the persistent queries reading from and writing to a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependentQueries {
    pub read: Vec<String>,
    pub write: Vec<String>,
}

impl DependentQueries {
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.read.iter().chain(self.write.iter()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }
}

impl KsqlClient {
    /// Names of all streams, optionally only those starting with `prefix`
    /// (compared upper-cased, as the server stores names).
    pub async fn list_streams(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let result = self.ksql("SHOW STREAMS;", None).await?;
        let streams = result
            .get(0)
            .and_then(|first| first.get("streams"))
            .and_then(Value::as_array)
            .ok_or_else(|| Error::decode("SHOW STREAMS result has no streams"))?;

        let prefix = prefix.map(str::to_uppercase);
        Ok(streams
            .iter()
            .filter(|s| s.get("type").and_then(Value::as_str) == Some("STREAM"))
            .filter_map(|s| s.get("name").and_then(Value::as_str))
            .filter(|name| prefix.as_deref().map_or(true, |p| name.starts_with(p)))
            .map(str::to_string)
            .collect())
    }

    /// `sourceDescription` from `DESCRIBE EXTENDED`, `None` if the stream
    /// does not exist.
    pub async fn describe_stream(&self, name: &str) -> Result<Option<Value>> {
        let result = match self.ksql(&format!("DESCRIBE EXTENDED {}", name), None).await {
            Ok(result) => result,
            Err(e) if e.error_code() == Some(OBJECT_NOT_FOUND) => {
                debug!("Stream {} does not exist", name);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        result
            .get(0)
            .and_then(|first| first.get("sourceDescription"))
            .cloned()
            .map(Some)
            .ok_or_else(|| Error::decode("DESCRIBE result has no sourceDescription"))
    }

    pub async fn dependent_queries(&self, name: &str) -> Result<DependentQueries> {
        let Some(description) = self.describe_stream(name).await? else {
            return Ok(DependentQueries::default());
        };
        Ok(DependentQueries {
            read: query_ids(&description, "readQueries"),
            write: query_ids(&description, "writeQueries"),
        })
    }

    /// Terminate every query depending on the stream, then drop it.
    pub async fn drop_stream(&self, name: &str) -> Result<()> {
        let queries = self.dependent_queries(name).await?;
        for query_id in queries.all() {
            info!("Terminating query {} before dropping {}", query_id, name);
            self.ksql(&format!("TERMINATE {};", query_id), None).await?;
        }
        self.ksql(&format!("DROP STREAM IF EXISTS {};", name), None)
            .await?;
        Ok(())
    }

    /// Drop every stream returned by [`list_streams`](Self::list_streams).
    /// Stops at the first failure.
    pub async fn drop_all_streams(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let streams = self.list_streams(prefix).await?;
        for stream in &streams {
            self.drop_stream(stream).await?;
        }
        Ok(streams)
    }
}

fn query_ids(description: &Value, field: &str) -> Vec<String> {
    description
        .get(field)
        .and_then(Value::as_array)
        .map(|queries| {
            queries
                .iter()
                .filter_map(|q| q.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
