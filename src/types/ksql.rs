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


//! KSQL REST API request/response types.
//!
//! These types map directly to the JSON structures used by the `/ksql`,
//! `/query` and `/info` endpoints.

use crate::error::StatementError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Streams properties sent alongside a statement (`streamsProperties`).
pub type StreamsProperties = HashMap<String, Value>;

/// Request body for both `/ksql` and `/query`.
#[derive(Debug, Clone, Serialize)]
pub struct KsqlRequest {
    pub ksql: String,
    #[serde(rename = "streamsProperties", skip_serializing_if = "Option::is_none")]
    pub streams_properties: Option<StreamsProperties>,
}

impl KsqlRequest {
    pub fn new(ksql: impl Into<String>, streams_properties: Option<&StreamsProperties>) -> Self {
        Self {
            ksql: ksql.into(),
            streams_properties: streams_properties.filter(|p| !p.is_empty()).cloned(),
        }
    }
}

/// Error body returned by the server, either with a non-2xx status or as an
/// element of a statement result array.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(rename = "@type", default)]
    pub error_type: Option<String>,
    pub message: String,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(rename = "stackTrace", default)]
    pub stack_trace: Vec<String>,
    #[serde(rename = "statementText", default)]
    pub statement_text: Option<String>,
}

impl From<ErrorEnvelope> for StatementError {
    fn from(envelope: ErrorEnvelope) -> Self {
        StatementError {
            message: envelope.message,
            error_code: envelope.error_code,
            stack_trace: envelope.stack_trace,
            statement_text: envelope.statement_text,
        }
    }
}

/// `commandStatus` object of a `currentStatus` result.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl CommandStatus {
    pub const SUCCESS: &'static str = "SUCCESS";

    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case(Self::SUCCESS)
    }
}

/// Response from `GET /info`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfoResponse {
    #[serde(rename = "KsqlServerInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    #[serde(rename = "kafkaClusterId", default)]
    pub kafka_cluster_id: Option<String>,
    #[serde(rename = "ksqlServiceId", default)]
    pub ksql_service_id: Option<String>,
}

/// One server configuration property from `SHOW PROPERTIES`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerProperty {
    pub name: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl ServerProperty {
    /// Parse the `properties` field of a `SHOW PROPERTIES` result.
    ///
    /// Newer servers return a list of `{name, scope, value}` objects, older
    /// ones a flat `{name: value}` map; both are accepted.
    pub fn parse_list(properties: &Value) -> Option<Vec<ServerProperty>> {
        match properties {
            Value::Array(_) => serde_json::from_value(properties.clone()).ok(),
            Value::Object(map) => Some(
                map.iter()
                    .map(|(name, value)| ServerProperty {
                        name: name.clone(),
                        scope: None,
                        value: value.clone(),
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = KsqlRequest::new("show streams;", None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"ksql": "show streams;"})
        );

        let mut props = StreamsProperties::new();
        props.insert("ksql.streams.auto.offset.reset".to_string(), json!("earliest"));
        let request = KsqlRequest::new("select * from s;", Some(&props));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "ksql": "select * from s;",
                "streamsProperties": {"ksql.streams.auto.offset.reset": "earliest"}
            })
        );

        let empty = StreamsProperties::new();
        let request = KsqlRequest::new("show tables;", Some(&empty));
        assert!(request.streams_properties.is_none());
    }

    #[test]
    fn test_error_envelope_to_statement_error() {
        let envelope: ErrorEnvelope = serde_json::from_value(json!({
            "@type": "statement_error",
            "error_code": 40001,
            "message": "Could not find STREAM/TABLE 'FOO' in the Metastore",
            "stackTrace": ["a", "b"],
            "statementText": "DESCRIBE EXTENDED foo;",
            "entities": []
        }))
        .unwrap();
        let err = StatementError::from(envelope);
        assert_eq!(err.error_code, Some(40001));
        assert_eq!(err.stack_trace, vec!["a", "b"]);
        assert_eq!(err.statement_text.as_deref(), Some("DESCRIBE EXTENDED foo;"));
    }

    #[test]
    fn test_server_info_response() {
        let info: ServerInfoResponse = serde_json::from_value(json!({
            "KsqlServerInfo": {"version": "0.2", "kafkaClusterId": "abc"}
        }))
        .unwrap();
        assert_eq!(info.server_info.version, "0.2");
        assert_eq!(info.server_info.kafka_cluster_id.as_deref(), Some("abc"));
        assert!(info.server_info.ksql_service_id.is_none());
    }

    #[test]
    fn test_server_property_list_shapes() {
        let list = ServerProperty::parse_list(&json!([
            {"name": "ksql.service.id", "scope": "KSQL", "value": "default_"}
        ]))
        .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].scope.as_deref(), Some("KSQL"));

        let map = ServerProperty::parse_list(&json!({"ksql.service.id": "default_"})).unwrap();
        assert_eq!(map[0].name, "ksql.service.id");
        assert_eq!(map[0].value, json!("default_"));

        assert!(ServerProperty::parse_list(&json!("nope")).is_none());
    }
}
