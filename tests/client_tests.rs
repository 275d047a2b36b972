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


//! Integration tests for statement execution through `KsqlClient`.
//!
//! These tests drive the client against a scripted transport:
//! - Success and error envelopes on `/ksql`
//! - Convenience creation methods and the create-as retry
//! - Server metadata and the stream administration helpers

mod common;

use common::{client, MockTransport, SUCCESS};
use ksql_client::error::{Error, TransportError, TransportErrorKind, ValidationError};
use ksql_client::{BuildInfo, CreateAsOptions, RetryPolicy, StatementParams};
use serde_json::json;
use std::time::Duration;

// =============================================================================
// Statement execution
// =============================================================================

#[tokio::test]
async fn test_statement_gets_terminated() {
    let transport = MockTransport::new();
    transport.push_response(200, r#"[{"@type":"tables","tables":[]}]"#);
    let client = client(&transport);

    let result = client.ksql("SHOW TABLES", None).await.unwrap();

    assert_eq!(result[0]["@type"], json!("tables"));
    assert_eq!(
        transport.requests(),
        vec![("ksql".to_string(), "SHOW TABLES;".to_string())]
    );
}

#[tokio::test]
async fn test_empty_statement_is_rejected_before_io() {
    let transport = MockTransport::new();
    let client = client(&transport);

    let err = client.ksql("   ", None).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::EmptyStatement)
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_error_status_in_success_response() {
    let transport = MockTransport::new();
    transport.push_response(
        200,
        r#"[{"@type":"currentStatus","statementText":"DROP STREAM S;","commandStatus":{"status":"ERROR","message":"Source S does not exist."}}]"#,
    );
    let client = client(&transport);

    match client.ksql("DROP STREAM S;", None).await.unwrap_err() {
        Error::Statement(e) => {
            assert_eq!(e.message, "Source S does not exist.");
            assert_eq!(e.statement_text.as_deref(), Some("DROP STREAM S;"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_envelope_on_bad_request() {
    let transport = MockTransport::new();
    transport.push_response(
        400,
        r#"{"@type":"statement_error","error_code":40001,"message":"line 1:1: mismatched input 'SELEC'","statementText":"SELEC 1;","stackTrace":["at Parser"],"entities":[]}"#,
    );
    let client = client(&transport);

    match client.ksql("SELEC 1;", None).await.unwrap_err() {
        Error::Statement(e) => {
            assert_eq!(e.error_code, Some(40001));
            assert_eq!(e.stack_trace, vec!["at Parser".to_string()]);
            assert!(e.message.contains("mismatched input"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_error_body_stays_transport_error() {
    let transport = MockTransport::new();
    transport.push_response(503, "Service Unavailable");
    let client = client(&transport);

    match client.ksql("SHOW STREAMS;", None).await.unwrap_err() {
        Error::Transport(e) => {
            assert_eq!(e.kind, TransportErrorKind::Status(503));
            assert!(e.message.contains("Service Unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let transport = MockTransport::new();
    transport.push_result(Err(TransportError::new(
        TransportErrorKind::Connect,
        "connection refused",
    )
    .into()));
    let client = client(&transport);

    let err = client.ksql("SHOW STREAMS;", None).await.unwrap_err();
    assert!(matches!(err, Error::Transport(ref e) if e.kind == TransportErrorKind::Connect));
}

// =============================================================================
// Create statements
// =============================================================================

#[tokio::test]
async fn test_create_stream() {
    let transport = MockTransport::new();
    transport.push_response(200, SUCCESS);
    let client = client(&transport);

    let created = client
        .create_stream(
            "users",
            ["registertime bigint", "userid varchar"],
            "users_topic",
            None,
        )
        .await
        .unwrap();

    assert!(created);
    assert_eq!(
        transport.statements(),
        vec![
            "CREATE STREAM users (registertime bigint, userid varchar) WITH (kafka_topic='users_topic', value_format='JSON');"
        ]
    );
}

#[tokio::test]
async fn test_create_table_requires_key() {
    let transport = MockTransport::new();
    let client = client(&transport);

    let err = client
        .create_table("users", ["userid varchar"], "users_topic", Some("json"), "")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingKey { ref table } if table == "users"));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_create_table_with_key() {
    let transport = MockTransport::new();
    transport.push_response(200, SUCCESS);
    let client = client(&transport);

    client
        .create_table("users", ["userid varchar"], "users_topic", Some("avro"), "userid")
        .await
        .unwrap();

    assert_eq!(
        transport.statements(),
        vec![
            "CREATE TABLE users (userid varchar) WITH (kafka_topic='users_topic', value_format='AVRO', key='userid');"
        ]
    );
}

#[tokio::test]
async fn test_illegal_value_format_is_not_sent() {
    let transport = MockTransport::new();
    let client = client(&transport);

    let err = client
        .create_stream("users", ["userid varchar"], "users_topic", Some("foo"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::IllegalValueFormat(_))
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_create_stream_as_retries_then_succeeds() {
    let transport = MockTransport::new();
    transport.push_result(Err(TransportError::timeout("read timed out").into()));
    transport.push_response(
        200,
        r#"[{"@type":"currentStatus","commandStatus":{"status":"ERROR","message":"source not ready"}}]"#,
    );
    transport.push_response(200, SUCCESS);
    let client = client(&transport);

    let options = CreateAsOptions::new()
        .with_select_columns(["rowtime", "userid"])
        .with_condition(r#"userid = "User_1""#);
    let created = client
        .create_stream_as("users_filtered", "users", options)
        .await
        .unwrap();

    assert!(created);
    let statements = transport.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements.iter().all(|s| s == &statements[0]));
    assert_eq!(
        statements[0],
        "CREATE STREAM users_filtered WITH (kafka_topic='users_filtered', value_format='JSON') AS SELECT rowtime, userid FROM users WHERE userid = 'User_1';"
    );
}

#[tokio::test]
async fn test_create_stream_as_reraises_last_error() {
    let transport = MockTransport::new();
    for message in ["first", "second", "third"] {
        transport.push_response(
            200,
            &json!([{"commandStatus": {"status": "ERROR", "message": message}}]).to_string(),
        );
    }
    let client = client(&transport);

    let err = client
        .create_stream_as("s2", "s1", CreateAsOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "third");
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_create_table_as_uses_custom_policy() {
    let transport = MockTransport::new();
    transport.push_result(Err(TransportError::timeout("read timed out").into()));
    let client = client(&transport)
        .with_retry_policy(RetryPolicy::new(1, Duration::from_millis(10)));

    let err = client
        .create_table_as(
            "totals",
            "orders",
            CreateAsOptions::new().with_partitions(4).with_replicas(1),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(
        transport.statements(),
        vec![
            "CREATE TABLE totals WITH (kafka_topic='totals', value_format='JSON', partitions=4, replicas=1) AS SELECT * FROM orders;"
        ]
    );
}

#[tokio::test]
async fn test_create_by_kind_name() {
    let transport = MockTransport::new();
    transport.push_result(Err(TransportError::timeout("read timed out").into()));
    transport.push_response(200, SUCCESS);
    let client = client(&transport);

    let params = StatementParams {
        table_kind: "stream".to_string(),
        name: "clicks_copy".to_string(),
        source: Some("clicks".to_string()),
        options: CreateAsOptions::new().with_condition(r#""pageId" = "home""#),
        ..StatementParams::default()
    };
    assert!(client.create("create_as", params).await.unwrap());

    assert_eq!(
        transport.statements(),
        vec![
            r#"CREATE STREAM clicks_copy WITH (kafka_topic='clicks_copy', value_format='JSON') AS SELECT * FROM clicks WHERE "pageId" = 'home';"#;
            2
        ]
    );
}

#[tokio::test]
async fn test_create_with_unknown_kind_is_not_sent() {
    let transport = MockTransport::new();
    let client = client(&transport);

    let err = client
        .create("create_view", StatementParams::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::UnsupportedStatementKind(ref k)) if k == "create_view"
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_plain_statements_are_not_retried() {
    let transport = MockTransport::new();
    transport.push_result(Err(TransportError::timeout("read timed out").into()));
    let client = client(&transport);

    let err = client.ksql("SHOW STREAMS;", None).await.unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(transport.requests().len(), 1);
}

// =============================================================================
// Server metadata
// =============================================================================

#[tokio::test]
async fn test_server_version() {
    let transport = MockTransport::new();
    transport.push_response(
        200,
        r#"{"KsqlServerInfo":{"version":"0.29.0","kafkaClusterId":"abc","ksqlServiceId":"default_"}}"#,
    );
    let client = client(&transport);

    assert_eq!(client.server_version().await.unwrap(), "0.29.0");
    assert_eq!(transport.requests()[0].0, "info");
}

#[tokio::test]
async fn test_server_properties() {
    let transport = MockTransport::new();
    transport.push_response(
        200,
        r#"[{"@type":"properties","statementText":"SHOW PROPERTIES;","properties":[{"name":"ksql.streams.auto.offset.reset","scope":"KSQL","value":"earliest"}],"overwrittenProperties":[]}]"#,
    );
    let client = client(&transport);

    let properties = client.server_properties().await.unwrap();

    assert_eq!(properties.len(), 1);
    assert_eq!(properties[0].name, "ksql.streams.auto.offset.reset");
    assert_eq!(properties[0].value, json!("earliest"));
}

#[test]
fn test_build_info_is_injected() {
    let transport = MockTransport::new();
    let info = BuildInfo {
        server_version: "5.0.0",
        api_version: "9.9.9",
    };
    let client = client(&transport).with_build_info(info);

    assert_eq!(client.build_info().version(), "5.0.0.9.9.9");
    assert_eq!(client.url(), "http://localhost:8088");
    assert_eq!(client.timeout(), Duration::from_secs(15));
}

// =============================================================================
// Stream administration
// =============================================================================

const SHOW_STREAMS: &str = r#"[{"@type":"streams","statementText":"SHOW STREAMS;","streams":[
    {"type":"STREAM","name":"TEST_ORDERS","topic":"orders","format":"JSON"},
    {"type":"STREAM","name":"PAGEVIEWS","topic":"pageviews","format":"JSON"},
    {"type":"TABLE","name":"TEST_TOTALS","topic":"totals","format":"JSON"}
]}]"#;

#[tokio::test]
async fn test_list_streams_with_prefix() {
    let transport = MockTransport::new();
    transport.push_response(200, SHOW_STREAMS);
    transport.push_response(200, SHOW_STREAMS);
    let client = client(&transport);

    assert_eq!(
        client.list_streams(None).await.unwrap(),
        vec!["TEST_ORDERS", "PAGEVIEWS"]
    );
    assert_eq!(
        client.list_streams(Some("test_")).await.unwrap(),
        vec!["TEST_ORDERS"]
    );
}

#[tokio::test]
async fn test_describe_missing_stream() {
    let transport = MockTransport::new();
    transport.push_response(
        400,
        r#"{"@type":"statement_error","error_code":40001,"message":"Could not find STREAM/TABLE 'NOPE' in the Metastore","stackTrace":[]}"#,
    );
    let client = client(&transport);

    assert!(client.describe_stream("nope").await.unwrap().is_none());
    assert_eq!(transport.statements(), vec!["DESCRIBE EXTENDED nope;"]);
}

#[tokio::test]
async fn test_drop_stream_terminates_dependent_queries() {
    let transport = MockTransport::new();
    transport.push_response(
        200,
        r#"[{"@type":"sourceDescription","sourceDescription":{"name":"ORDERS","readQueries":[{"id":"CSAS_A_0"}],"writeQueries":[{"id":"CSAS_ORDERS_1"}]}}]"#,
    );
    transport.push_response(200, SUCCESS);
    transport.push_response(200, SUCCESS);
    transport.push_response(200, SUCCESS);
    let client = client(&transport);

    client.drop_stream("orders").await.unwrap();

    assert_eq!(
        transport.statements(),
        vec![
            "DESCRIBE EXTENDED orders;",
            "TERMINATE CSAS_A_0;",
            "TERMINATE CSAS_ORDERS_1;",
            "DROP STREAM IF EXISTS orders;",
        ]
    );
}

#[tokio::test]
async fn test_drop_all_streams() {
    let transport = MockTransport::new();
    transport.push_response(200, SHOW_STREAMS);
    transport.push_response(
        200,
        r#"[{"sourceDescription":{"name":"TEST_ORDERS","readQueries":[],"writeQueries":[]}}]"#,
    );
    transport.push_response(200, SUCCESS);
    let client = client(&transport);

    let dropped = client.drop_all_streams(Some("test")).await.unwrap();

    assert_eq!(dropped, vec!["TEST_ORDERS"]);
    assert_eq!(
        transport.statements(),
        vec![
            "SHOW STREAMS;",
            "DESCRIBE EXTENDED TEST_ORDERS;",
            "DROP STREAM IF EXISTS TEST_ORDERS;",
        ]
    );
}
