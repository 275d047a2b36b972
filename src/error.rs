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


//! Error types for the KSQL client.
//!
//! Errors fall into five groups:
//! - **Validation**: rejected before any I/O (bad statement kind, table kind,
//!   value format, empty statement)
//! - **MissingKey**: table creation without the required key column
//! - **Transport**: network failures reported by the HTTP layer
//! - **Statement**: the server reported a failure for the statement
//! - **Decode**: malformed schema or row JSON in a streaming response

use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error returned by client operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("key is required for creating table '{table}'")]
    MissingKey { table: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Statement(#[from] StatementError),

    #[error("failed to decode query response: {0}")]
    Decode(String),
}

impl Error {
    /// Create a decode error from any displayable message.
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode(message.into())
    }

    /// Returns `true` for transport timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(e) if e.kind == TransportErrorKind::Timeout)
    }

    /// Returns `true` when a failed create-as statement is worth another attempt.
    ///
    /// Timeouts and server-side statement errors are transient while the
    /// engine is still materialising the source stream.
    pub fn is_retryable(&self) -> bool {
        self.is_timeout() || matches!(self, Error::Statement(_))
    }

    /// Numeric server error code, when the server supplied one.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Error::Statement(e) => e.error_code,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(e))
    }
}

/// Input rejected before anything is sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("statement kind '{0}' is not supported")]
    UnsupportedStatementKind(String),

    #[error("table kind '{0}' is illegal, expected TABLE or STREAM")]
    IllegalTableKind(String),

    #[error("value format '{0}' is illegal, expected DELIMITED, JSON or AVRO")]
    IllegalValueFormat(String),

    #[error("statement is empty")]
    EmptyStatement,

    #[error("create-as statement '{0}' has no source")]
    MissingSource(String),
}

/// Classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    /// Non-2xx response whose body could not be decoded as an error envelope.
    Status(u16),
    /// Failure while reading the response body.
    Body,
    Other,
}

/// Network-level failure from the HTTP layer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if let Some(status) = e.status() {
            TransportErrorKind::Status(status.as_u16())
        } else if e.is_body() || e.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, format!("HTTP request failed: {}", e))
    }
}

/// Failure reported by the server for a statement.
///
/// `error_code` lets callers tell apart, for example, "object not found"
/// (40001) from other failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StatementError {
    pub message: String,
    pub error_code: Option<i64>,
    pub stack_trace: Vec<String>,
    pub statement_text: Option<String>,
}

impl StatementError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_code: None,
            stack_trace: Vec::new(),
            statement_text: None,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.error_code = Some(code);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_not_retryable() {
        let err = Error::from(ValidationError::IllegalValueFormat("foo".to_string()));
        assert!(!err.is_retryable());
        assert!(!err.is_timeout());
        assert_eq!(
            err.to_string(),
            "value format 'foo' is illegal, expected DELIMITED, JSON or AVRO"
        );
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = Error::from(TransportError::timeout("read timed out"));
        assert!(err.is_timeout());
        assert!(err.is_retryable());

        let err = Error::from(TransportError::new(TransportErrorKind::Connect, "refused"));
        assert!(!err.is_timeout());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_statement_error_code() {
        let err = Error::from(StatementError::new("Could not find STREAM/TABLE").with_code(40001));
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), Some(40001));
        assert_eq!(err.to_string(), "Could not find STREAM/TABLE");
        assert_eq!(Error::decode("bad").error_code(), None);
    }

    #[test]
    fn test_json_error_converts_to_decode() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(json_err);
        assert!(matches!(err, Error::Decode(_)));
    }
}
