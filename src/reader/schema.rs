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


//! Schema header and row fragment parsing for streaming query responses.
//!
//! A `/query` response body is a JSON array written one element per line:
//!
//! ```text
//! [{"header":{"queryId":"q1","schema":"`ID` INTEGER KEY, `S` STRUCT<`A` INTEGER>"}},
//! {"row":{"columns":[1,{"A":2}]}},
//! {"row":{"columns":[2,{"A":3}]}}]
//! ```
//!
//! The array punctuation around each line is framing noise and is stripped
//! before the line is decoded as a single JSON object.

use crate::error::{Error, Result, StatementError};
use crate::types::ErrorEnvelope;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A decoded row: column name to value, in schema order.
pub type Row = Map<String, Value>;

/// Declared type of a result column. Compound bodies (`STRUCT<...>`) are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    Bigint,
    Double,
    Decimal,
    String,
    Bytes,
    Date,
    Time,
    Timestamp,
    Array,
    Map,
    Struct,
    Other(std::string::String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Integer => "INTEGER",
            ColumnType::Bigint => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::String => "STRING",
            ColumnType::Bytes => "BYTES",
            ColumnType::Date => "DATE",
            ColumnType::Time => "TIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Array => "ARRAY",
            ColumnType::Map => "MAP",
            ColumnType::Struct => "STRUCT",
            ColumnType::Other(name) => name,
        }
    }
}

impl From<&str> for ColumnType {
    fn from(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "BOOLEAN" => ColumnType::Boolean,
            "INT" | "INTEGER" => ColumnType::Integer,
            "BIGINT" => ColumnType::Bigint,
            "DOUBLE" => ColumnType::Double,
            "DECIMAL" => ColumnType::Decimal,
            "STRING" | "VARCHAR" => ColumnType::String,
            "BYTES" => ColumnType::Bytes,
            "DATE" => ColumnType::Date,
            "TIME" => ColumnType::Time,
            "TIMESTAMP" => ColumnType::Timestamp,
            "ARRAY" => ColumnType::Array,
            "MAP" => ColumnType::Map,
            "STRUCT" => ColumnType::Struct,
            _ => ColumnType::Other(upper),
        }
    }
}

impl FromStr for ColumnType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ColumnType::from(s))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a query result schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    /// Declared with a trailing `KEY` qualifier.
    pub key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            key: false,
        }
    }
}

/// Outcome of decoding one row fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFrame {
    Row(Row),
    /// The server signalled normal completion of the query.
    End(Option<String>),
}

/// Backtick-quoted column name, doubled backticks escaped, followed by its type word.
const COLUMN_PATTERN: &str = r"^\s*`((?:[^`]|``)+)`\s+([A-Za-z_][A-Za-z0-9_]*)";

fn column_regex() -> &'static Regex {
    static COLUMN: OnceLock<Regex> = OnceLock::new();
    // Constant pattern, compiled by test_column_pattern_compiles.
    COLUMN.get_or_init(|| Regex::new(COLUMN_PATTERN).expect("COLUMN_PATTERN is a valid regex"))
}

/// Parse a header line into the ordered column list.
///
/// Accepts `{"header":{"schema":...}}`, `{"schema":...}` or either wrapped
/// in a single-element array, with or without line framing.
pub fn parse_schema(header_line: &str) -> Result<Vec<Column>> {
    let frame = strip_framing(header_line);
    let mut value: Value = serde_json::from_str(frame)
        .map_err(|e| Error::decode(format!("invalid header line: {}", e)))?;

    if let Value::Array(items) = value {
        value = items
            .into_iter()
            .next()
            .ok_or_else(|| Error::decode("header line is an empty array"))?;
    }

    let schema = value
        .get("header")
        .and_then(|header| header.get("schema"))
        .or_else(|| value.get("schema"))
        .and_then(Value::as_str)
        .ok_or_else(|| Error::decode(format!("header line has no schema: {}", frame)))?;

    parse_schema_text(schema)
}

/// Parse a schema string such as `` `ID` INTEGER KEY, `S` STRUCT<`A` INTEGER> ``.
pub fn parse_schema_text(schema: &str) -> Result<Vec<Column>> {
    let mut columns = Vec::new();
    let mut seen = HashSet::new();

    for segment in split_top_level(schema) {
        if segment.trim().is_empty() {
            continue;
        }
        let captures = column_regex()
            .captures(segment)
            .ok_or_else(|| Error::decode(format!("invalid column definition: {}", segment.trim())))?;

        let name = captures[1].replace("``", "`");
        if !seen.insert(name.clone()) {
            return Err(Error::decode(format!("duplicate column '{}' in schema", name)));
        }

        let column_type = ColumnType::from(&captures[2]);
        let key = segment.trim_end().to_ascii_uppercase().ends_with(" KEY");

        columns.push(Column {
            name,
            column_type,
            key,
        });
    }

    if columns.is_empty() {
        return Err(Error::decode("schema declares no columns"));
    }
    Ok(columns)
}

/// Split on commas that are not inside `<>`, `()` or backtick quotes.
fn split_top_level(schema: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;

    for (i, c) in schema.char_indices() {
        match c {
            '`' => quoted = !quoted,
            '<' | '(' if !quoted => depth += 1,
            '>' | ')' if !quoted => depth = depth.saturating_sub(1),
            ',' if !quoted && depth == 0 => {
                segments.push(&schema[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&schema[start..]);
    segments
}

/// Decode one row fragment against the schema.
///
/// Values map to columns strictly by position. A fragment whose value count
/// differs from the schema's column count is a decode error.
pub fn decode_row(raw_line: &str, columns: &[Column]) -> Result<RowFrame> {
    let frame = strip_framing(raw_line);
    let value: Value = serde_json::from_str(frame)
        .map_err(|e| Error::decode(format!("invalid row fragment: {}", e)))?;

    let Value::Object(mut object) = value else {
        return Err(Error::decode(format!("row fragment is not an object: {}", frame)));
    };

    if let Some(error) = object.remove("errorMessage").filter(|v| !v.is_null()) {
        return Err(stream_error(error).into());
    }

    if let Some(message) = object.remove("finalMessage").filter(|v| !v.is_null()) {
        return Ok(RowFrame::End(message.as_str().map(str::to_string)));
    }

    let values = match object.remove("row") {
        Some(Value::Object(mut row)) => match row.remove("columns") {
            Some(Value::Array(values)) => values,
            _ => return Err(Error::decode(format!("row has no columns array: {}", frame))),
        },
        _ => return Err(Error::decode(format!("fragment carries no row: {}", frame))),
    };

    if values.len() != columns.len() {
        return Err(Error::decode(format!(
            "row has {} values but schema has {} columns",
            values.len(),
            columns.len()
        )));
    }

    let row = columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.name.clone(), value))
        .collect();
    Ok(RowFrame::Row(row))
}

fn stream_error(error: Value) -> StatementError {
    match error {
        Value::String(message) => StatementError::new(message),
        other => serde_json::from_value::<ErrorEnvelope>(other.clone())
            .map(StatementError::from)
            .unwrap_or_else(|_| StatementError::new(other.to_string())),
    }
}

/// Strip the JSON-array framing around a single response line.
///
/// Removes surrounding whitespace, a trailing comma, unbalanced trailing `]`
/// and an unbalanced leading `[`, repeating until nothing changes. Brackets
/// inside string literals are not counted.
pub fn strip_framing(line: &str) -> &str {
    let mut frame = line.trim();
    loop {
        let before = frame.len();

        if let Some(rest) = frame.strip_suffix(',') {
            frame = rest.trim_end();
        }

        let balance = bracket_balance(frame);
        if balance < 0 {
            if let Some(rest) = frame.strip_suffix(']') {
                frame = rest.trim_end();
            }
        } else if balance > 0 {
            if let Some(rest) = frame.strip_prefix('[') {
                frame = rest.trim_start();
            }
        }

        if frame.len() == before {
            return frame;
        }
    }
}

/// Opening minus closing square brackets outside string literals.
fn bracket_balance(text: &str) -> i64 {
    let mut balance = 0i64;
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => balance += 1,
            ']' => balance -= 1,
            _ => {}
        }
    }
    balance
}
