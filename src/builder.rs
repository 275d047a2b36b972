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


//! KSQL statement builder.
//!
//! Builds `CREATE STREAM` / `CREATE TABLE` statements, either from a column
//! list backed by a topic or as a persistent query over another source
//! (`CREATE ... AS SELECT`). Building is pure: no I/O, and identical inputs
//! always render identical strings.
//!
//! # Examples
//!
//! ```ignore
//! let sql = Statement::Create(
//!     CreateStatement::new("stream", "pageviews", ["viewtime bigint", "userid varchar"], "pageviews")
//!         .with_value_format("DELIMITED"),
//! )
//! .build()?;
//! assert_eq!(
//!     sql,
//!     "CREATE STREAM pageviews (viewtime bigint, userid varchar) WITH (kafka_topic='pageviews', value_format='DELIMITED');"
//! );
//! ```

use crate::error::{Error, Result, ValidationError};
use std::fmt;
use std::str::FromStr;

/// Terminator appended to every statement sent to the server.
pub const STATEMENT_TERMINATOR: char = ';';

/// Recognised statement kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Create,
    CreateAs,
}

impl FromStr for StatementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(StatementKind::Create),
            "create_as" | "create-as" => Ok(StatementKind::CreateAs),
            _ => Err(ValidationError::UnsupportedStatementKind(s.to_string()).into()),
        }
    }
}

/// Kind of object a create statement declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Table,
    Stream,
}

impl TableKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TableKind::Table => "TABLE",
            TableKind::Stream => "STREAM",
        }
    }
}

impl FromStr for TableKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(TableKind::Table),
            "stream" => Ok(TableKind::Stream),
            _ => Err(ValidationError::IllegalTableKind(s.to_string()).into()),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Encoding of the values in the backing topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFormat {
    Delimited,
    #[default]
    Json,
    Avro,
}

impl ValueFormat {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ValueFormat::Delimited => "DELIMITED",
            ValueFormat::Json => "JSON",
            ValueFormat::Avro => "AVRO",
        }
    }

    /// Parse an optional format, falling back to JSON when absent.
    fn parse_or_default(format: Option<&str>) -> Result<Self> {
        format.map(str::parse).transpose().map(Option::unwrap_or_default)
    }
}

impl FromStr for ValueFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "delimited" => Ok(ValueFormat::Delimited),
            "json" => Ok(ValueFormat::Json),
            "avro" => Ok(ValueFormat::Avro),
            _ => Err(ValidationError::IllegalValueFormat(s.to_string()).into()),
        }
    }
}

/// `CREATE <KIND> <name> (<columns>) WITH (...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateStatement {
    pub table_kind: String,
    pub name: String,
    /// Column definitions in `"name type"` form, in declaration order.
    pub columns: Vec<String>,
    pub topic: String,
    pub value_format: Option<String>,
    pub key: Option<String>,
}

impl CreateStatement {
    pub fn new<I, S>(
        table_kind: impl Into<String>,
        name: impl Into<String>,
        columns: I,
        topic: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            table_kind: table_kind.into(),
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            topic: topic.into(),
            value_format: None,
            key: None,
        }
    }

    pub fn with_value_format(mut self, format: impl Into<String>) -> Self {
        self.value_format = Some(format.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    fn build(&self) -> Result<String> {
        let kind: TableKind = self.table_kind.parse()?;
        let format = ValueFormat::parse_or_default(self.value_format.as_deref())?;
        let key = self.key.as_deref().filter(|k| !k.is_empty());

        if kind == TableKind::Table && key.is_none() {
            return Err(Error::MissingKey {
                table: self.name.clone(),
            });
        }

        let mut properties = vec![
            ("kafka_topic", PropertyValue::Text(self.topic.clone())),
            ("value_format", PropertyValue::Text(format.as_sql().to_string())),
        ];
        if let Some(key) = key {
            properties.push(("key", PropertyValue::Text(key.to_string())));
        }

        terminate(&format!(
            "CREATE {} {} ({}) WITH ({})",
            kind,
            self.name,
            self.columns.join(", "),
            render_properties(&properties)
        ))
    }
}

/// Optional clauses of a `CREATE ... AS SELECT` statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateAsOptions {
    /// Projected columns; empty selects `*`.
    pub select_columns: Vec<String>,
    /// Target topic; defaults to the statement name.
    pub kafka_topic: Option<String>,
    pub value_format: Option<String>,
    pub condition: Option<String>,
    pub partition_by: Option<String>,
    pub partitions: Option<u32>,
    pub replicas: Option<u32>,
    pub timestamp: Option<String>,
}

impl CreateAsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_kafka_topic(mut self, topic: impl Into<String>) -> Self {
        self.kafka_topic = Some(topic.into());
        self
    }

    pub fn with_value_format(mut self, format: impl Into<String>) -> Self {
        self.value_format = Some(format.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_partition_by(mut self, column: impl Into<String>) -> Self {
        self.partition_by = Some(column.into());
        self
    }

    pub fn with_partitions(mut self, partitions: u32) -> Self {
        self.partitions = Some(partitions);
        self
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replicas = Some(replicas);
        self
    }

    pub fn with_timestamp(mut self, column: impl Into<String>) -> Self {
        self.timestamp = Some(column.into());
        self
    }
}

/// `CREATE <KIND> <name> WITH (...) AS SELECT ... FROM <source> ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAsStatement {
    pub table_kind: String,
    pub name: String,
    pub source: String,
    pub options: CreateAsOptions,
}

impl CreateAsStatement {
    pub fn new(
        table_kind: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            table_kind: table_kind.into(),
            name: name.into(),
            source: source.into(),
            options: CreateAsOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CreateAsOptions) -> Self {
        self.options = options;
        self
    }

    fn build(&self) -> Result<String> {
        let options = &self.options;
        let kind: TableKind = self.table_kind.parse()?;
        let format = ValueFormat::parse_or_default(options.value_format.as_deref())?;
        let topic = options.kafka_topic.as_deref().unwrap_or(&self.name);

        let mut properties = vec![
            ("kafka_topic", PropertyValue::Text(topic.to_string())),
            ("value_format", PropertyValue::Text(format.as_sql().to_string())),
        ];
        if let Some(partitions) = options.partitions {
            properties.push(("partitions", PropertyValue::Number(partitions)));
        }
        if let Some(replicas) = options.replicas {
            properties.push(("replicas", PropertyValue::Number(replicas)));
        }
        if let Some(ref timestamp) = options.timestamp {
            properties.push(("timestamp", PropertyValue::Text(timestamp.clone())));
        }

        let columns = if options.select_columns.is_empty() {
            "*".to_string()
        } else {
            options.select_columns.join(", ")
        };

        let mut sql = format!(
            "CREATE {} {} WITH ({}) AS SELECT {} FROM {}",
            kind,
            self.name,
            render_properties(&properties),
            columns,
            self.source
        );

        if let Some(condition) = options.condition.as_deref().filter(|c| !c.trim().is_empty()) {
            sql.push_str(&format!(" WHERE {}", quote_literals(condition)));
        }

        if let Some(ref column) = options.partition_by {
            sql.push_str(&format!(" PARTITION BY {}", column));
        }

        terminate(&collapse_whitespace(&sql))
    }
}

/// Loosely typed statement parameters, for callers that choose the
/// statement kind by name at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementParams {
    pub table_kind: String,
    pub name: String,
    /// Column definitions, `create` only.
    pub columns: Vec<String>,
    /// Backing topic; defaults to the name.
    pub topic: Option<String>,
    pub value_format: Option<String>,
    /// Key column, `create` only.
    pub key: Option<String>,
    /// Source stream or table, `create_as` only.
    pub source: Option<String>,
    /// Optional clauses, `create_as` only.
    pub options: CreateAsOptions,
}

/// A statement to build, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Create(CreateStatement),
    CreateAs(CreateAsStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Create(_) => StatementKind::Create,
            Statement::CreateAs(_) => StatementKind::CreateAs,
        }
    }

    /// Assemble a statement from a kind name (`create` or `create_as`).
    pub fn from_kind(kind: &str, params: StatementParams) -> Result<Self> {
        let StatementParams {
            table_kind,
            name,
            columns,
            topic,
            value_format,
            key,
            source,
            mut options,
        } = params;

        match kind.parse::<StatementKind>()? {
            StatementKind::Create => {
                let topic = topic.unwrap_or_else(|| name.clone());
                let mut create = CreateStatement::new(table_kind, name, columns, topic);
                create.value_format = value_format;
                create.key = key;
                Ok(Statement::Create(create))
            }
            StatementKind::CreateAs => {
                let Some(source) = source.filter(|s| !s.trim().is_empty()) else {
                    return Err(ValidationError::MissingSource(name).into());
                };
                options.kafka_topic = options.kafka_topic.or(topic);
                options.value_format = options.value_format.or(value_format);
                Ok(Statement::CreateAs(
                    CreateAsStatement::new(table_kind, name, source).with_options(options),
                ))
            }
        }
    }

    /// Render the statement text, terminated with a single `;`.
    pub fn build(&self) -> Result<String> {
        match self {
            Statement::Create(create) => create.build(),
            Statement::CreateAs(create_as) => create_as.build(),
        }
    }
}

/// Value of a `WITH (...)` property.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PropertyValue {
    Text(String),
    Number(u32),
}

/// Render properties as `name='text', name=number`, keeping the given order.
fn render_properties(properties: &[(&str, PropertyValue)]) -> String {
    properties
        .iter()
        .map(|(name, value)| match value {
            PropertyValue::Text(text) => format!("{}='{}'", name, text),
            PropertyValue::Number(n) => format!("{}={}", name, n),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrite double-quoted literals in a filter condition as single-quoted ones.
///
/// A double-quoted segment is a literal when it follows a comparison
/// operator, `(`, `,`, or one of `LIKE`, `IN`, `BETWEEN`. Anywhere else it
/// is a quoted identifier and is kept as is. Single-quoted literals are
/// copied unchanged, and `'` inside a rewritten literal is doubled.
fn quote_literals(condition: &str) -> String {
    let mut out = String::with_capacity(condition.len());
    let mut chars = condition.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                out.push(c);
                for next in chars.by_ref() {
                    out.push(next);
                    if next == '\'' {
                        break;
                    }
                }
            }
            '"' => {
                let mut body = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == '"' {
                        closed = true;
                        break;
                    }
                    body.push(next);
                }
                if closed && in_literal_position(&out) {
                    out.push('\'');
                    out.push_str(&body.replace('\'', "''"));
                    out.push('\'');
                } else {
                    out.push('"');
                    out.push_str(&body);
                    if closed {
                        out.push('"');
                    }
                }
            }
            _ => out.push(c),
        }
    }
    out
}

fn in_literal_position(preceding: &str) -> bool {
    let preceding = preceding.trim_end();
    match preceding.chars().last() {
        Some('=' | '<' | '>' | '(' | ',') => true,
        Some(c) if c.is_ascii_alphabetic() => {
            let word = preceding
                .rsplit(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .next()
                .unwrap_or_default();
            ["LIKE", "IN", "BETWEEN"]
                .iter()
                .any(|keyword| word.eq_ignore_ascii_case(keyword))
        }
        _ => false,
    }
}

fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ensure a statement ends with exactly one terminator.
///
/// Already-terminated statements are returned unchanged; trailing whitespace
/// after the last clause is dropped before terminating. Empty or blank input
/// is rejected.
pub fn terminate(sql: &str) -> Result<String> {
    let trimmed = sql.trim_end();
    if trimmed.trim_start().is_empty() {
        return Err(ValidationError::EmptyStatement.into());
    }
    if trimmed.ends_with(STATEMENT_TERMINATOR) {
        return Ok(sql.to_string());
    }
    Ok(format!("{}{}", trimmed, STATEMENT_TERMINATOR))
}
