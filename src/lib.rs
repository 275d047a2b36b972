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


//! Client library for the KSQL REST API.
//!
//! ## Overview
//!
//! - [`KsqlClient`] - Runs statements, streaming queries and admin helpers
//! - [`builder`] - Renders `CREATE STREAM/TABLE` and `CREATE ... AS SELECT`
//! - [`reader`] - Decodes the chunked body of a query into rows
//! - [`RetryPolicy`] - Bounded retry applied to `CREATE ... AS SELECT`
//!
//! ## Example
//!
//! ```ignore
//! use futures::StreamExt;
//! use ksql_client::{ClientConfig, KsqlClient, QueryOptions};
//! use std::time::Duration;
//!
//! let client = KsqlClient::connect(ClientConfig::new("http://localhost:8088")).await?;
//! client
//!     .create_stream(
//!         "pageviews",
//!         ["viewtime bigint", "userid varchar", "pageid varchar"],
//!         "pageviews",
//!         None,
//!     )
//!     .await?;
//!
//! let options = QueryOptions::new()
//!     .with_return_objects(true)
//!     .with_idle_timeout(Duration::from_secs(5));
//! let rows = client
//!     .query("SELECT * FROM pageviews EMIT CHANGES", options)
//!     .await?
//!     .into_stream();
//! futures::pin_mut!(rows);
//! while let Some(item) = rows.next().await {
//!     println!("{:?}", item?.into_row());
//! }
//! ```
//!
//! ## Configuration Options
//!
//! See [`ClientConfig`]. Logging follows `RUST_LOG` unless a level is set
//! through [`LogConfig`].

pub mod auth;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod reader;
pub mod retry;
pub mod types;

pub use auth::{AuthProvider, BasicAuth, NoAuth};
pub use builder::{
    CreateAsOptions, Statement, StatementKind, StatementParams, TableKind, ValueFormat,
};
pub use client::{DependentQueries, KsqlClient, QueryOptions, Transport};
pub use config::{BuildInfo, ClientConfig};
pub use error::{Error, Result};
pub use logging::LogConfig;
pub use reader::{QueryItem, QueryReader, QueryStream, Row};
pub use retry::RetryPolicy;
