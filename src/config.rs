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


//! Client configuration.
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `url` | `http://localhost:8088` | KSQL server base URL |
//! | `timeout` | 15 s | Per-request timeout (per read for streaming queries) |
//! | `connect_timeout` | 10 s | TCP connect timeout |
//! | `api_key` / `secret` | unset | Basic-auth credentials, used when both are set |
//! | `max_attempts` | 3 | Attempts for `CREATE ... AS SELECT` statements |
//! | `retry_delay` | 0 s | Fixed delay between those attempts |
//! | `check_version` | true | Fetch `/info` when connecting |

use crate::auth::{AuthProvider, BasicAuth, NoAuth};
use crate::client::HttpClientConfig;
use crate::logging::LogConfig;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

/// Version information fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    /// Server version this client was built against.
    pub server_version: &'static str,
    /// Version of the client API itself.
    pub api_version: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            server_version: "4.1.1-SNAPSHOT",
            api_version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Combined `<server>.<api>` version string.
    pub fn version(&self) -> String {
        format!("{}.{}", self.server_version, self.api_version)
    }
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self::current()
    }
}

/// Configuration for [`KsqlClient`](crate::KsqlClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub api_key: Option<String>,
    pub secret: Option<String>,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub check_version: bool,
    pub user_agent: String,
    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8088".to_string(),
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            api_key: None,
            secret: None,
            max_attempts: 3,
            retry_delay: Duration::ZERO,
            check_version: true,
            user_agent: format!("ksql-client/{}", env!("CARGO_PKG_VERSION")),
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_credentials(mut self, api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self.secret = Some(secret.into());
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_check_version(mut self, check_version: bool) -> Self {
        self.check_version = check_version;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Basic auth when both key and secret are set, otherwise none.
    pub fn auth_provider(&self) -> Arc<dyn AuthProvider> {
        match (self.api_key.as_deref(), self.secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Arc::new(BasicAuth::new(key, secret))
            }
            _ => Arc::new(NoAuth),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay)
    }

    pub fn http_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            connect_timeout: self.connect_timeout,
            read_timeout: self.timeout,
            user_agent: self.user_agent.clone(),
            ..HttpClientConfig::default()
        }
    }
}
