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


//! Authentication providers for the KSQL REST API.
//!
//! Confluent Cloud style API key/secret pairs are sent as HTTP basic auth.

use crate::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine};

/// Produces the `Authorization` header value for outgoing requests.
pub trait AuthProvider: Send + Sync + std::fmt::Debug {
    /// Header value, or `None` when no header should be sent.
    fn auth_header(&self) -> Result<Option<String>>;
}

/// No authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthProvider for NoAuth {
    fn auth_header(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// HTTP basic authentication with an API key and secret.
#[derive(Clone)]
pub struct BasicAuth {
    api_key: String,
    secret: String,
}

impl BasicAuth {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for BasicAuth {
    fn auth_header(&self) -> Result<Option<String>> {
        let credentials = STANDARD.encode(format!("{}:{}", self.api_key, self.secret));
        Ok(Some(format!("Basic {}", credentials)))
    }
}
