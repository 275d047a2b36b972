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


//! Retry policy for statements that may fail transiently.
//!
//! `CREATE ... AS SELECT` statements can time out or be rejected while the
//! engine is still registering the source. The policy re-runs such an
//! operation a bounded number of times with a fixed delay in between:
//!
//! ```ignore
//! let policy = RetryPolicy::new(3, Duration::from_secs(1));
//! let created = policy.run(|| async { client.ksql(&sql, None).await }).await?;
//! ```

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Decides whether an error is worth another attempt.
pub type RetryPredicate = fn(&Error) -> bool;

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before every attempt after the first.
    pub delay: Duration,
    pub predicate: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
            predicate: Error::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            ..Self::default()
        }
    }

    pub fn with_predicate(mut self, predicate: RetryPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Validation failures never succeed on retry, whatever the predicate says.
    pub fn should_retry(&self, error: &Error) -> bool {
        !matches!(error, Error::Validation(_) | Error::MissingKey { .. }) && (self.predicate)(error)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && self.should_retry(&e) => {
                    warn!(
                        "Attempt {}/{} failed: {}, retrying...",
                        attempt, max_attempts, e
                    );
                    if !self.delay.is_zero() {
                        debug!("Waiting {:?} before retry", self.delay);
                        sleep(self.delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
