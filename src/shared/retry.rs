// Copyright 2025 JiangLong.
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

//! Caller-side retry for transient provider failures.
//!
//! The reconciler itself never retries; this is the policy the CLI applies
//! around a single reconciliation pass.

use crate::domain::cluster::OperationContext;
use crate::shared::error::{KubeError, Result};
use backon::{BackoffBuilder, ExponentialBuilder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; 0 disables retrying.
    pub max_times: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_times: 3,
            min_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn disabled() -> Self {
        Self {
            max_times: 0,
            ..Default::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(self.max_times)
            .with_jitter()
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the backoff schedule is exhausted. Nothing is retried once `ctx` is
/// cancelled or past its deadline.
pub async fn retry_transient<F, Fut, T>(
    ctx: &OperationContext,
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delays = config.backoff().build();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err: KubeError = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() {
            return Err(err);
        }
        if ctx.is_done() {
            warn!(
                operation = %operation_name,
                attempt = attempt,
                error = %err,
                "Operation context is done, not retrying"
            );
            return Err(err);
        }

        match delays.next() {
            Some(delay) => {
                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                if ctx.is_done() {
                    return Err(err);
                }
            }
            None => {
                error!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %err,
                    "Operation failed after max retries"
                );
                return Err(err);
            }
        }
    }
}
