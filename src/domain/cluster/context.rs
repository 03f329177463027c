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

//! Cancellation and deadline for one provider call chain.

use crate::shared::error::ProviderError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether any further call would be refused.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Drives `call` until it finishes, the token is cancelled or the
    /// deadline passes. The outbound future is dropped in the latter cases.
    pub async fn run<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, call)
                    .await
                    .unwrap_or_else(|_| Err(ProviderError::Timeout("deadline exceeded".to_string()))),
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProviderError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_result_through() {
        let ctx = OperationContext::new();
        let result = ctx.run(async { Ok::<_, ProviderError>(42) }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = OperationContext::new().with_cancellation(token);
        let result = ctx.run(async { Ok::<_, ProviderError>(()) }).await;
        assert_eq!(result, Err(ProviderError::Cancelled));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_cancelled_while_in_flight() {
        let token = CancellationToken::new();
        let ctx = OperationContext::new().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, ProviderError>(())
            })
            .await;
        canceller.await.unwrap();
        assert_eq!(result, Err(ProviderError::Cancelled));
    }

    #[test]
    fn test_done_after_deadline() {
        let ctx = OperationContext::new().with_deadline(Instant::now());
        assert!(ctx.is_done());
        assert!(!OperationContext::new().is_done());
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = OperationContext::new().with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, ProviderError>(())
            })
            .await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))));
    }
}
