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

use crate::domain::config::ProviderConfig;
use crate::infrastructure::azure::models::{
    ArmErrorResponse, AsyncOperationStatus, CredentialResults, ManagedCluster,
};
use crate::infrastructure::constants::{
    ADMIN_CREDENTIAL_ACTION, HEADER_ASYNC_OPERATION, HEADER_LOCATION, HEADER_RETRY_AFTER,
    MANAGED_CLUSTER_PROVIDER, MIN_POLL_DELAY, OPERATION_CANCELED, OPERATION_FAILED,
    OPERATION_SUCCEEDED,
};
use crate::shared::error::{KubeError, ProviderError};
use base64::{engine::general_purpose::STANDARD, Engine};
#[cfg(test)]
use mockall::automock;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Provider operations the reconciler relies on.
///
/// A missing resource must be reported as [`ProviderError::NotFound`] (or an
/// error for which [`ProviderError::is_not_found`] holds).
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ManagedClusterClient: Send + Sync {
    async fn get(&self, resource_group: &str, name: &str) -> Result<ManagedCluster, ProviderError>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        cluster: &ManagedCluster,
    ) -> Result<(), ProviderError>;

    async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ProviderError>;

    /// Raw admin kubeconfig for the cluster.
    async fn get_credentials(&self, resource_group: &str, name: &str) -> Result<Vec<u8>, ProviderError>;
}

/// [`ManagedClusterClient`] backed by the Azure Resource Manager REST API.
pub struct ArmManagedClusterClient {
    http: Client,
    endpoint: String,
    subscription_id: String,
    api_version: String,
    token: String,
    poll_interval: Duration,
    operation_timeout: Duration,
}

impl ArmManagedClusterClient {
    /// Reads the bearer token from the environment variable named by
    /// `config.token_env`.
    pub fn new(config: &ProviderConfig) -> Result<Self, KubeError> {
        let token = std::env::var(&config.token_env).map_err(|_| {
            KubeError::ConfigError(format!(
                "Access token not found: set {} (e.g. from `az account get-access-token`)",
                config.token_env
            ))
        })?;
        Self::with_token(config, token)
    }

    pub fn with_token(config: &ProviderConfig, token: impl Into<String>) -> Result<Self, KubeError> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| KubeError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            subscription_id: config.subscription_id.clone(),
            api_version: config.api_version.clone(),
            token: token.into(),
            poll_interval: config.poll_interval(),
            operation_timeout: config.operation_timeout(),
        })
    }

    fn resource_url(&self, resource_group: &str, name: &str) -> String {
        resource_url(&self.endpoint, &self.subscription_id, resource_group, name)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .query(&[("api-version", self.api_version.as_str())])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        request.send().await.map_err(map_transport_error)
    }

    /// Follows a long-running operation until the provider reports a
    /// terminal state.
    async fn wait_for_completion(&self, response: Response) -> Result<(), ProviderError> {
        let Some((source, url)) = poll_target(response.headers()) else {
            return Ok(());
        };

        let deadline = Instant::now() + self.operation_timeout;
        let mut delay = poll_delay(response.headers(), self.poll_interval);

        loop {
            if Instant::now() + delay > deadline {
                return Err(ProviderError::Timeout(format!(
                    "long-running operation did not complete within {}s",
                    self.operation_timeout.as_secs()
                )));
            }
            sleep(delay).await;

            debug!(url = %url, "Polling long-running operation");
            let response = self
                .send(self.http.get(&url).bearer_auth(&self.token))
                .await?;
            let status = response.status();
            delay = poll_delay(response.headers(), self.poll_interval);

            if status == StatusCode::ACCEPTED {
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(error_from_body(status, &body));
            }

            let body = response.text().await.map_err(map_transport_error)?;
            if operation_outcome(source, status, &body)? {
                return Ok(());
            }
        }
    }
}

#[async_trait::async_trait]
impl ManagedClusterClient for ArmManagedClusterClient {
    async fn get(&self, resource_group: &str, name: &str) -> Result<ManagedCluster, ProviderError> {
        let url = self.resource_url(resource_group, name);
        debug!(url = %url, "GET managed cluster");

        let response = self.send(self.authorized(self.http.get(&url))).await?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        cluster: &ManagedCluster,
    ) -> Result<(), ProviderError> {
        let url = self.resource_url(resource_group, name);
        debug!(url = %url, "PUT managed cluster");

        let response = self
            .send(self.authorized(self.http.put(&url)).json(cluster))
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &body));
        }

        self.wait_for_completion(response).await
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ProviderError> {
        let url = self.resource_url(resource_group, name);
        debug!(url = %url, "DELETE managed cluster");

        let response = self.send(self.authorized(self.http.delete(&url))).await?;
        let status = response.status();
        // ARM answers 204 when there was nothing to delete.
        if status == StatusCode::NO_CONTENT {
            return Err(ProviderError::NotFound(url));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &body));
        }

        self.wait_for_completion(response).await
    }

    async fn get_credentials(&self, resource_group: &str, name: &str) -> Result<Vec<u8>, ProviderError> {
        let url = format!(
            "{}/{}",
            self.resource_url(resource_group, name),
            ADMIN_CREDENTIAL_ACTION
        );
        debug!(url = %url, "POST list credentials");

        let response = self
            .send(
                self.authorized(self.http.post(&url))
                    .header(reqwest::header::CONTENT_LENGTH, 0),
            )
            .await?;
        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        let results: CredentialResults =
            serde_json::from_str(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        decode_kubeconfig(&results)
    }
}

pub fn resource_url(endpoint: &str, subscription_id: &str, resource_group: &str, name: &str) -> String {
    format!(
        "{}/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
        endpoint.trim_end_matches('/'),
        subscription_id,
        resource_group,
        MANAGED_CLUSTER_PROVIDER,
        name
    )
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Maps a failed ARM response to a [`ProviderError`].
pub fn error_from_body(status: StatusCode, body: &str) -> ProviderError {
    let parsed: ArmErrorResponse = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.error.message.is_empty() {
        body.trim().to_string()
    } else {
        parsed.error.message
    };

    if status == StatusCode::NOT_FOUND {
        return ProviderError::NotFound(message);
    }

    let code = if parsed.error.code.is_empty() {
        status.canonical_reason().unwrap_or("Unknown").to_string()
    } else {
        parsed.error.code
    };

    ProviderError::api(status.as_u16(), code, message)
}

/// Where a long-running operation reports its progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollSource {
    /// Status document with a `status` field.
    AsyncOperation,
    /// Answers 202 while running and the resource itself once done.
    Location,
}

fn poll_target(headers: &HeaderMap) -> Option<(PollSource, String)> {
    [
        (PollSource::AsyncOperation, HEADER_ASYNC_OPERATION),
        (PollSource::Location, HEADER_LOCATION),
    ]
    .into_iter()
    .find_map(|(source, name)| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| (source, value.to_string()))
    })
}

/// Whether a successful poll response ends the operation. A status document
/// that cannot be read is an error, never a success.
fn operation_outcome(source: PollSource, status: StatusCode, body: &str) -> Result<bool, ProviderError> {
    if source == PollSource::Location {
        return Ok(true);
    }

    let operation: AsyncOperationStatus = serde_json::from_str(body).map_err(|e| {
        ProviderError::InvalidResponse(format!("unreadable async operation status: {}", e))
    })?;

    match operation.status.as_str() {
        OPERATION_SUCCEEDED => Ok(true),
        OPERATION_FAILED | OPERATION_CANCELED => {
            let error = operation.error.unwrap_or_default();
            let code = if error.code.is_empty() {
                operation.status.clone()
            } else {
                error.code
            };
            Err(ProviderError::api(status.as_u16(), code, error.message))
        }
        "" => Err(ProviderError::InvalidResponse(
            "async operation status is missing".to_string(),
        )),
        _ => Ok(false),
    }
}

/// `Retry-After` when present, the configured interval otherwise; never
/// shorter than [`MIN_POLL_DELAY`].
fn poll_delay(headers: &HeaderMap, poll_interval: Duration) -> Duration {
    let delay = headers
        .get(HEADER_RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(poll_interval);
    delay.max(MIN_POLL_DELAY)
}

pub fn decode_kubeconfig(results: &CredentialResults) -> Result<Vec<u8>, ProviderError> {
    let first = results.kubeconfigs.first().ok_or_else(|| {
        ProviderError::InvalidResponse("provider returned no kubeconfig".to_string())
    })?;

    STANDARD
        .decode(first.value.trim())
        .map_err(|e| ProviderError::InvalidResponse(format!("kubeconfig is not valid base64: {}", e)))
}
