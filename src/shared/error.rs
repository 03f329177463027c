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

use std::fmt;
use thiserror::Error;

pub type Result<T, E = KubeError> = std::result::Result<T, E>;

/// Failure reported by the managed cluster provider client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("provider returned HTTP {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status, code, .. } => {
                *status == 404 || code == "ResourceNotFound" || code == "NotFound"
            }
            _ => false,
        }
    }

    /// Transient failures a caller may retry with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}

/// The remote call a [`KubeError::Provider`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderOperation {
    Get,
    CreateOrUpdate,
    Delete,
    GetCredentials,
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderOperation::Get => "get",
            ProviderOperation::CreateOrUpdate => "create or update",
            ProviderOperation::Delete => "delete",
            ProviderOperation::GetCredentials => "get credentials for",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum KubeError {
    #[error("Kubernetes API error: {0}")]
    KubeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {resource_type} '{name}' in resource group '{resource_group}'")]
    NotFound {
        resource_type: String,
        name: String,
        resource_group: String,
    },

    #[error("Failed to {operation} managed cluster '{name}' in resource group '{resource_group}': {source}")]
    Provider {
        operation: ProviderOperation,
        name: String,
        resource_group: String,
        #[source]
        source: ProviderError,
    },

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<kube::Error> for KubeError {
    fn from(err: kube::Error) -> Self {
        KubeError::KubeError(err.to_string())
    }
}

impl KubeError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn validation(context: impl Into<String>) -> Self {
        Self::ValidationError(context.into())
    }

    pub fn not_found(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        resource_group: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            name: name.into(),
            resource_group: resource_group.into(),
        }
    }

    /// Wraps a provider failure with the cluster it concerned.
    ///
    /// Timeouts and cancellations keep their own variants so callers can tell
    /// them apart from a rejected request.
    pub fn provider(
        operation: ProviderOperation,
        name: impl Into<String>,
        resource_group: impl Into<String>,
        source: ProviderError,
    ) -> Self {
        let name = name.into();
        let resource_group = resource_group.into();
        match source {
            ProviderError::Cancelled => Self::Cancelled(format!(
                "{} managed cluster '{}' in resource group '{}'",
                operation, name, resource_group
            )),
            ProviderError::Timeout(detail) => Self::Timeout(format!(
                "{} managed cluster '{}' in resource group '{}': {}",
                operation, name, resource_group, detail
            )),
            source => Self::Provider {
                operation,
                name,
                resource_group,
                source,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }

    /// Whether a caller-side retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { source, .. } => source.is_transient(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(ProviderError::NotFound("aks".to_string()).is_not_found());
        assert!(ProviderError::api(404, "Whatever", "gone").is_not_found());
        assert!(ProviderError::api(400, "ResourceNotFound", "gone").is_not_found());
        assert!(!ProviderError::api(409, "Conflict", "busy").is_not_found());
        assert!(!ProviderError::Transport("reset".to_string()).is_not_found());
    }

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::api(429, "TooManyRequests", "slow down").is_transient());
        assert!(ProviderError::api(503, "ServiceUnavailable", "try later").is_transient());
        assert!(ProviderError::Transport("reset".to_string()).is_transient());
        assert!(!ProviderError::api(403, "AuthorizationFailed", "denied").is_transient());
        assert!(!ProviderError::Cancelled.is_transient());
    }

    #[test]
    fn test_provider_error_keeps_context() {
        let err = KubeError::provider(
            ProviderOperation::Delete,
            "aks-prod",
            "rg-prod",
            ProviderError::api(409, "Conflict", "operation in progress"),
        );
        let message = err.to_string();
        assert!(message.contains("delete"));
        assert!(message.contains("aks-prod"));
        assert!(message.contains("rg-prod"));
        assert!(message.contains("operation in progress"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_cancellation_is_not_a_provider_failure() {
        let err = KubeError::provider(
            ProviderOperation::CreateOrUpdate,
            "aks-prod",
            "rg-prod",
            ProviderError::Cancelled,
        );
        assert!(matches!(err, KubeError::Cancelled(_)));

        let err = KubeError::provider(
            ProviderOperation::Get,
            "aks-prod",
            "rg-prod",
            ProviderError::Timeout("deadline exceeded".to_string()),
        );
        assert!(matches!(err, KubeError::Timeout(_)));
        assert!(err.is_retryable());
    }
}
