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

//! Connection settings for the Azure Resource Manager provider.

use crate::infrastructure::constants::{
    ARM_API_VERSION, ARM_ENDPOINT, CONFIG_FILE_ENV, DEFAULT_TOKEN_ENV, SUBSCRIPTION_ID_ENV,
};
use crate::shared::error::{KubeError, Result};
use crate::shared::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    pub subscription_id: String,
    pub endpoint: String,
    pub api_version: String,
    /// Environment variable holding the bearer token for ARM requests.
    pub token_env: String,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub operation_timeout_secs: u64,
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            endpoint: ARM_ENDPOINT.to_string(),
            api_version: ARM_API_VERSION.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            request_timeout_secs: 60,
            poll_interval_secs: 10,
            operation_timeout_secs: 1800,
            retry: RetryConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from TOML file
    pub fn from<T: AsRef<str>>(path: T) -> Result<Self> {
        let content = read_to_string(path.as_ref()).map_err(|e| {
            KubeError::config_error(format!("Failed to read config file {}: {}", path.as_ref(), e))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Explicit path first, then `AKS_KUBE_CONFIG`, then defaults. The
    /// subscription falls back to `AZURE_SUBSCRIPTION_ID` when unset.
    pub fn resolve(path: Option<&str>, subscription_id: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from(path)?,
            None => match std::env::var(CONFIG_FILE_ENV) {
                Ok(env_path) if !env_path.is_empty() => Self::from(&env_path)?,
                _ => Self::default(),
            },
        };

        if let Some(id) = subscription_id {
            config.subscription_id = id.to_string();
        } else if config.subscription_id.is_empty() {
            if let Ok(id) = std::env::var(SUBSCRIPTION_ID_ENV) {
                config.subscription_id = id;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.subscription_id.trim().is_empty() {
            return Err(KubeError::ConfigError(format!(
                "subscription_id is required (set it in the config file, pass --subscription or export {})",
                SUBSCRIPTION_ID_ENV
            )));
        }

        if self.endpoint.is_empty() || self.api_version.is_empty() {
            return Err(KubeError::config_error(
                "endpoint and api_version must not be empty",
            ));
        }

        if self.request_timeout_secs == 0
            || self.poll_interval_secs == 0
            || self.operation_timeout_secs == 0
        {
            return Err(KubeError::config_error("timeouts and intervals must be > 0"));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}
