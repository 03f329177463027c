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

//! Manifest boundary: the only place a specification's shape is checked at
//! runtime. Everything past [`SpecManifest::into_cluster_spec`] works on a
//! typed [`ClusterSpec`].

use crate::domain::config::cluster::ClusterSpec;
use crate::shared::error::{KubeError, Result};
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;

pub const MANAGED_CLUSTER_KIND: &str = "ManagedCluster";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecManifest {
    pub kind: String,
    #[serde(default)]
    pub spec: serde_yaml::Value,
}

impl SpecManifest {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a manifest from a YAML file
    pub fn from_file<T: AsRef<str>>(path: T) -> Result<Self> {
        let content = read_to_string(path.as_ref()).map_err(|e| {
            KubeError::config_error(format!("Failed to read manifest {}: {}", path.as_ref(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn into_cluster_spec(self) -> Result<ClusterSpec> {
        if self.kind != MANAGED_CLUSTER_KIND {
            return Err(KubeError::ValidationError(format!(
                "expected managed cluster specification, got kind '{}'",
                self.kind
            )));
        }

        serde_yaml::from_value(self.spec).map_err(|e| {
            KubeError::ValidationError(format!("invalid managed cluster specification: {}", e))
        })
    }
}

impl From<&ClusterSpec> for SpecManifest {
    fn from(spec: &ClusterSpec) -> Self {
        Self {
            kind: MANAGED_CLUSTER_KIND.to_string(),
            spec: serde_yaml::to_value(spec).unwrap_or(serde_yaml::Value::Null),
        }
    }
}
