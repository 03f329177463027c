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

//! Desired state of a managed cluster and its agent pools.

use crate::shared::error::KubeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub name: String,
    pub resource_group: String,
    /// Canonical Azure region name, e.g. "westus2".
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, rename = "loadBalancerSKU")]
    pub load_balancer_sku: Option<LoadBalancerSku>,
    #[serde(default)]
    pub network_plugin: Option<NetworkPlugin>,
    /// Checked during derivation; only "azure" and "calico" are accepted.
    #[serde(default)]
    pub network_policy: Option<String>,
    #[serde(default)]
    pub ssh_public_key: String,
    #[serde(default, rename = "podCIDR")]
    pub pod_cidr: Option<String>,
    #[serde(default, rename = "serviceCIDR")]
    pub service_cidr: Option<String>,
    #[serde(default)]
    pub agent_pools: Vec<PoolSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSpec {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub replicas: u32,
    #[serde(rename = "osDiskSizeGB")]
    pub os_disk_size_gb: u32,
}

impl ClusterSpec {
    /// A spec carrying only the identifying fields, enough for get and delete.
    pub fn reference(resource_group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
            ..Default::default()
        }
    }

    pub fn pod_cidr(&self) -> Option<&str> {
        non_empty(self.pod_cidr.as_deref())
    }

    pub fn service_cidr(&self) -> Option<&str> {
        non_empty(self.service_cidr.as_deref())
    }

    /// An empty policy string counts as unset.
    pub fn network_policy(&self) -> Option<&str> {
        non_empty(self.network_policy.as_deref())
    }

    pub fn pool(&self, name: &str) -> Option<&PoolSpec> {
        self.agent_pools.iter().find(|p| p.name == name)
    }
}

impl PoolSpec {
    pub fn new(name: impl Into<String>, sku: impl Into<String>, replicas: u32, os_disk_size_gb: u32) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            replicas,
            os_disk_size_gb,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoadBalancerSku {
    #[default]
    Standard,
    Basic,
}

impl LoadBalancerSku {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadBalancerSku::Standard => "Standard",
            LoadBalancerSku::Basic => "Basic",
        }
    }
}

impl FromStr for LoadBalancerSku {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("standard") {
            Ok(LoadBalancerSku::Standard)
        } else if s.eq_ignore_ascii_case("basic") {
            Ok(LoadBalancerSku::Basic)
        } else {
            Err(KubeError::ValidationError(format!(
                "invalid load balancer SKU: '{}'. Allowed options are 'standard' and 'basic'",
                s
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkPlugin {
    #[default]
    Azure,
    Kubenet,
}

impl NetworkPlugin {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkPlugin::Azure => "Azure",
            NetworkPlugin::Kubenet => "Kubenet",
        }
    }
}

impl FromStr for NetworkPlugin {
    type Err = KubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("azure") {
            Ok(NetworkPlugin::Azure)
        } else if s.eq_ignore_ascii_case("kubenet") {
            Ok(NetworkPlugin::Kubenet)
        } else {
            Err(KubeError::ValidationError(format!(
                "invalid network plugin: '{}'. Allowed options are 'azure' and 'kubenet'",
                s
            )))
        }
    }
}

macro_rules! string_enum_conversions {
    ($ty:ty) => {
        impl TryFrom<String> for $ty {
            type Error = KubeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum_conversions!(LoadBalancerSku);
string_enum_conversions!(NetworkPlugin);
