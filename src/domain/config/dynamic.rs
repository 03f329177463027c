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

use crate::domain::config::cluster::{ClusterSpec, LoadBalancerSku, NetworkPlugin};
use crate::shared::error::{KubeError, Result};
use std::collections::HashMap;
use std::str::FromStr;

const TAG_PREFIX: &str = "tags.";
const POOL_PREFIX: &str = "pools.";

/// Parse `-D key=value` properties into a map.
pub fn parse_properties(properties: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for property in properties {
        let (key, value) = property.split_once('=').ok_or_else(|| {
            KubeError::ConfigError(format!(
                "Invalid property format: '{}'. Expected 'key=value'",
                property
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(KubeError::ConfigError(format!(
                "Empty key in property: '{}'",
                property
            )));
        }

        map.insert(key.to_string(), value.trim().to_string());
    }

    Ok(map)
}

/// Apply property overrides onto a freshly loaded spec.
pub fn apply_to_cluster_spec(configs: &HashMap<String, String>, spec: &mut ClusterSpec) -> Result<()> {
    // Sorted so that failures are reported deterministically.
    let mut keys: Vec<&String> = configs.keys().collect();
    keys.sort();

    for key in keys {
        let value = &configs[key];
        match key.as_str() {
            "version" => spec.version = value.clone(),
            "location" => spec.location = value.clone(),
            "ssh-public-key" => spec.ssh_public_key = value.clone(),
            "network.plugin" => {
                spec.network_plugin = Some(parse_choice::<NetworkPlugin>(key, value)?)
            }
            "network.load-balancer-sku" => {
                spec.load_balancer_sku = Some(parse_choice::<LoadBalancerSku>(key, value)?)
            }
            "network.policy" => spec.network_policy = optional(value),
            "network.pod-cidr" => spec.pod_cidr = optional(value),
            "network.service-cidr" => spec.service_cidr = optional(value),
            other if other.starts_with(TAG_PREFIX) => {
                let tag = &other[TAG_PREFIX.len()..];
                if tag.is_empty() {
                    return Err(KubeError::ConfigError(format!("Empty tag name in '{}'", other)));
                }
                spec.tags.insert(tag.to_string(), value.clone());
            }
            other if other.starts_with(POOL_PREFIX) => apply_pool_override(other, value, spec)?,
            other => {
                return Err(KubeError::ConfigError(format!(
                    "Unknown property: '{}'",
                    other
                )))
            }
        }
    }

    Ok(())
}

fn apply_pool_override(key: &str, value: &str, spec: &mut ClusterSpec) -> Result<()> {
    let rest = &key[POOL_PREFIX.len()..];
    let (pool_name, field) = rest.rsplit_once('.').ok_or_else(|| {
        KubeError::ConfigError(format!(
            "Invalid pool property '{}'. Expected pools.<name>.<field>",
            key
        ))
    })?;

    let pool = spec
        .agent_pools
        .iter_mut()
        .find(|p| p.name == pool_name)
        .ok_or_else(|| KubeError::ConfigError(format!("Unknown agent pool '{}' in '{}'", pool_name, key)))?;

    match field {
        "replicas" => pool.replicas = parse_number(key, value)?,
        "os-disk-size-gb" => pool.os_disk_size_gb = parse_number(key, value)?,
        "sku" => pool.sku = value.to_string(),
        _ => {
            return Err(KubeError::ConfigError(format!(
                "Unknown pool field '{}' in '{}'",
                field, key
            )))
        }
    }

    Ok(())
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|e| KubeError::ConfigError(format!("Invalid value '{}' for {}: {}", value, key, e)))
}

fn parse_choice<T: FromStr<Err = KubeError>>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|e| KubeError::ConfigError(format!("Invalid value for {}: {}", key, e)))
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
