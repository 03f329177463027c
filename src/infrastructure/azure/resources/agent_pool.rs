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

use crate::domain::config::PoolSpec;
use crate::infrastructure::azure::models::{AgentPoolProfile, AgentPoolType};
use crate::shared::error::KubeError;

pub struct AgentPoolProfileBuilder<'a> {
    pools: &'a [PoolSpec],
}

impl<'a> AgentPoolProfileBuilder<'a> {
    pub fn new(pools: &'a [PoolSpec]) -> Self {
        Self { pools }
    }

    /// One scale-set backed profile per pool, in input order. Duplicate names
    /// are passed through for the provider to judge.
    pub fn build(&self) -> Result<Vec<AgentPoolProfile>, KubeError> {
        self.pools.iter().map(Self::build_profile).collect()
    }

    fn build_profile(pool: &PoolSpec) -> Result<AgentPoolProfile, KubeError> {
        Ok(AgentPoolProfile {
            name: pool.name.clone(),
            count: to_int32(&pool.name, "replicas", pool.replicas)?,
            vm_size: pool.sku.clone(),
            os_disk_size_gb: to_int32(&pool.name, "osDiskSizeGB", pool.os_disk_size_gb)?,
            pool_type: AgentPoolType::VirtualMachineScaleSets,
            ..Default::default()
        })
    }
}

fn to_int32(pool: &str, field: &str, value: u32) -> Result<i32, KubeError> {
    i32::try_from(value).map_err(|_| {
        KubeError::ValidationError(format!(
            "agent pool '{}': {} {} exceeds the provider's 32-bit limit",
            pool, field, value
        ))
    })
}
