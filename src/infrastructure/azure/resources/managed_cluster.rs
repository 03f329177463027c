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

use crate::domain::config::ClusterSpec;
use crate::infrastructure::azure::models::{
    IdentityType, LinuxProfile, ManagedCluster, ManagedClusterIdentity, ManagedClusterProperties,
    ServicePrincipalProfile, SshConfiguration, SshPublicKey,
};
use crate::infrastructure::azure::resources::{AgentPoolProfileBuilder, NetworkProfileBuilder};
use crate::infrastructure::constants::{DEFAULT_ADMIN_USERNAME, MANAGED_IDENTITY_CLIENT_ID};
use crate::shared::error::KubeError;

/// Fixed values every derived cluster carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationDefaults {
    pub admin_username: String,
    pub service_principal_client_id: String,
    pub identity_type: IdentityType,
}

impl Default for DerivationDefaults {
    fn default() -> Self {
        Self {
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            service_principal_client_id: MANAGED_IDENTITY_CLIENT_ID.to_string(),
            identity_type: IdentityType::SystemAssigned,
        }
    }
}

/// Expands a [`ClusterSpec`] into the complete provider resource.
///
/// The build either succeeds as a whole or fails with a validation error;
/// nothing partially derived is returned.
pub struct ManagedClusterBuilder<'a> {
    spec: &'a ClusterSpec,
    defaults: DerivationDefaults,
}

impl<'a> ManagedClusterBuilder<'a> {
    pub fn new(spec: &'a ClusterSpec) -> Self {
        Self {
            spec,
            defaults: DerivationDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: DerivationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(&self) -> Result<ManagedCluster, KubeError> {
        let network_profile = NetworkProfileBuilder::new(self.spec).build()?;
        let agent_pool_profiles = AgentPoolProfileBuilder::new(&self.spec.agent_pools).build()?;

        Ok(ManagedCluster {
            location: self.spec.location.clone(),
            tags: self.spec.tags.clone(),
            identity: Some(ManagedClusterIdentity {
                identity_type: self.defaults.identity_type,
                ..Default::default()
            }),
            properties: ManagedClusterProperties {
                dns_prefix: self.spec.name.clone(),
                kubernetes_version: self.spec.version.clone(),
                linux_profile: Some(self.build_linux_profile()),
                service_principal_profile: Some(ServicePrincipalProfile {
                    client_id: self.defaults.service_principal_client_id.clone(),
                }),
                agent_pool_profiles,
                network_profile: Some(network_profile),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn build_linux_profile(&self) -> LinuxProfile {
        // The key is passed through as-is, empty included.
        LinuxProfile {
            admin_username: self.defaults.admin_username.clone(),
            ssh: SshConfiguration {
                public_keys: vec![SshPublicKey {
                    key_data: self.spec.ssh_public_key.clone(),
                }],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::PoolSpec;
    use crate::infrastructure::azure::models::{LoadBalancerSkuType, NetworkPluginType};

    fn full_spec() -> ClusterSpec {
        let mut spec = ClusterSpec::reference("rg-prod", "aks-prod");
        spec.location = "westus2".to_string();
        spec.version = "1.17.3".to_string();
        spec.ssh_public_key = "ssh-rsa AAAAB3Nza".to_string();
        spec.tags.insert("team".to_string(), "platform".to_string());
        spec.service_cidr = Some("10.96.0.0/12".to_string());
        spec.network_policy = Some("Calico".to_string());
        spec.agent_pools = vec![
            PoolSpec::new("pool-a", "Standard_D2s_v3", 3, 30),
            PoolSpec::new("pool-b", "Standard_D4s_v3", 2, 64),
        ];
        spec
    }

    #[test]
    fn test_fixed_blocks() {
        let cluster = ManagedClusterBuilder::new(&full_spec()).build().unwrap();

        assert_eq!(cluster.location, "westus2");
        assert_eq!(cluster.tags.get("team").map(String::as_str), Some("platform"));
        assert_eq!(
            cluster.identity.as_ref().map(|i| i.identity_type),
            Some(IdentityType::SystemAssigned)
        );

        let props = &cluster.properties;
        assert_eq!(props.dns_prefix, "aks-prod");
        assert_eq!(props.kubernetes_version, "1.17.3");

        let linux = props.linux_profile.as_ref().unwrap();
        assert_eq!(linux.admin_username, "azureuser");
        assert_eq!(linux.ssh.public_keys[0].key_data, "ssh-rsa AAAAB3Nza");
        assert_eq!(
            props.service_principal_profile.as_ref().unwrap().client_id,
            "msi"
        );
    }

    #[test]
    fn test_pools_and_network_combined() {
        let cluster = ManagedClusterBuilder::new(&full_spec()).build().unwrap();
        let names: Vec<&str> = cluster
            .properties
            .agent_pool_profiles
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["pool-a", "pool-b"]);

        let network = cluster.properties.network_profile.unwrap();
        assert_eq!(network.network_plugin, NetworkPluginType::Azure);
        assert_eq!(network.load_balancer_sku, LoadBalancerSkuType::Standard);
        assert_eq!(network.dns_service_ip.as_deref(), Some("10.96.0.10"));
    }

    #[test]
    fn test_empty_ssh_key_passes_through() {
        let mut spec = full_spec();
        spec.ssh_public_key = String::new();
        let cluster = ManagedClusterBuilder::new(&spec).build().unwrap();
        assert_eq!(
            cluster.properties.linux_profile.unwrap().ssh.public_keys[0].key_data,
            ""
        );
    }

    #[test]
    fn test_validation_failure_aborts_whole_build() {
        let mut spec = full_spec();
        spec.network_policy = Some("weave".to_string());
        assert!(ManagedClusterBuilder::new(&spec).build().unwrap_err().is_validation());

        let mut spec = full_spec();
        spec.service_cidr = Some("10.96.0.0/33".to_string());
        assert!(ManagedClusterBuilder::new(&spec).build().unwrap_err().is_validation());
    }

    #[test]
    fn test_custom_defaults() {
        let defaults = DerivationDefaults {
            admin_username: "ops".to_string(),
            ..Default::default()
        };
        let cluster = ManagedClusterBuilder::new(&full_spec())
            .with_defaults(defaults)
            .build()
            .unwrap();
        assert_eq!(cluster.properties.linux_profile.unwrap().admin_username, "ops");
    }

    #[test]
    fn test_spec_is_not_modified() {
        let spec = full_spec();
        let before = spec.clone();
        let _ = ManagedClusterBuilder::new(&spec).build().unwrap();
        assert_eq!(spec, before);
    }

    #[test]
    fn test_serialized_request_shape() {
        let cluster = ManagedClusterBuilder::new(&full_spec()).build().unwrap();
        let body = serde_json::to_value(&cluster).unwrap();

        assert_eq!(body["identity"]["type"], "SystemAssigned");
        assert_eq!(body["properties"]["linuxProfile"]["adminUsername"], "azureuser");
        assert_eq!(body["properties"]["servicePrincipalProfile"]["clientId"], "msi");
        assert_eq!(body["properties"]["networkProfile"]["networkPolicy"], "calico");
        assert_eq!(body["properties"]["agentPoolProfiles"][1]["osDiskSizeGB"], 64);
        assert!(body.get("id").is_none());
        assert!(body["properties"].get("provisioningState").is_none());
    }
}
