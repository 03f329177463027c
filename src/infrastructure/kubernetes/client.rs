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

//! Access to the workload cluster through the kubeconfig the provider issues.

use crate::infrastructure::constants::{LABEL_AGENT_POOL, LABEL_AGENT_POOL_LEGACY};
use crate::shared::error::KubeError;
use k8s_openapi::api::core::v1::Node;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};

#[async_trait::async_trait]
pub trait WorkloadKubeClient: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>, KubeError>;
}

pub struct WorkloadKubeClientImpl {
    client: Client,
}

impl WorkloadKubeClientImpl {
    /// Build a client from raw kubeconfig bytes, using the current context.
    pub async fn from_kubeconfig_bytes(kubeconfig: &[u8]) -> Result<Self, KubeError> {
        let kubeconfig = parse_kubeconfig(kubeconfig)?;

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                KubeError::KubeError(format!("Failed to create Kubernetes config: {}", e))
            })?;

        let client = Client::try_from(config).map_err(|e| {
            KubeError::KubeError(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl WorkloadKubeClient for WorkloadKubeClientImpl {
    async fn list_nodes(&self) -> Result<Vec<Node>, KubeError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&Default::default()).await?;
        Ok(nodes.items)
    }
}

/// Checks that credential bytes are a usable kubeconfig.
pub fn parse_kubeconfig(kubeconfig: &[u8]) -> Result<Kubeconfig, KubeError> {
    let content = std::str::from_utf8(kubeconfig)
        .map_err(|e| KubeError::KubeError(format!("Kubeconfig is not UTF-8: {}", e)))?;

    let parsed = Kubeconfig::from_yaml(content)
        .map_err(|e| KubeError::KubeError(format!("Failed to parse kubeconfig: {}", e)))?;

    if parsed.clusters.is_empty() {
        return Err(KubeError::KubeError(
            "Kubeconfig does not define any cluster".to_string(),
        ));
    }

    Ok(parsed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub pool: Option<String>,
    pub ready: bool,
    pub kubelet_version: Option<String>,
}

impl From<&Node> for NodeInfo {
    fn from(node: &Node) -> Self {
        let labels = node.metadata.labels.as_ref();
        let pool = labels
            .and_then(|l| l.get(LABEL_AGENT_POOL).or_else(|| l.get(LABEL_AGENT_POOL_LEGACY)))
            .cloned();

        let status = node.status.as_ref();
        let ready = status
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            })
            .unwrap_or(false);

        let kubelet_version = status
            .and_then(|s| s.node_info.as_ref())
            .map(|info| info.kubelet_version.clone());

        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            pool,
            ready,
            kubelet_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeCondition, NodeStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: aks-dev
  cluster:
    server: https://aks-dev.hcp.westus2.azmk8s.io:443
contexts:
- name: aks-dev-admin
  context:
    cluster: aks-dev
    user: clusterAdmin
current-context: aks-dev-admin
users:
- name: clusterAdmin
  user:
    token: abc
"#;

    #[test]
    fn test_parse_kubeconfig() {
        let parsed = parse_kubeconfig(KUBECONFIG.as_bytes()).unwrap();
        assert_eq!(parsed.current_context.as_deref(), Some("aks-dev-admin"));
        assert!(parse_kubeconfig(b"not: [valid").is_err());
        assert!(parse_kubeconfig(b"apiVersion: v1\nkind: Config\n").is_err());
    }

    #[test]
    fn test_node_info_from_node() {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_AGENT_POOL.to_string(), "pool0".to_string());

        let node = Node {
            metadata: ObjectMeta {
                name: Some("aks-pool0-123-vmss000000".to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let info = NodeInfo::from(&node);
        assert_eq!(info.name, "aks-pool0-123-vmss000000");
        assert_eq!(info.pool.as_deref(), Some("pool0"));
        assert!(info.ready);
        assert_eq!(info.kubelet_version, None);
    }

    #[test]
    fn test_node_without_status_is_not_ready() {
        let info = NodeInfo::from(&Node::default());
        assert!(!info.ready);
        assert_eq!(info.pool, None);
    }
}
