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

use crate::domain::cluster::context::OperationContext;
use crate::domain::config::{ClusterSpec, ProviderConfig};
use crate::infrastructure::azure::client::{ArmManagedClusterClient, ManagedClusterClient};
use crate::infrastructure::azure::models::ManagedCluster;
use crate::infrastructure::azure::resources::ManagedClusterBuilder;
use crate::infrastructure::constants::MANAGED_CLUSTER_RESOURCE_TYPE;
use crate::shared::error::{KubeError, ProviderError, ProviderOperation, Result};
use tracing::{debug, info};

/// Drives managed cluster specifications to the provider.
///
/// Holds no state between calls. Concurrent calls for the same cluster are
/// not serialized here; callers that need one in-flight operation per
/// cluster must arrange that themselves.
pub struct ManagedClusterReconciler {
    client: Box<dyn ManagedClusterClient>,
}

impl ManagedClusterReconciler {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = ArmManagedClusterClient::new(config)?;
        Ok(Self::with_client(Box::new(client)))
    }

    pub fn with_client(client: Box<dyn ManagedClusterClient>) -> Self {
        Self { client }
    }

    /// The resource a reconcile would submit, without contacting the provider.
    pub fn render(spec: &ClusterSpec) -> Result<ManagedCluster> {
        ManagedClusterBuilder::new(spec).build()
    }

    pub async fn get(&self, ctx: &OperationContext, spec: &ClusterSpec) -> Result<ManagedCluster> {
        debug!(cluster = %spec.name, resource_group = %spec.resource_group, "Getting managed cluster");

        ctx.run(async { self.client.get(&spec.resource_group, &spec.name).await })
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    KubeError::not_found(
                        MANAGED_CLUSTER_RESOURCE_TYPE,
                        &spec.name,
                        &spec.resource_group,
                    )
                } else {
                    wrap(ProviderOperation::Get, spec, e)
                }
            })
    }

    /// Raw kubeconfig bytes; not cached and not interpreted.
    pub async fn get_credentials(
        &self,
        ctx: &OperationContext,
        resource_group: &str,
        name: &str,
    ) -> Result<Vec<u8>> {
        debug!(cluster = %name, resource_group = %resource_group, "Getting managed cluster credentials");

        ctx.run(async { self.client.get_credentials(resource_group, name).await })
            .await
            .map_err(|e| KubeError::provider(ProviderOperation::GetCredentials, name, resource_group, e))
    }

    /// Idempotently creates or updates the managed cluster.
    ///
    /// Derivation runs first, so a validation error never reaches the
    /// provider. A failure after submission leaves the resource in whatever
    /// state the provider left it.
    pub async fn reconcile(&self, ctx: &OperationContext, spec: &ClusterSpec) -> Result<()> {
        let cluster = Self::render(spec)?;

        debug!(
            cluster = %spec.name,
            resource_group = %spec.resource_group,
            agent_pools = cluster.properties.agent_pool_profiles.len(),
            "Creating or updating managed cluster"
        );

        ctx.run(async {
            self.client
                .create_or_update(&spec.resource_group, &spec.name, &cluster)
                .await
        })
        .await
        .map_err(|e| wrap(ProviderOperation::CreateOrUpdate, spec, e))?;

        info!(cluster = %spec.name, resource_group = %spec.resource_group, "Reconciled managed cluster");
        Ok(())
    }

    /// Deletes the managed cluster. A cluster that is already gone counts as
    /// deleted.
    pub async fn delete(&self, ctx: &OperationContext, spec: &ClusterSpec) -> Result<()> {
        debug!(cluster = %spec.name, resource_group = %spec.resource_group, "Deleting managed cluster");

        match ctx
            .run(async { self.client.delete(&spec.resource_group, &spec.name).await })
            .await
        {
            Ok(()) => {
                info!(cluster = %spec.name, resource_group = %spec.resource_group, "Successfully deleted managed cluster");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(cluster = %spec.name, resource_group = %spec.resource_group, "Managed cluster already deleted");
                Ok(())
            }
            Err(e) => Err(wrap(ProviderOperation::Delete, spec, e)),
        }
    }
}

fn wrap(operation: ProviderOperation, spec: &ClusterSpec, err: ProviderError) -> KubeError {
    KubeError::provider(operation, &spec.name, &spec.resource_group, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::PoolSpec;
    use crate::infrastructure::azure::client::MockManagedClusterClient;
    use crate::infrastructure::azure::models::NetworkPolicy;
    use mockall::predicate::eq;
    use tokio_util::sync::CancellationToken;

    fn spec() -> ClusterSpec {
        let mut spec = ClusterSpec::reference("rg-dev", "aks-dev");
        spec.location = "westus2".to_string();
        spec.version = "1.17.3".to_string();
        spec.ssh_public_key = "ssh-rsa AAAA".to_string();
        spec.service_cidr = Some("10.96.0.0/12".to_string());
        spec.agent_pools = vec![
            PoolSpec::new("pool-a", "Standard_D2s_v3", 3, 30),
            PoolSpec::new("pool-b", "Standard_D2s_v3", 1, 30),
        ];
        spec
    }

    fn reconciler(client: MockManagedClusterClient) -> ManagedClusterReconciler {
        ManagedClusterReconciler::with_client(Box::new(client))
    }

    // ==========================================================================
    // Reconcile
    // ==========================================================================

    #[tokio::test]
    async fn test_reconcile_submits_derived_resource() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_create_or_update()
            .withf(|rg, name, cluster| {
                let network = cluster.properties.network_profile.as_ref().unwrap();
                rg == "rg-dev"
                    && name == "aks-dev"
                    && cluster.properties.dns_prefix == "aks-dev"
                    && network.dns_service_ip.as_deref() == Some("10.96.0.10")
                    && cluster.properties.agent_pool_profiles.len() == 2
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let result = reconciler(client)
            .reconcile(&OperationContext::new(), &spec())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_reconcile_twice_submits_same_resource() {
        let expected = ManagedClusterReconciler::render(&spec()).unwrap();

        let mut client = MockManagedClusterClient::new();
        client
            .expect_create_or_update()
            .withf(move |_, _, cluster| *cluster == expected)
            .times(2)
            .returning(|_, _, _| Ok(()));

        let reconciler = reconciler(client);
        let ctx = OperationContext::new();
        reconciler.reconcile(&ctx, &spec()).await.unwrap();
        reconciler.reconcile(&ctx, &spec()).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_cidr_never_reaches_provider() {
        // No expectations: any provider call fails the test.
        let client = MockManagedClusterClient::new();
        let mut spec = spec();
        spec.service_cidr = Some("not-a-cidr".to_string());

        let err = reconciler(client)
            .reconcile(&OperationContext::new(), &spec)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_invalid_network_policy_never_reaches_provider() {
        let client = MockManagedClusterClient::new();
        let mut spec = spec();
        spec.network_policy = Some("weave".to_string());

        let err = reconciler(client)
            .reconcile(&OperationContext::new(), &spec)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("'calico' and 'azure'"));
    }

    #[tokio::test]
    async fn test_reconcile_network_policy_mapping() {
        for (input, expected) in [("Azure", NetworkPolicy::Azure), ("calico", NetworkPolicy::Calico)] {
            let mut client = MockManagedClusterClient::new();
            client
                .expect_create_or_update()
                .withf(move |_, _, cluster| {
                    cluster
                        .properties
                        .network_profile
                        .as_ref()
                        .and_then(|n| n.network_policy)
                        == Some(expected)
                })
                .times(1)
                .returning(|_, _, _| Ok(()));

            let mut spec = spec();
            spec.network_policy = Some(input.to_string());
            reconciler(client)
                .reconcile(&OperationContext::new(), &spec)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_reconcile_provider_error_is_wrapped() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_create_or_update()
            .returning(|_, _, _| Err(ProviderError::api(403, "AuthorizationFailed", "no access")));

        let err = reconciler(client)
            .reconcile(&OperationContext::new(), &spec())
            .await
            .unwrap_err();

        match &err {
            KubeError::Provider {
                operation,
                name,
                resource_group,
                source,
            } => {
                assert_eq!(*operation, ProviderOperation::CreateOrUpdate);
                assert_eq!(name, "aks-dev");
                assert_eq!(resource_group, "rg-dev");
                assert_eq!(source, &ProviderError::api(403, "AuthorizationFailed", "no access"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("no access"));
    }

    // ==========================================================================
    // Get / GetCredentials
    // ==========================================================================

    #[tokio::test]
    async fn test_get_uses_identifying_fields() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_get()
            .with(eq("rg-dev"), eq("aks-dev"))
            .times(1)
            .returning(|_, _| {
                Ok(ManagedCluster {
                    name: Some("aks-dev".to_string()),
                    ..Default::default()
                })
            });

        // Invalid derivation inputs do not matter for get.
        let mut spec = spec();
        spec.service_cidr = Some("not-a-cidr".to_string());

        let cluster = reconciler(client)
            .get(&OperationContext::new(), &spec)
            .await
            .unwrap();
        assert_eq!(cluster.name.as_deref(), Some("aks-dev"));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_get()
            .returning(|_, _| Err(ProviderError::NotFound("gone".to_string())));

        let err = reconciler(client)
            .get(&OperationContext::new(), &spec())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_credentials_passthrough() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_get_credentials()
            .with(eq("rg-dev"), eq("aks-dev"))
            .times(1)
            .returning(|_, _| Ok(b"kubeconfig-bytes".to_vec()));

        let bytes = reconciler(client)
            .get_credentials(&OperationContext::new(), "rg-dev", "aks-dev")
            .await
            .unwrap();
        assert_eq!(bytes, b"kubeconfig-bytes");
    }

    #[tokio::test]
    async fn test_get_credentials_error_is_provider_error() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_get_credentials()
            .returning(|_, _| Err(ProviderError::Transport("connection reset".to_string())));

        let err = reconciler(client)
            .get_credentials(&OperationContext::new(), "rg-dev", "aks-dev")
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::Provider { .. }));
        assert!(err.is_retryable());
    }

    // ==========================================================================
    // Delete
    // ==========================================================================

    #[tokio::test]
    async fn test_delete_absent_cluster_succeeds() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_delete()
            .with(eq("rg-dev"), eq("aks-dev"))
            .times(1)
            .returning(|_, _| Err(ProviderError::NotFound("aks-dev".to_string())));

        let result = reconciler(client)
            .delete(&OperationContext::new(), &spec())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_failure_names_cluster() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_delete()
            .returning(|_, _| Err(ProviderError::api(409, "OperationNotAllowed", "busy")));

        let err = reconciler(client)
            .delete(&OperationContext::new(), &spec())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("aks-dev"));
        assert!(message.contains("rg-dev"));
        assert!(message.contains("delete"));
    }

    // ==========================================================================
    // Cancellation
    // ==========================================================================

    #[tokio::test]
    async fn test_cancelled_context_makes_no_call() {
        let client = MockManagedClusterClient::new();
        let token = CancellationToken::new();
        token.cancel();
        let ctx = OperationContext::new().with_cancellation(token);
        let reconciler = reconciler(client);

        assert!(matches!(
            reconciler.reconcile(&ctx, &spec()).await,
            Err(KubeError::Cancelled(_))
        ));
        assert!(matches!(
            reconciler.delete(&ctx, &spec()).await,
            Err(KubeError::Cancelled(_))
        ));
        assert!(matches!(
            reconciler.get(&ctx, &spec()).await,
            Err(KubeError::Cancelled(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_cancellation_is_surfaced() {
        let mut client = MockManagedClusterClient::new();
        client
            .expect_delete()
            .returning(|_, _| Err(ProviderError::Cancelled));

        let err = reconciler(client)
            .delete(&OperationContext::new(), &spec())
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::Cancelled(_)));
    }
}
