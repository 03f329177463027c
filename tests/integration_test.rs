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


#[cfg(test)]
mod tests {
    use aks_kube::domain::config::PoolSpec;
    use aks_kube::shared::{retry_transient, RetryConfig};
    use aks_kube::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    const KUBECONFIG: &str = "apiVersion: v1\nkind: Config\nclusters: []\n";

    /// Provider double that keeps clusters in memory and counts every call.
    #[derive(Clone, Default)]
    struct InMemoryProvider {
        clusters: Arc<Mutex<HashMap<(String, String), ManagedCluster>>>,
        calls: Arc<AtomicUsize>,
        delay: Option<Duration>,
    }

    impl InMemoryProvider {
        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn stored(&self, resource_group: &str, name: &str) -> Option<ManagedCluster> {
            self.clusters
                .lock()
                .unwrap()
                .get(&(resource_group.to_string(), name.to_string()))
                .cloned()
        }

        async fn enter(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait::async_trait]
    impl ManagedClusterClient for InMemoryProvider {
        async fn get(&self, resource_group: &str, name: &str) -> Result<ManagedCluster, ProviderError> {
            self.enter().await;
            self.stored(resource_group, name)
                .ok_or_else(|| ProviderError::NotFound(name.to_string()))
        }

        async fn create_or_update(
            &self,
            resource_group: &str,
            name: &str,
            cluster: &ManagedCluster,
        ) -> Result<(), ProviderError> {
            self.enter().await;
            let mut stored = cluster.clone();
            stored.name = Some(name.to_string());
            stored.properties.provisioning_state = Some("Succeeded".to_string());
            self.clusters
                .lock()
                .unwrap()
                .insert((resource_group.to_string(), name.to_string()), stored);
            Ok(())
        }

        async fn delete(&self, resource_group: &str, name: &str) -> Result<(), ProviderError> {
            self.enter().await;
            self.clusters
                .lock()
                .unwrap()
                .remove(&(resource_group.to_string(), name.to_string()))
                .map(|_| ())
                .ok_or_else(|| ProviderError::NotFound(name.to_string()))
        }

        async fn get_credentials(&self, resource_group: &str, name: &str) -> Result<Vec<u8>, ProviderError> {
            self.enter().await;
            self.stored(resource_group, name)
                .map(|_| KUBECONFIG.as_bytes().to_vec())
                .ok_or_else(|| ProviderError::NotFound(name.to_string()))
        }
    }

    fn create_test_spec() -> ClusterSpec {
        let mut spec = ClusterSpec::reference("rg-test", "aks-test");
        spec.location = "eastus".to_string();
        spec.version = "1.17.3".to_string();
        spec.ssh_public_key = "ssh-rsa AAAA".to_string();
        spec.service_cidr = Some("10.0.0.0/16".to_string());
        spec.tags.insert("env".to_string(), "test".to_string());
        spec.agent_pools = vec![
            PoolSpec::new("system", "Standard_D2s_v3", 3, 30),
            PoolSpec::new("user", "Standard_D4s_v3", 2, 100),
        ];
        spec
    }

    fn reconciler_with(provider: &InMemoryProvider) -> ManagedClusterReconciler {
        ManagedClusterReconciler::with_client(Box::new(provider.clone()))
    }

    #[tokio::test]
    async fn test_cluster_lifecycle() {
        let provider = InMemoryProvider::default();
        let reconciler = reconciler_with(&provider);
        let ctx = OperationContext::new();
        let spec = create_test_spec();

        // Absent
        assert!(reconciler.get(&ctx, &spec).await.unwrap_err().is_not_found());

        // Present
        reconciler.reconcile(&ctx, &spec).await.unwrap();
        let cluster = reconciler.get(&ctx, &spec).await.unwrap();
        assert_eq!(cluster.properties.kubernetes_version, "1.17.3");
        assert_eq!(cluster.properties.dns_prefix, "aks-test");
        assert_eq!(cluster.properties.agent_pool_profiles.len(), 2);
        assert_eq!(cluster.tags.get("env").map(String::as_str), Some("test"));

        // Absent again, and deleting twice is fine
        reconciler.delete(&ctx, &spec).await.unwrap();
        assert!(reconciler.get(&ctx, &spec).await.unwrap_err().is_not_found());
        reconciler.delete(&ctx, &spec).await.unwrap();
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let provider = InMemoryProvider::default();
        let reconciler = reconciler_with(&provider);
        let ctx = OperationContext::new();
        let spec = create_test_spec();

        reconciler.reconcile(&ctx, &spec).await.unwrap();
        let first = provider.stored("rg-test", "aks-test").unwrap();
        reconciler.reconcile(&ctx, &spec).await.unwrap();
        let second = provider.stored("rg-test", "aks-test").unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_reconcile_applies_scale_change() {
        let provider = InMemoryProvider::default();
        let reconciler = reconciler_with(&provider);
        let ctx = OperationContext::new();
        let mut spec = create_test_spec();

        reconciler.reconcile(&ctx, &spec).await.unwrap();
        spec.agent_pools[1].replicas = 5;
        reconciler.reconcile(&ctx, &spec).await.unwrap();

        let cluster = provider.stored("rg-test", "aks-test").unwrap();
        let counts: Vec<i32> = cluster
            .properties
            .agent_pool_profiles
            .iter()
            .map(|p| p.count)
            .collect();
        assert_eq!(counts, vec![3, 5]);
    }

    #[tokio::test]
    async fn test_invalid_spec_makes_no_provider_call() {
        let provider = InMemoryProvider::default();
        let reconciler = reconciler_with(&provider);
        let ctx = OperationContext::new();

        let mut bad_cidr = create_test_spec();
        bad_cidr.service_cidr = Some("not-a-cidr".to_string());
        assert!(reconciler.reconcile(&ctx, &bad_cidr).await.unwrap_err().is_validation());

        let mut bad_policy = create_test_spec();
        bad_policy.network_policy = Some("weave".to_string());
        assert!(reconciler.reconcile(&ctx, &bad_policy).await.unwrap_err().is_validation());

        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_kind_manifest_is_rejected() {
        let provider = InMemoryProvider::default();
        let reconciler = reconciler_with(&provider);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"kind: AzureCluster\nspec:\n  name: aks-test\n  resourceGroup: rg-test\n")
            .unwrap();

        let result = match SpecManifest::from_file(file.path().to_str().unwrap())
            .and_then(SpecManifest::into_cluster_spec)
        {
            Ok(spec) => reconciler.reconcile(&OperationContext::new(), &spec).await,
            Err(e) => Err(e),
        };

        let err = result.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("AzureCluster"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_credentials_follow_cluster_state() {
        let provider = InMemoryProvider::default();
        let reconciler = reconciler_with(&provider);
        let ctx = OperationContext::new();

        let err = reconciler
            .get_credentials(&ctx, "rg-test", "aks-test")
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::Provider { .. }));

        reconciler.reconcile(&ctx, &create_test_spec()).await.unwrap();
        let bytes = reconciler
            .get_credentials(&ctx, "rg-test", "aks-test")
            .await
            .unwrap();
        assert_eq!(bytes, KUBECONFIG.as_bytes());
    }

    #[tokio::test]
    async fn test_deadline_surfaces_as_timeout() {
        let provider = InMemoryProvider::slow(Duration::from_millis(500));
        let reconciler = reconciler_with(&provider);
        let ctx = OperationContext::new().with_timeout(Duration::from_millis(20));

        let err = reconciler.reconcile(&ctx, &create_test_spec()).await.unwrap_err();
        assert!(matches!(err, KubeError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_expired_deadline_is_not_retried() {
        let provider = InMemoryProvider::slow(Duration::from_millis(200));
        let reconciler = reconciler_with(&provider);
        let ctx = OperationContext::new().with_timeout(Duration::from_millis(20));
        let spec = create_test_spec();
        let retry = RetryConfig {
            max_times: 3,
            min_delay_ms: 1,
            max_delay_ms: 2,
        };

        let (reconciler, ctx_ref, spec_ref) = (&reconciler, &ctx, &spec);
        let err = retry_transient(ctx_ref, &retry, "reconcile", move || {
            reconciler.reconcile(ctx_ref, spec_ref)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, KubeError::Timeout(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_in_flight_call() {
        let provider = InMemoryProvider::slow(Duration::from_millis(500));
        let reconciler = reconciler_with(&provider);
        let token = CancellationToken::new();
        let ctx = OperationContext::new().with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = reconciler.delete(&ctx, &create_test_spec()).await.unwrap_err();
        assert!(matches!(err, KubeError::Cancelled(_)));
        canceller.await.unwrap();
    }

    #[test]
    fn test_provider_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"subscription_id = \"00000000-0000-0000-0000-000000000000\"\npoll_interval_secs = 5\n\n[retry]\nmax_times = 1\n",
        )
        .unwrap();

        let config = ProviderConfig::resolve(Some(file.path().to_str().unwrap()), None).unwrap();
        assert_eq!(config.subscription_id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.retry.max_times, 1);
        assert_eq!(config.api_version, "2020-02-01");
    }
}
