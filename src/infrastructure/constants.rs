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

use std::time::Duration;

/// Linux admin profile
pub const DEFAULT_ADMIN_USERNAME: &str = "azureuser";

/// Service principal client id that tells the provider to use the cluster's
/// managed identity instead of a service principal secret.
pub const MANAGED_IDENTITY_CLIENT_ID: &str = "msi";

/// Service CIDR conventions
///
/// Kubernetes distributions reserve the `.10` host of the service range for
/// the cluster DNS service, so users only specify the range once.
pub const DNS_SERVICE_IP_HOST_OCTET: u8 = 10;
pub const MIN_SERVICE_CIDR_ADDRESSES: u128 = 16;

/// Azure Resource Manager
pub const ARM_ENDPOINT: &str = "https://management.azure.com";
pub const ARM_API_VERSION: &str = "2020-02-01";
pub const MANAGED_CLUSTER_PROVIDER: &str = "Microsoft.ContainerService/managedClusters";
pub const MANAGED_CLUSTER_RESOURCE_TYPE: &str = "ManagedCluster";
pub const ADMIN_CREDENTIAL_ACTION: &str = "listClusterAdminCredential";

/// ARM response headers
pub const HEADER_ASYNC_OPERATION: &str = "Azure-AsyncOperation";
pub const HEADER_LOCATION: &str = "Location";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Long-running operation states
pub const OPERATION_SUCCEEDED: &str = "Succeeded";
pub const OPERATION_FAILED: &str = "Failed";
pub const OPERATION_CANCELED: &str = "Canceled";

/// Lower bound between two polls of a long-running operation
pub const MIN_POLL_DELAY: Duration = Duration::from_secs(1);

/// Environment
pub const DEFAULT_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";
pub const SUBSCRIPTION_ID_ENV: &str = "AZURE_SUBSCRIPTION_ID";
pub const CONFIG_FILE_ENV: &str = "AKS_KUBE_CONFIG";

/// Node labels set by the provider on agent pool nodes
pub const LABEL_AGENT_POOL: &str = "agentpool";
pub const LABEL_AGENT_POOL_LEGACY: &str = "kubernetes.azure.com/agentpool";
