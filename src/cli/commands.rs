// CLI command definitions

use super::aks::{ApplyCommand, CredentialsCommand, DeleteCommand, GetCommand, NodesCommand};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "aks-kube",
    version,
    about = "Reconcile managed Kubernetes clusters on Azure",
    long_about = "A standalone CLI tool for creating, inspecting and deleting AKS managed clusters from declarative manifests"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Create or update a managed cluster from a manifest
    Apply(ApplyCommand),

    /// Show a managed cluster
    Get(GetCommand),

    /// Delete a managed cluster (succeeds if it is already gone)
    Delete(DeleteCommand),

    /// Fetch the admin kubeconfig of a managed cluster
    Credentials(CredentialsCommand),

    /// List workload nodes grouped by agent pool
    Nodes(NodesCommand),
}
