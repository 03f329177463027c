//! Managed cluster commands

use crate::cli::display::{group_nodes_by_pool, TableRenderer};
use crate::domain::cluster::{ClusterSpecValidator, ManagedClusterReconciler, OperationContext};
use crate::domain::config::{
    apply_to_cluster_spec, parse_properties, ClusterSpec, ProviderConfig, SpecManifest,
};
use crate::infrastructure::kubernetes::{
    parse_kubeconfig, NodeInfo, WorkloadKubeClient, WorkloadKubeClientImpl,
};
use crate::shared::retry::retry_transient;
use clap::{Args, Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Provider connection options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// Path to provider configuration file (TOML)
    /// If not specified, uses AKS_KUBE_CONFIG or built-in defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Azure subscription id (overrides the config file and AZURE_SUBSCRIPTION_ID)
    #[arg(long)]
    pub subscription: Option<String>,
}

/// Which cluster a command targets: a manifest, or resource group plus name
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Path to a ManagedCluster manifest (YAML)
    #[arg(long, short = 'f', value_name = "PATH", conflicts_with_all = ["resource_group", "name"])]
    pub file: Option<String>,

    /// Resource group containing the cluster
    #[arg(long, short = 'g', requires = "name")]
    pub resource_group: Option<String>,

    /// Cluster name
    #[arg(long, short = 'n', requires = "resource_group")]
    pub name: Option<String>,
}

impl TargetArgs {
    fn resolve(&self) -> anyhow::Result<ClusterSpec> {
        match (&self.file, &self.resource_group, &self.name) {
            (Some(file), _, _) => load_spec(file, &[]),
            (None, Some(rg), Some(name)) => Ok(ClusterSpec::reference(rg, name)),
            _ => Err(anyhow::anyhow!(
                "a cluster is required (use -f <manifest> or -g <resource-group> -n <name>)"
            )),
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct ApplyCommand {
    /// Path to a ManagedCluster manifest (YAML)
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: String,

    /// Print the derived provider resource instead of applying it
    #[arg(long)]
    pub dry_run: bool,

    /// Dynamic properties to override manifest values (-D key=value)
    ///
    /// Cluster: version, location, ssh-public-key, tags.<key>
    /// Network: network.plugin, network.policy, network.load-balancer-sku,
    ///          network.pod-cidr, network.service-cidr
    /// Pools: pools.<name>.replicas, pools.<name>.sku, pools.<name>.os-disk-size-gb
    ///
    /// Example: -Dversion=1.18.2 -Dpools.system.replicas=5
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Parser, Debug, Clone)]
pub struct GetCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct CredentialsCommand {
    /// Resource group containing the cluster
    #[arg(long, short = 'g')]
    pub resource_group: String,

    /// Cluster name
    #[arg(long, short = 'n')]
    pub name: String,

    /// Write the kubeconfig to this file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub output: Option<String>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct NodesCommand {
    /// Resource group containing the cluster
    #[arg(long, short = 'g')]
    pub resource_group: String,

    /// Cluster name
    #[arg(long, short = 'n')]
    pub name: String,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

impl ApplyCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let spec = load_spec(&self.file, &self.properties)?;

        let validator = ClusterSpecValidator::new()?;
        let issues = validator.warn(&spec);
        if issues > 0 {
            println!("⚠️  {} lint issue(s) found, continuing", issues);
        }

        if self.dry_run {
            let cluster = ManagedClusterReconciler::render(&spec)?;
            println!("{}", serde_json::to_string_pretty(&cluster)?);
            return Ok(());
        }

        let (config, reconciler) = connect(&self.provider)?;
        let ctx = operation_context(&config);

        println!(
            "Applying managed cluster {} in resource group {}...",
            spec.name, spec.resource_group
        );

        let (reconciler, ctx, spec_ref) = (&reconciler, &ctx, &spec);
        retry_transient(ctx, &config.retry, "reconcile managed cluster", move || {
            reconciler.reconcile(ctx, spec_ref)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to apply managed cluster: {}", e))?;

        println!("✅ Managed cluster {} is up to date", spec.name);
        Ok(())
    }
}

impl GetCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let spec = self.target.resolve()?;
        let (config, reconciler) = connect(&self.provider)?;
        let ctx = operation_context(&config);

        let (reconciler, ctx, spec_ref) = (&reconciler, &ctx, &spec);
        let cluster = retry_transient(ctx, &config.retry, "get managed cluster", move || {
            reconciler.get(ctx, spec_ref)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get managed cluster: {}", e))?;

        match self.output {
            OutputFormat::Table => {
                let renderer = TableRenderer::new();
                println!("{}", renderer.render_cluster_summary(&cluster));
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cluster)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&cluster)?),
        }

        Ok(())
    }
}

impl DeleteCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let spec = self.target.resolve()?;
        let (config, reconciler) = connect(&self.provider)?;
        let ctx = operation_context(&config);

        let (reconciler, ctx, spec_ref) = (&reconciler, &ctx, &spec);
        retry_transient(ctx, &config.retry, "delete managed cluster", move || {
            reconciler.delete(ctx, spec_ref)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete managed cluster: {}", e))?;

        println!("Managed cluster {} deleted successfully!", spec.name);
        Ok(())
    }
}

impl CredentialsCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let (config, reconciler) = connect(&self.provider)?;
        let ctx = operation_context(&config);

        let kubeconfig = fetch_credentials(&config, &reconciler, &ctx, &self.resource_group, &self.name).await?;
        parse_kubeconfig(&kubeconfig)?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, &kubeconfig)
                    .map_err(|e| anyhow::anyhow!("Failed to write kubeconfig to {}: {}", path, e))?;
                println!("Kubeconfig for {} written to {}", self.name, path);
            }
            None => print!("{}", String::from_utf8_lossy(&kubeconfig)),
        }

        Ok(())
    }
}

impl NodesCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let (config, reconciler) = connect(&self.provider)?;
        let ctx = operation_context(&config);

        let kubeconfig = fetch_credentials(&config, &reconciler, &ctx, &self.resource_group, &self.name).await?;
        let client = WorkloadKubeClientImpl::from_kubeconfig_bytes(&kubeconfig)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to cluster {}: {}", self.name, e))?;

        let nodes = client
            .list_nodes()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to list nodes: {}", e))?;
        let nodes: Vec<NodeInfo> = nodes.iter().map(NodeInfo::from).collect();

        let renderer = TableRenderer::new();
        println!(
            "{}",
            renderer.render_node_pools(&self.name, &group_nodes_by_pool(&nodes))
        );

        Ok(())
    }
}

/// Reads a manifest and applies `-D` overrides to the resulting spec.
pub fn load_spec(path: &str, properties: &[String]) -> anyhow::Result<ClusterSpec> {
    let mut spec = SpecManifest::from_file(path)?.into_cluster_spec()?;

    if !properties.is_empty() {
        let overrides = parse_properties(properties)
            .map_err(|e| anyhow::anyhow!("Failed to parse dynamic configs: {}", e))?;
        apply_to_cluster_spec(&overrides, &mut spec)?;
        info!(count = overrides.len(), "Applied dynamic overrides");
    }

    Ok(spec)
}

fn connect(args: &ProviderArgs) -> anyhow::Result<(ProviderConfig, ManagedClusterReconciler)> {
    let config = ProviderConfig::resolve(args.config.as_deref(), args.subscription.as_deref())?;
    let reconciler = ManagedClusterReconciler::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create provider client: {}", e))?;
    Ok((config, reconciler))
}

/// Context bounded by the configured operation timeout and cancelled on Ctrl-C.
fn operation_context(config: &ProviderConfig) -> OperationContext {
    let token = CancellationToken::new();
    let watcher = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling in-flight operation");
            watcher.cancel();
        }
    });

    OperationContext::new()
        .with_cancellation(token)
        .with_timeout(config.operation_timeout())
}

async fn fetch_credentials(
    config: &ProviderConfig,
    reconciler: &ManagedClusterReconciler,
    ctx: &OperationContext,
    resource_group: &str,
    name: &str,
) -> anyhow::Result<Vec<u8>> {
    retry_transient(ctx, &config.retry, "get managed cluster credentials", move || {
        reconciler.get_credentials(ctx, resource_group, name)
    })
    .await
    .map_err(|e| anyhow::anyhow!("Failed to get credentials: {}", e))
}
