//! Table rendering for CLI output

use super::{ColorTheme, StatusIcon};
use crate::infrastructure::azure::models::ManagedCluster;
use crate::infrastructure::kubernetes::NodeInfo;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use std::collections::BTreeMap;

const UNASSIGNED_POOL: &str = "<none>";

/// Node readiness for one agent pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolNodes {
    pub pool: String,
    pub ready: u32,
    pub total: u32,
    pub nodes: Vec<String>,
    pub kubelet_version: Option<String>,
}

/// Groups nodes by their agent pool label, sorted by pool name.
pub fn group_nodes_by_pool(nodes: &[NodeInfo]) -> Vec<PoolNodes> {
    let mut pools: BTreeMap<String, PoolNodes> = BTreeMap::new();

    for node in nodes {
        let pool_name = node.pool.clone().unwrap_or_else(|| UNASSIGNED_POOL.to_string());
        let entry = pools.entry(pool_name.clone()).or_insert_with(|| PoolNodes {
            pool: pool_name,
            ..Default::default()
        });
        entry.total += 1;
        if node.ready {
            entry.ready += 1;
        }
        entry.nodes.push(node.name.clone());
        if entry.kubelet_version.is_none() {
            entry.kubelet_version = node.kubelet_version.clone();
        }
    }

    pools.into_values().collect()
}

/// Table renderer for formatted output
pub struct TableRenderer {
    theme: ColorTheme,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRenderer {
    /// Create a new table renderer with default theme
    pub fn new() -> Self {
        Self {
            theme: ColorTheme::default(),
        }
    }

    /// Render a managed cluster and its agent pools
    pub fn render_cluster_summary(&self, cluster: &ManagedCluster) -> String {
        let properties = &cluster.properties;
        let state = properties.provisioning_state.as_deref();

        let mut summary = Table::new();
        summary
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        summary.add_row(vec![
            Cell::new("Cluster"),
            Cell::new(cluster.name.as_deref().unwrap_or(&properties.dns_prefix)),
        ]);
        summary.add_row(vec![Cell::new("Location"), Cell::new(&cluster.location)]);
        summary.add_row(vec![
            Cell::new("Kubernetes"),
            Cell::new(&properties.kubernetes_version),
        ]);
        summary.add_row(vec![
            Cell::new("State"),
            Cell::new(format!(
                "{} {}",
                StatusIcon::get_provisioning_icon(state),
                state.unwrap_or("Unknown")
            ))
            .fg(self.theme.get_provisioning_color(state)),
        ]);
        if let Some(fqdn) = &properties.fqdn {
            summary.add_row(vec![Cell::new("FQDN"), Cell::new(fqdn)]);
        }
        if let Some(node_rg) = &properties.node_resource_group {
            summary.add_row(vec![Cell::new("Node resource group"), Cell::new(node_rg)]);
        }
        if let Some(network) = &properties.network_profile {
            let mut text = format!(
                "plugin: {:?}, lb: {:?}",
                network.network_plugin, network.load_balancer_sku
            );
            if let Some(policy) = network.network_policy {
                text.push_str(&format!(", policy: {:?}", policy));
            }
            if let Some(cidr) = &network.service_cidr {
                text.push_str(&format!("\nservice cidr: {}", cidr));
            }
            if let Some(dns) = &network.dns_service_ip {
                text.push_str(&format!(", dns: {}", dns));
            }
            summary.add_row(vec![Cell::new("Network"), Cell::new(text).fg(self.theme.info)]);
        }

        let mut pools = Table::new();
        pools
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("POOL").set_alignment(CellAlignment::Left),
                Cell::new("VM SIZE").set_alignment(CellAlignment::Left),
                Cell::new("COUNT").set_alignment(CellAlignment::Center),
                Cell::new("DISK (GB)").set_alignment(CellAlignment::Center),
                Cell::new("STATE").set_alignment(CellAlignment::Center),
            ]);

        for pool in &properties.agent_pool_profiles {
            let pool_state = pool.provisioning_state.as_deref();
            pools.add_row(vec![
                Cell::new(&pool.name),
                Cell::new(&pool.vm_size),
                Cell::new(pool.count).set_alignment(CellAlignment::Center),
                Cell::new(pool.os_disk_size_gb).set_alignment(CellAlignment::Center),
                Cell::new(format!(
                    "{} {}",
                    StatusIcon::get_provisioning_icon(pool_state),
                    pool_state.unwrap_or("Unknown")
                ))
                .fg(self.theme.get_provisioning_color(pool_state)),
            ]);
        }

        let mut output = String::new();
        output.push_str(&summary.to_string());
        output.push('\n');
        output.push_str(&format!(
            "╭─ Agent Pools {} ─╮\n",
            format!("[{} pools]", properties.agent_pool_profiles.len()).bright_black()
        ));
        output.push_str(&pools.to_string());
        output.push('\n');

        output
    }

    /// Render workload nodes grouped by agent pool
    pub fn render_node_pools(&self, cluster_name: &str, pools: &[PoolNodes]) -> String {
        if pools.is_empty() {
            return format!("No nodes found in cluster {}", cluster_name);
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("POOL").set_alignment(CellAlignment::Left),
                Cell::new("READY").set_alignment(CellAlignment::Center),
                Cell::new("STATUS").set_alignment(CellAlignment::Center),
                Cell::new("VERSION").set_alignment(CellAlignment::Left),
                Cell::new("NODES").set_alignment(CellAlignment::Left),
            ]);

        for pool in pools {
            let color = self.theme.get_replica_color(pool.ready, pool.total);
            table.add_row(vec![
                Cell::new(&pool.pool),
                Cell::new(format!(
                    "{} {}/{}",
                    StatusIcon::get_replica_icon(pool.ready, pool.total),
                    pool.ready,
                    pool.total
                ))
                .fg(color),
                Cell::new(StatusIcon::get_status_text(pool.ready, pool.total)).fg(color),
                Cell::new(pool.kubelet_version.as_deref().unwrap_or("-")),
                Cell::new(pool.nodes.join("\n")),
            ]);
        }

        let total: usize = pools.iter().map(|p| p.nodes.len()).sum();
        let mut output = String::new();
        output.push_str(&format!(
            "╭─ {} {} ─╮\n",
            cluster_name,
            format!("[{} nodes]", total).bright_black()
        ));
        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&format!(
            "Legend: {} Ready  {} Degraded  {} NotReady\n",
            StatusIcon::SUCCESS.green(),
            StatusIcon::WARNING.yellow(),
            StatusIcon::ERROR.red()
        ));

        output
    }
}
