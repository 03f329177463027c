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
use crate::infrastructure::azure::models::{NetworkPolicy, NetworkProfile};
use crate::infrastructure::constants::{DNS_SERVICE_IP_HOST_OCTET, MIN_SERVICE_CIDR_ADDRESSES};
use crate::shared::error::KubeError;
use ipnet::IpNet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Builds the network profile: plugin and load balancer defaults, CIDR
/// propagation, DNS service address derivation and network policy.
pub struct NetworkProfileBuilder<'a> {
    spec: &'a ClusterSpec,
}

impl<'a> NetworkProfileBuilder<'a> {
    pub fn new(spec: &'a ClusterSpec) -> Self {
        Self { spec }
    }

    pub fn build(&self) -> Result<NetworkProfile, KubeError> {
        let mut profile = NetworkProfile {
            network_plugin: self.spec.network_plugin.unwrap_or_default().into(),
            load_balancer_sku: self.spec.load_balancer_sku.unwrap_or_default().into(),
            pod_cidr: self.spec.pod_cidr().map(str::to_string),
            ..Default::default()
        };

        if let Some(service_cidr) = self.spec.service_cidr() {
            let net = parse_service_cidr(service_cidr)?;
            profile.service_cidr = Some(service_cidr.to_string());
            profile.dns_service_ip = Some(derive_dns_service_ip(&net)?.to_string());
        }

        if let Some(policy) = self.spec.network_policy() {
            profile.network_policy = Some(parse_network_policy(policy)?);
        }

        Ok(profile)
    }
}

pub fn parse_service_cidr(cidr: &str) -> Result<IpNet, KubeError> {
    cidr.parse::<IpNet>().map_err(|e| {
        KubeError::ValidationError(format!("failed to parse service cidr '{}': {}", cidr, e))
    })
}

/// The cluster DNS service address for a service CIDR: the network address
/// with its low-order byte set to [`DNS_SERVICE_IP_HOST_OCTET`].
pub fn derive_dns_service_ip(net: &IpNet) -> Result<IpAddr, KubeError> {
    let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
    let addresses = 1u128.checked_shl(host_bits).unwrap_or(u128::MAX);
    if addresses < MIN_SERVICE_CIDR_ADDRESSES {
        return Err(KubeError::ValidationError(format!(
            "service cidr '{}' is too small: at least {} addresses are required to reserve the DNS service IP",
            net, MIN_SERVICE_CIDR_ADDRESSES
        )));
    }

    let dns_ip = match net.network() {
        IpAddr::V4(addr) => {
            let mut octets = addr.octets();
            octets[3] = DNS_SERVICE_IP_HOST_OCTET;
            IpAddr::V4(Ipv4Addr::from(octets))
        }
        IpAddr::V6(addr) => {
            let mut octets = addr.octets();
            octets[15] = DNS_SERVICE_IP_HOST_OCTET;
            IpAddr::V6(Ipv6Addr::from(octets))
        }
    };

    if !net.contains(&dns_ip) {
        return Err(KubeError::ValidationError(format!(
            "service cidr '{}' does not contain the derived DNS service IP {}",
            net, dns_ip
        )));
    }

    Ok(dns_ip)
}

pub fn parse_network_policy(policy: &str) -> Result<NetworkPolicy, KubeError> {
    if policy.eq_ignore_ascii_case("azure") {
        Ok(NetworkPolicy::Azure)
    } else if policy.eq_ignore_ascii_case("calico") {
        Ok(NetworkPolicy::Calico)
    } else {
        Err(KubeError::ValidationError(format!(
            "invalid network policy: '{}'. Allowed options are 'calico' and 'azure'",
            policy
        )))
    }
}
