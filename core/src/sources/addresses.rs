//! Addresses configured on the local interfaces.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use async_trait::async_trait;
use pnet::datalink::{self, NetworkInterface};
use tracing::trace;
use wrtmon_common::metric::{MetricDescriptor, MetricSample};
use wrtmon_common::record::AddressRecord;

use crate::source::SnapshotSource;

pub struct AddressSource {
    ip_info: Arc<MetricDescriptor>,
}

impl AddressSource {
    pub fn new() -> Self {
        Self {
            ip_info: MetricDescriptor::gauge(
                "openwrt_interface_ip_info",
                "ip address information for network interfaces",
                &["interface", "ip", "version", "family"],
            ),
        }
    }
}

impl Default for AddressSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotSource for AddressSource {
    fn name(&self) -> &'static str {
        "addresses"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![Arc::clone(&self.ip_info)]
    }

    async fn collect(&self) -> Vec<MetricSample> {
        let interfaces: Vec<NetworkInterface> = datalink::interfaces();
        trace!("found {} interface(s)", interfaces.len());

        address_records(&interfaces)
            .into_iter()
            .map(|record| {
                let labels = vec![
                    record.interface,
                    record.ip,
                    record.version.to_string(),
                    record.scope.to_string(),
                ];
                MetricSample::new(&self.ip_info, labels, 1.0)
            })
            .collect()
    }
}

/// Flattens the addresses of every interface that is up and not a loopback.
pub fn address_records(interfaces: &[NetworkInterface]) -> Vec<AddressRecord> {
    interfaces
        .iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback())
        .flat_map(|iface| {
            iface.ips.iter().map(move |net| {
                let ip: IpAddr = net.ip();
                AddressRecord {
                    interface: iface.name.clone(),
                    ip: ip.to_string(),
                    version: match ip {
                        IpAddr::V4(_) => "4",
                        IpAddr::V6(_) => "6",
                    },
                    scope: classify(&ip),
                }
            })
        })
        .collect()
}

pub fn classify(ip: &IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    }
}

fn classify_v4(ip: &Ipv4Addr) -> &'static str {
    if ip.is_private() {
        "private"
    } else if ip.is_loopback() {
        "loopback"
    } else if ip.is_link_local() {
        "link-local"
    } else {
        "public"
    }
}

fn classify_v6(ip: &Ipv6Addr) -> &'static str {
    let first: u16 = ip.segments()[0];
    // fc00::/7
    let unique_local: bool = first & 0xfe00 == 0xfc00;
    // fe80::/10
    let link_local: bool = first & 0xffc0 == 0xfe80;

    if unique_local {
        "private"
    } else if ip.is_loopback() {
        "loopback"
    } else if link_local {
        "link-local"
    } else if !ip.is_unspecified() && !ip.is_multicast() {
        "global"
    } else {
        "other"
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
