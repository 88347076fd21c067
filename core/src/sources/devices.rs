//! # Connected Devices
//!
//! Merges two views of the LAN:
//! * the DHCP server's lease file (hostnames, lease expiry),
//! * the kernel neighbour table (anything that talked to the router recently).
//!
//! A device is identified by its `(mac, ip)` pair so that the IPv4 and IPv6
//! addresses of one host stay separate entries. When both views know the same
//! pair, the lease entry wins.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use wrtmon_common::config::SourcePaths;
use wrtmon_common::metric::{MetricDescriptor, MetricSample};
use wrtmon_common::record::DeviceRecord;

use crate::source::{self, SnapshotSource};

const INCOMPLETE_MAC: &str = "00:00:00:00:00:00";
const INCOMPLETE_FLAGS: &str = "0x0";

pub struct DeviceSource {
    lease_paths: Vec<PathBuf>,
    neighbor_command: Option<Vec<String>>,
    arp_table: PathBuf,
    info: Arc<MetricDescriptor>,
    online: Arc<MetricDescriptor>,
    lease_remaining: Arc<MetricDescriptor>,
}

impl DeviceSource {
    pub fn new(paths: &SourcePaths) -> Self {
        let labels: &[&str] = &["hostname", "ip", "mac"];
        Self {
            lease_paths: paths.dhcp_leases.clone(),
            neighbor_command: paths.neighbor_command.clone(),
            arp_table: paths.arp_table.clone(),
            info: MetricDescriptor::gauge(
                "openwrt_device_info",
                "information about connected devices",
                labels,
            ),
            online: MetricDescriptor::gauge(
                "openwrt_device_online_seconds",
                "device online time in seconds",
                labels,
            ),
            lease_remaining: MetricDescriptor::gauge(
                "openwrt_device_dhcp_lease_remaining_seconds",
                "dhcp lease remaining time in seconds",
                labels,
            ),
        }
    }

    fn read_leases(&self) -> Vec<DeviceRecord> {
        match source::read_first_existing(&self.lease_paths) {
            Ok((path, lines)) => {
                debug!("reading DHCP leases from {}", path.display());
                parse_dhcp_leases(&lines, unix_now())
            }
            Err(e) => {
                warn!("failed to read DHCP leases: {e}");
                Vec::new()
            }
        }
    }

    /// Prefers the live neighbour listing and falls back to the static ARP table.
    async fn read_neighbors(&self) -> Vec<DeviceRecord> {
        if let Some(output) = self.run_neighbor_command().await {
            return parse_ip_neigh(&output);
        }

        match source::read_lines_from(&self.arp_table) {
            Ok(lines) => parse_proc_arp(&lines),
            Err(e) => {
                warn!("failed to read ARP table {}: {e}", self.arp_table.display());
                Vec::new()
            }
        }
    }

    async fn run_neighbor_command(&self) -> Option<String> {
        let (program, args) = self.neighbor_command.as_deref()?.split_first()?;

        match Command::new(program).args(args).output().await {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                debug!("{program} exited with {}", output.status);
                None
            }
            Err(e) => {
                debug!("{program} unavailable: {e}");
                None
            }
        }
    }

    fn samples_for(&self, device: DeviceRecord) -> Vec<MetricSample> {
        let labels = vec![
            device.hostname.unwrap_or_default(),
            device.ip,
            device.mac,
        ];

        let mut samples: Vec<MetricSample> = Vec::with_capacity(3);
        if device.online_seconds > 0.0 {
            samples.push(MetricSample::new(&self.online, labels.clone(), device.online_seconds));
        }
        if device.lease_remaining_seconds > 0.0 {
            samples.push(MetricSample::new(
                &self.lease_remaining,
                labels.clone(),
                device.lease_remaining_seconds,
            ));
        }
        samples.insert(0, MetricSample::new(&self.info, labels, 1.0));
        samples
    }
}

#[async_trait]
impl SnapshotSource for DeviceSource {
    fn name(&self) -> &'static str {
        "devices"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.info),
            Arc::clone(&self.online),
            Arc::clone(&self.lease_remaining),
        ]
    }

    async fn collect(&self) -> Vec<MetricSample> {
        let leases: Vec<DeviceRecord> = self.read_leases();
        let neighbors: Vec<DeviceRecord> = self.read_neighbors().await;

        merge_devices(leases, neighbors)
            .into_iter()
            .flat_map(|device| self.samples_for(device))
            .collect()
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Parses dnsmasq leases: `<expiry> <mac> <ip> <hostname> [<client-id>]`.
///
/// A hostname of `*` means the client sent none. An expiry that cannot be
/// parsed counts as already expired.
pub fn parse_dhcp_leases<S: AsRef<str>>(lines: &[S], now: i64) -> Vec<DeviceRecord> {
    lines
        .iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.as_ref().split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }

            let expiry: i64 = fields[0].parse().unwrap_or(0);
            let hostname: Option<String> = match fields[3] {
                "*" => None,
                name => Some(name.to_string()),
            };

            Some(DeviceRecord {
                hostname,
                ip: fields[2].to_string(),
                mac: fields[1].to_string(),
                online_seconds: 0.0,
                lease_remaining_seconds: expiry.saturating_sub(now).max(0) as f64,
            })
        })
        .collect()
}

/// Parses `ip neigh show` output: `<ip> dev <iface> lladdr <mac> <state>`.
///
/// Entries without a link-layer address (FAILED, INCOMPLETE) are dropped.
pub fn parse_ip_neigh(output: &str) -> Vec<DeviceRecord> {
    output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }

            let mac: &str = fields
                .windows(2)
                .find(|pair| pair[0] == "lladdr")
                .map(|pair| pair[1])?;

            Some(neighbor(fields[0], mac))
        })
        .collect()
}

/// Parses `/proc/net/arp`: `IP HWtype Flags HWaddress Mask Device`, header first.
pub fn parse_proc_arp<S: AsRef<str>>(lines: &[S]) -> Vec<DeviceRecord> {
    lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.as_ref().split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            if fields[3] == INCOMPLETE_MAC || fields[2] == INCOMPLETE_FLAGS {
                return None;
            }
            Some(neighbor(fields[0], fields[3]))
        })
        .collect()
}

fn neighbor(ip: &str, mac: &str) -> DeviceRecord {
    DeviceRecord {
        hostname: None,
        ip: ip.to_string(),
        mac: mac.to_string(),
        online_seconds: 0.0,
        lease_remaining_seconds: 0.0,
    }
}

/// Deduplicates by `(mac, ip)`, keeping lease records over neighbour records
/// and the first occurrence within each list. Records with neither an address
/// nor a MAC are dropped.
pub fn merge_devices(leases: Vec<DeviceRecord>, neighbors: Vec<DeviceRecord>) -> Vec<DeviceRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut merged: Vec<DeviceRecord> = Vec::with_capacity(leases.len() + neighbors.len());

    for device in leases.into_iter().chain(neighbors) {
        if device.ip.is_empty() && device.mac.is_empty() {
            continue;
        }
        let (mac, ip) = device.key();
        if seen.insert((mac.to_string(), ip.to_string())) {
            merged.push(device);
        }
    }

    merged
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
