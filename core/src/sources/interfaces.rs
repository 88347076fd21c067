//! Per-interface traffic counters from `/proc/net/dev`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, warn};
use wrtmon_common::config::SourcePaths;
use wrtmon_common::metric::{MetricDescriptor, MetricSample};
use wrtmon_common::record::InterfaceRecord;

use crate::source::{self, SnapshotSource};

const HEADER_LINES: usize = 2;
const COUNTER_FIELDS: usize = 16;
const LOOPBACK: &str = "lo";

pub struct InterfaceSource {
    net_dev: PathBuf,
    uptime: PathBuf,
    rx_bytes: Arc<MetricDescriptor>,
    tx_bytes: Arc<MetricDescriptor>,
    rx_packets: Arc<MetricDescriptor>,
    tx_packets: Arc<MetricDescriptor>,
    uptime_seconds: Arc<MetricDescriptor>,
}

impl InterfaceSource {
    pub fn new(paths: &SourcePaths) -> Self {
        let labels: &[&str] = &["interface"];
        Self {
            net_dev: paths.net_dev.clone(),
            uptime: paths.uptime.clone(),
            rx_bytes: MetricDescriptor::counter(
                "openwrt_network_receive_bytes_total",
                "total number of bytes received on network interface",
                labels,
            ),
            tx_bytes: MetricDescriptor::counter(
                "openwrt_network_transmit_bytes_total",
                "total number of bytes transmitted on network interface",
                labels,
            ),
            rx_packets: MetricDescriptor::counter(
                "openwrt_network_receive_packets_total",
                "total number of packets received on network interface",
                labels,
            ),
            tx_packets: MetricDescriptor::counter(
                "openwrt_network_transmit_packets_total",
                "total number of packets transmitted on network interface",
                labels,
            ),
            uptime_seconds: MetricDescriptor::gauge(
                "openwrt_network_uptime_seconds",
                "network interface uptime in seconds",
                labels,
            ),
        }
    }

    fn read_interfaces(&self) -> anyhow::Result<Vec<InterfaceRecord>> {
        let lines = source::read_lines_from(&self.net_dev)
            .with_context(|| format!("reading {}", self.net_dev.display()))?;
        Ok(parse_net_dev(&lines))
    }

    /// System uptime, used as a stand-in for interface uptime.
    fn read_uptime(&self) -> f64 {
        match std::fs::read_to_string(&self.uptime) {
            Ok(content) => parse_uptime(&content).unwrap_or(0.0),
            Err(e) => {
                debug!("cannot read {}: {e}", self.uptime.display());
                0.0
            }
        }
    }
}

#[async_trait]
impl SnapshotSource for InterfaceSource {
    fn name(&self) -> &'static str {
        "interfaces"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.rx_bytes),
            Arc::clone(&self.tx_bytes),
            Arc::clone(&self.rx_packets),
            Arc::clone(&self.tx_packets),
            Arc::clone(&self.uptime_seconds),
        ]
    }

    async fn collect(&self) -> Vec<MetricSample> {
        let interfaces: Vec<InterfaceRecord> = match self.read_interfaces() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                warn!("interface statistics unavailable: {e:#}");
                return Vec::new();
            }
        };

        let uptime: f64 = self.read_uptime();
        let mut samples: Vec<MetricSample> = Vec::with_capacity(interfaces.len() * 5);

        for iface in interfaces {
            let labels = || vec![iface.name.clone()];
            samples.push(MetricSample::new(&self.rx_bytes, labels(), iface.rx_bytes as f64));
            samples.push(MetricSample::new(&self.tx_bytes, labels(), iface.tx_bytes as f64));
            samples.push(MetricSample::new(&self.rx_packets, labels(), iface.rx_packets as f64));
            samples.push(MetricSample::new(&self.tx_packets, labels(), iface.tx_packets as f64));
            samples.push(MetricSample::new(&self.uptime_seconds, labels(), uptime));
        }

        samples
    }
}

/// Parses the body of `/proc/net/dev`, skipping the loopback interface.
///
/// The interface name is separated by a colon that large counters may touch
/// (`eth0:123456`), so the split happens on the colon rather than on spaces.
pub fn parse_net_dev<S: AsRef<str>>(lines: &[S]) -> Vec<InterfaceRecord> {
    lines
        .iter()
        .skip(HEADER_LINES)
        .filter_map(|line| parse_net_dev_line(line.as_ref()))
        .filter(|record| record.name != LOOPBACK)
        .collect()
}

fn parse_net_dev_line(line: &str) -> Option<InterfaceRecord> {
    let (name, counters) = line.split_once(':')?;
    let fields: Vec<&str> = counters.split_whitespace().collect();
    if fields.len() < COUNTER_FIELDS {
        debug!("skipping short interface line: {line:?}");
        return None;
    }

    let counter = |idx: usize| fields[idx].parse::<u64>().unwrap_or(0);
    Some(InterfaceRecord {
        name: name.trim().to_string(),
        rx_bytes: counter(0),
        rx_packets: counter(1),
        tx_bytes: counter(8),
        tx_packets: counter(9),
    })
}

pub fn parse_uptime(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse::<f64>().ok()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use temp_dir::TempDir;

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    4242      10    0    0    0     0          0         0     4242      10    0    0    0     0       0          0
  eth0:     100       0    0    0    0     0          0         0      200       0    0    0    0     0       0          0
 wlan0:12345678     321    0    0    0     0          0         0  87654321     123    0    0    0     0       0          0
 broken: 1 2 3
";

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn eth0_counters_are_parsed_and_loopback_excluded() {
        let records = parse_net_dev(&lines(NET_DEV));

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            InterfaceRecord {
                name: "eth0".into(),
                rx_bytes: 100,
                tx_bytes: 200,
                ..InterfaceRecord::default()
            }
        );
        assert!(records.iter().all(|r| r.name != "lo"));
    }

    #[test]
    fn counters_glued_to_the_name_are_parsed() {
        let records = parse_net_dev(&lines(NET_DEV));
        let wlan = &records[1];
        assert_eq!(wlan.name, "wlan0");
        assert_eq!(wlan.rx_bytes, 12_345_678);
        assert_eq!(wlan.rx_packets, 321);
        assert_eq!(wlan.tx_bytes, 87_654_321);
        assert_eq!(wlan.tx_packets, 123);
    }

    #[test]
    fn uptime_takes_first_field() {
        assert_eq!(parse_uptime("35127.19 68871.52\n"), Some(35127.19));
        assert_eq!(parse_uptime(""), None);
        assert_eq!(parse_uptime("abc 1"), None);
    }

    #[tokio::test]
    async fn collect_emits_five_samples_per_interface() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.child("dev"), NET_DEV).unwrap();
        std::fs::write(dir.child("uptime"), "120.5 10.0\n").unwrap();
        let paths = SourcePaths {
            net_dev: dir.child("dev"),
            uptime: dir.child("uptime"),
            ..SourcePaths::default()
        };

        let samples = InterfaceSource::new(&paths).collect().await;

        assert_eq!(samples.len(), 10);
        let eth0_tx = samples
            .iter()
            .find(|s| {
                s.descriptor().name() == "openwrt_network_transmit_bytes_total"
                    && s.label_values() == ["eth0"]
            })
            .unwrap();
        assert_eq!(eth0_tx.value(), 200.0);
        let uptime = samples
            .iter()
            .find(|s| s.descriptor().name() == "openwrt_network_uptime_seconds")
            .unwrap();
        assert_eq!(uptime.value(), 120.5);
    }

    #[tokio::test]
    async fn missing_statistics_file_yields_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let paths = SourcePaths {
            net_dev: dir.child("absent"),
            ..SourcePaths::default()
        };
        assert!(InterfaceSource::new(&paths).collect().await.is_empty());
    }

    #[test]
    fn describe_is_idempotent() {
        let source = InterfaceSource::new(&SourcePaths::default());
        assert_eq!(source.describe(), source.describe());
        assert_eq!(source.describe().len(), 5);
    }
}
