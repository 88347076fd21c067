#![cfg(test)]
use std::path::Path;

use temp_dir::TempDir;
use wrtmon_common::config::{Config, ProbeConfig, SourcePaths};
use wrtmon_core::exposition;
use wrtmon_core::registry::CollectorRegistry;

const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    4242      10    0    0    0     0          0         0     4242      10    0    0    0     0       0          0
  eth0:     100       1    0    0    0     0          0         0      200       2    0    0    0     0       0          0
";

const ARP: &str = "\
IP address       HW type     Flags       HW address            Mask     Device
192.168.1.50     0x1         0x2         aa:bb:cc:dd:ee:ff     *        br-lan
192.168.1.70     0x1         0x2         12:34:56:78:9a:bc     *        br-lan
";

fn fixture_paths(dir: &TempDir) -> SourcePaths {
    SourcePaths {
        dhcp_leases: vec![dir.child("dhcp.leases")],
        neighbor_command: None,
        arp_table: dir.child("arp"),
        upnp_leases: vec![dir.child("miniupnpd.leases")],
        net_dev: dir.child("dev"),
        uptime: dir.child("uptime"),
    }
}

fn write(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

async fn scrape(paths: SourcePaths) -> String {
    let mut config = Config::new(":9101", "/metrics", ProbeConfig::default()).unwrap();
    config.paths = paths;
    let registry = CollectorRegistry::from_config(&config);

    let descriptors = registry.describe();
    let samples = registry.collect().await;
    let body = exposition::render(&descriptors, &samples).unwrap();
    String::from_utf8(body).unwrap()
}

/// A router with one lease, two neighbours, one mapping and one interface.
#[tokio::test]
async fn full_scrape_from_fixture_files() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.child("dhcp.leases"),
        "4102444800 aa:bb:cc:dd:ee:ff 192.168.1.50 my-phone *\n",
    );
    write(&dir.child("arp"), ARP);
    write(
        &dir.child("miniupnpd.leases"),
        "udp:3074:192.168.1.70:3074:1714000000:7200:Xbox\n",
    );
    write(&dir.child("dev"), NET_DEV);
    write(&dir.child("uptime"), "500.25 900.00\n");

    let text = scrape(fixture_paths(&dir)).await;

    assert!(text.contains(
        "openwrt_device_info{hostname=\"my-phone\",ip=\"192.168.1.50\",mac=\"aa:bb:cc:dd:ee:ff\"} 1"
    ));
    assert!(text.contains(
        "openwrt_device_info{hostname=\"\",ip=\"192.168.1.70\",mac=\"12:34:56:78:9a:bc\"} 1"
    ));
    assert_eq!(text.matches("openwrt_device_info{").count(), 2);
    assert!(text.contains("openwrt_device_dhcp_lease_remaining_seconds{hostname=\"my-phone\""));
    assert!(!text.contains("openwrt_device_online_seconds{"));

    assert!(text.contains("openwrt_network_receive_bytes_total{interface=\"eth0\"} 100"));
    assert!(text.contains("openwrt_network_transmit_bytes_total{interface=\"eth0\"} 200"));
    assert!(text.contains("openwrt_network_transmit_packets_total{interface=\"eth0\"} 2"));
    assert!(text.contains("openwrt_network_uptime_seconds{interface=\"eth0\"} 500.25"));
    assert!(!text.contains("interface=\"lo\""));

    assert!(text.contains("openwrt_upnp_mapping_count 1"));
    assert!(text.contains("openwrt_upnp_mapping_lease_seconds{description=\"Xbox\",external_port=\"3074\""));

    assert!(!text.contains("openwrt_ping_"));
}

#[tokio::test]
async fn missing_inputs_still_render() {
    let dir = TempDir::new().unwrap();

    let text = scrape(fixture_paths(&dir)).await;

    assert!(!text.contains("openwrt_device_"));
    assert!(!text.contains("openwrt_network_"));
    assert!(!text.contains("openwrt_upnp_"));
}

#[tokio::test]
async fn consecutive_scrapes_reflect_current_state() {
    let dir = TempDir::new().unwrap();
    write(&dir.child("arp"), ARP);
    let paths = fixture_paths(&dir);

    let first = scrape(paths.clone()).await;
    assert!(first.contains("ip=\"192.168.1.70\""));

    write(
        &dir.child("arp"),
        "IP address HW type Flags HW address Mask Device\n",
    );
    let second = scrape(paths).await;
    assert!(!second.contains("openwrt_device_info{"));
}
