#![cfg(test)]
use std::io;
use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use wrtmon_common::config::ProbeConfig;
use wrtmon_common::probe::{AddressFamily, ProbeTarget};
use wrtmon_core::exposition;
use wrtmon_core::probe::{ProbeDispatcher, Resolver, SystemResolver, TcpConnectProber};
use wrtmon_core::source::SnapshotSource;
use wrtmon_core::sources::LatencySource;

/// Never resolves anything, after a fixed delay.
struct SlowFailingResolver(Duration);

#[async_trait]
impl Resolver for SlowFailingResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        tokio::time::sleep(self.0).await;
        Err(io::Error::new(io::ErrorKind::NotFound, format!("{host} unknown")))
    }
}

fn config(targets: Vec<ProbeTarget>, count: usize, concurrency: usize) -> ProbeConfig {
    ProbeConfig {
        targets,
        count,
        interval: Duration::from_millis(5),
        timeout: Duration::from_secs(1),
        concurrency,
        privileged: false,
    }
}

/// count 5, timeout 1s, concurrency 2 against three unresolvable names.
#[tokio::test]
async fn unresolvable_targets_fail_fast_and_independently() {
    let targets: Vec<ProbeTarget> = ["a.invalid", "b.invalid", "c.invalid"]
        .into_iter()
        .map(|host| ProbeTarget::new(host, AddressFamily::V4))
        .collect();
    let dispatcher = ProbeDispatcher::new(
        config(targets, 5, 2),
        Arc::new(TcpConnectProber::default()),
        Arc::new(SlowFailingResolver(Duration::from_millis(250))),
    );

    let start = Instant::now();
    let results = dispatcher.run().await;

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.outcome.is_err()));
    assert!(start.elapsed() < Duration::from_millis(700));
}

#[tokio::test]
async fn tcp_probes_against_loopback_render_as_latency_gauges() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let prober = TcpConnectProber {
        port: listener.local_addr().unwrap().port(),
    };
    let dispatcher = ProbeDispatcher::new(
        config(vec![ProbeTarget::new("127.0.0.1", AddressFamily::V4)], 3, 2),
        Arc::new(prober),
        Arc::new(SystemResolver),
    );
    let source = LatencySource::new(dispatcher);

    let samples = source.collect().await;
    let body = exposition::render(&source.describe(), &samples).unwrap();
    let text = String::from_utf8(body).unwrap();

    assert_eq!(samples.len(), 5);
    assert!(text.contains(
        "openwrt_ping_packet_loss_percent{ip=\"127.0.0.1\",ip_type=\"IPv4\",target=\"127.0.0.1\"} 0"
    ));
    assert!(text.contains("openwrt_ping_avg_latency_ms{"));
    drop(listener);
}

#[tokio::test]
async fn ipv6_target_without_ipv6_address_is_skipped() {
    let dispatcher = ProbeDispatcher::new(
        config(vec![ProbeTarget::new("127.0.0.1", AddressFamily::V6)], 1, 1),
        Arc::new(TcpConnectProber::default()),
        Arc::new(SystemResolver),
    );

    let results = dispatcher.run().await;

    assert_eq!(results.len(), 1);
    assert!(results[0].outcome.is_err());
}
