//! Round-trip latency and loss towards the configured targets.
//!
//! Every scrape runs one full probe round through the [`ProbeDispatcher`].
//! Targets that could not be resolved or probed are logged and leave no
//! samples behind.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use wrtmon_common::config::ProbeConfig;
use wrtmon_common::metric::{MetricDescriptor, MetricSample};
use wrtmon_common::probe::{ProbeResult, ProbeStats, ProbeTarget};

use crate::probe::{self, ProbeDispatcher, SystemResolver};
use crate::source::SnapshotSource;

pub struct LatencySource {
    dispatcher: ProbeDispatcher,
    avg: Arc<MetricDescriptor>,
    min: Arc<MetricDescriptor>,
    max: Arc<MetricDescriptor>,
    latency: Arc<MetricDescriptor>,
    loss: Arc<MetricDescriptor>,
}

impl LatencySource {
    pub fn new(dispatcher: ProbeDispatcher) -> Self {
        let labels: &[&str] = &["target", "ip", "ip_type"];
        Self {
            dispatcher,
            avg: MetricDescriptor::gauge(
                "openwrt_ping_avg_latency_ms",
                "average ping latency in milliseconds",
                labels,
            ),
            min: MetricDescriptor::gauge(
                "openwrt_ping_min_latency_ms",
                "minimum ping latency in milliseconds",
                labels,
            ),
            max: MetricDescriptor::gauge(
                "openwrt_ping_max_latency_ms",
                "maximum ping latency in milliseconds",
                labels,
            ),
            latency: MetricDescriptor::gauge(
                "openwrt_ping_latency_ms",
                "ping latency in milliseconds",
                labels,
            ),
            loss: MetricDescriptor::gauge(
                "openwrt_ping_packet_loss_percent",
                "ping packet loss percentage",
                labels,
            ),
        }
    }

    /// Wires the prober for the configured privilege mode and the system resolver.
    pub fn from_config(config: &ProbeConfig) -> Self {
        let dispatcher = ProbeDispatcher::new(
            config.clone(),
            probe::prober_for(config),
            Arc::new(SystemResolver),
        );
        Self::new(dispatcher)
    }

    fn samples_for(&self, target: &ProbeTarget, stats: &ProbeStats) -> Vec<MetricSample> {
        let labels = vec![
            target.host.clone(),
            stats.resolved_address.to_string(),
            target.family.as_label().to_string(),
        ];

        vec![
            MetricSample::new(&self.avg, labels.clone(), stats.avg_ms),
            MetricSample::new(&self.min, labels.clone(), stats.min_ms),
            MetricSample::new(&self.max, labels.clone(), stats.max_ms),
            MetricSample::new(&self.latency, labels.clone(), stats.avg_ms),
            MetricSample::new(&self.loss, labels, stats.packet_loss),
        ]
    }
}

#[async_trait]
impl SnapshotSource for LatencySource {
    fn name(&self) -> &'static str {
        "latency"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.avg),
            Arc::clone(&self.min),
            Arc::clone(&self.max),
            Arc::clone(&self.latency),
            Arc::clone(&self.loss),
        ]
    }

    async fn collect(&self) -> Vec<MetricSample> {
        if self.dispatcher.config().targets.is_empty() {
            return Vec::new();
        }

        let results: Vec<ProbeResult> = self.dispatcher.run().await;
        let mut samples: Vec<MetricSample> = Vec::with_capacity(results.len() * 5);

        for result in results {
            match result.outcome {
                Ok(stats) => {
                    debug!(
                        "{} ({}): avg {:.3}ms, loss {:.1}%",
                        result.target.host, stats.resolved_address, stats.avg_ms, stats.packet_loss
                    );
                    samples.extend(self.samples_for(&result.target, &stats));
                }
                Err(e) => warn!("ping {} ({}) failed: {e}", result.target.host, result.target.family),
            }
        }

        samples
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
