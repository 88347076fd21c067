//! # Collector Registry
//!
//! Owns the set of [`SnapshotSource`]s. A scrape asks every source for its
//! samples at the same time and concatenates them in registration order.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{Instrument, debug, info_span};
use wrtmon_common::config::Config;
use wrtmon_common::metric::{MetricDescriptor, MetricSample};

use crate::source::SnapshotSource;
use crate::sources::{AddressSource, DeviceSource, InterfaceSource, LatencySource, UpnpSource};

#[derive(Default)]
pub struct CollectorRegistry {
    sources: Vec<Box<dyn SnapshotSource>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every built-in source against the configured paths and targets.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(DeviceSource::new(&config.paths)));
        registry.register(Box::new(InterfaceSource::new(&config.paths)));
        registry.register(Box::new(AddressSource::new()));
        registry.register(Box::new(LatencySource::from_config(&config.probe)));
        registry.register(Box::new(UpnpSource::new(&config.paths)));
        registry
    }

    pub fn register(&mut self, source: Box<dyn SnapshotSource>) {
        debug!("registered source {}", source.name());
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Descriptors of every registered source, in registration order.
    pub fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.sources.iter().flat_map(|source| source.describe()).collect()
    }

    pub async fn collect(&self) -> Vec<MetricSample> {
        let snapshots = join_all(self.sources.iter().map(|source| {
            async move {
                let start: Instant = Instant::now();
                let samples: Vec<MetricSample> = source.collect().await;
                debug!("produced {} sample(s) in {:?}", samples.len(), start.elapsed());
                samples
            }
            .instrument(info_span!("source", source = %source.name()))
        }))
        .await;

        snapshots.into_iter().flatten().collect()
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
