//! # Exposition
//!
//! Renders one scrape into the Prometheus text format. A fresh
//! [`prometheus::Registry`] is built for every scrape so nothing from a
//! previous scrape (a device that left, a target that stopped answering)
//! lingers in the output.
//!
//! Families are only materialized once they receive a sample. A described
//! family with no samples renders nothing.

use std::collections::HashMap;
use std::sync::Arc;

use prometheus::{Counter, CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use wrtmon_common::error::MetricError;
use wrtmon_common::metric::{MetricDescriptor, MetricKind, MetricSample};

#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error(transparent)]
    Shape(#[from] MetricError),

    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("sample for undescribed family {0}")]
    UndescribedFamily(String),

    #[error("counter {name} cannot take negative value {value}")]
    NegativeCounter { name: String, value: f64 },
}

/// Content type of the rendered body.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// Validates every sample against the described families and encodes them.
pub fn render(
    descriptors: &[Arc<MetricDescriptor>],
    samples: &[MetricSample],
) -> Result<Vec<u8>, ExpositionError> {
    let described: HashMap<&str, &MetricDescriptor> = descriptors
        .iter()
        .map(|descriptor| (descriptor.name(), descriptor.as_ref()))
        .collect();

    let registry = Registry::new();
    let mut families: HashMap<String, Family> = HashMap::new();

    for sample in samples {
        sample.check_shape()?;

        let name: &str = sample.descriptor().name();
        let descriptor: &MetricDescriptor = described
            .get(name)
            .copied()
            .ok_or_else(|| ExpositionError::UndescribedFamily(name.to_string()))?;

        if !families.contains_key(name) {
            let family: Family = Family::build(descriptor)?;
            family.register(&registry)?;
            families.insert(name.to_string(), family);
        }

        if let Some(family) = families.get(name) {
            family.observe(sample)?;
        }
    }

    let mut body: Vec<u8> = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut body)?;
    Ok(body)
}

enum Family {
    Gauge(Gauge),
    GaugeVec(GaugeVec),
    Counter(Counter),
    CounterVec(CounterVec),
}

impl Family {
    fn build(descriptor: &MetricDescriptor) -> Result<Self, prometheus::Error> {
        let opts = Opts::new(descriptor.name(), descriptor.help());
        let labels: Vec<&str> = descriptor.label_names().iter().map(String::as_str).collect();

        let family = match (descriptor.kind(), labels.is_empty()) {
            (MetricKind::Gauge, true) => Family::Gauge(Gauge::with_opts(opts)?),
            (MetricKind::Gauge, false) => Family::GaugeVec(GaugeVec::new(opts, &labels)?),
            (MetricKind::Counter, true) => Family::Counter(Counter::with_opts(opts)?),
            (MetricKind::Counter, false) => Family::CounterVec(CounterVec::new(opts, &labels)?),
        };
        Ok(family)
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        match self {
            Family::Gauge(m) => registry.register(Box::new(m.clone())),
            Family::GaugeVec(m) => registry.register(Box::new(m.clone())),
            Family::Counter(m) => registry.register(Box::new(m.clone())),
            Family::CounterVec(m) => registry.register(Box::new(m.clone())),
        }
    }

    /// Records one sample. The last sample wins for repeated label values.
    fn observe(&self, sample: &MetricSample) -> Result<(), ExpositionError> {
        let values: Vec<&str> = sample.label_values().iter().map(String::as_str).collect();
        let value: f64 = sample.value();

        match self {
            Family::Gauge(gauge) => gauge.set(value),
            Family::GaugeVec(vec) => vec.get_metric_with_label_values(&values)?.set(value),
            Family::Counter(counter) => set_counter(counter, sample, value)?,
            Family::CounterVec(vec) => {
                set_counter(&vec.get_metric_with_label_values(&values)?, sample, value)?
            }
        }
        Ok(())
    }
}

fn set_counter(counter: &Counter, sample: &MetricSample, value: f64) -> Result<(), ExpositionError> {
    if value < 0.0 || value.is_nan() {
        return Err(ExpositionError::NegativeCounter {
            name: sample.descriptor().name().to_string(),
            value,
        });
    }
    counter.reset();
    counter.inc_by(value);
    Ok(())
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

    fn text(descriptors: &[Arc<MetricDescriptor>], samples: &[MetricSample]) -> String {
        String::from_utf8(render(descriptors, samples).unwrap()).unwrap()
    }

    #[test]
    fn gauges_and_counters_render_with_labels() {
        let rx = MetricDescriptor::counter(
            "openwrt_network_receive_bytes_total",
            "total number of bytes received on network interface",
            &["interface"],
        );
        let count = MetricDescriptor::gauge("openwrt_upnp_mapping_count", "mappings", &[]);
        let samples = vec![
            MetricSample::new(&rx, vec!["eth0".into()], 100.0),
            MetricSample::new(&count, Vec::new(), 2.0),
        ];

        let body = text(&[rx, count], &samples);

        assert!(body.contains("# TYPE openwrt_network_receive_bytes_total counter"));
        assert!(body.contains("openwrt_network_receive_bytes_total{interface=\"eth0\"} 100"));
        assert!(body.contains("# TYPE openwrt_upnp_mapping_count gauge"));
        assert!(body.contains("openwrt_upnp_mapping_count 2"));
    }

    #[test]
    fn described_family_without_samples_renders_nothing() {
        let info = MetricDescriptor::gauge("openwrt_device_info", "devices", &["hostname", "ip", "mac"]);
        assert!(text(&[info], &[]).is_empty());
    }

    #[test]
    fn label_count_mismatch_is_rejected() {
        let info = MetricDescriptor::gauge("openwrt_device_info", "devices", &["hostname", "ip", "mac"]);
        let sample = MetricSample::new(&info, vec!["phone".into()], 1.0);

        let err = render(&[info], &[sample]).unwrap_err();

        assert!(matches!(
            err,
            ExpositionError::Shape(MetricError::LabelMismatch { expected: 3, actual: 1, .. })
        ));
    }

    #[test]
    fn undescribed_family_is_rejected() {
        let stray = MetricDescriptor::gauge("stray", "not described", &[]);
        let sample = MetricSample::new(&stray, Vec::new(), 1.0);

        let err = render(&[], &[sample]).unwrap_err();
        assert!(matches!(err, ExpositionError::UndescribedFamily(name) if name == "stray"));
    }

    #[test]
    fn negative_counter_is_rejected() {
        let tx = MetricDescriptor::counter("tx_total", "bytes", &["interface"]);
        let sample = MetricSample::new(&tx, vec!["eth0".into()], -1.0);

        let err = render(&[tx], &[sample]).unwrap_err();
        assert!(matches!(err, ExpositionError::NegativeCounter { .. }));
    }

    #[test]
    fn repeated_labels_keep_last_value() {
        let gauge = MetricDescriptor::gauge("g", "gauge", &["k"]);
        let samples = vec![
            MetricSample::new(&gauge, vec!["a".into()], 1.0),
            MetricSample::new(&gauge, vec!["a".into()], 5.0),
        ];

        let body = text(&[gauge], &samples);
        assert!(body.contains("g{k=\"a\"} 5"));
        assert!(!body.contains("g{k=\"a\"} 1"));
    }

    #[test]
    fn content_type_is_text_format() {
        assert!(content_type().starts_with("text/plain"));
    }
}
