//! # Metric Model
//!
//! A [`MetricDescriptor`] names a metric family once per source; every scrape
//! then produces fresh [`MetricSample`]s pointing back at their descriptor.

use std::fmt;
use std::sync::Arc;

use crate::error::MetricError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

/// Static metadata of one metric family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    label_names: Vec<String>,
    kind: MetricKind,
}

impl MetricDescriptor {
    pub fn new(name: &str, help: &str, label_names: &[&str], kind: MetricKind) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|label| label.to_string()).collect(),
            kind,
        }
    }

    pub fn gauge(name: &str, help: &str, label_names: &[&str]) -> Arc<Self> {
        Arc::new(Self::new(name, help, label_names, MetricKind::Gauge))
    }

    pub fn counter(name: &str, help: &str, label_names: &[&str]) -> Arc<Self> {
        Arc::new(Self::new(name, help, label_names, MetricKind::Counter))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }
}

/// One value of a family, positionally labelled.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    descriptor: Arc<MetricDescriptor>,
    label_values: Vec<String>,
    value: f64,
}

impl MetricSample {
    pub fn new(descriptor: &Arc<MetricDescriptor>, label_values: Vec<String>, value: f64) -> Self {
        Self {
            descriptor: Arc::clone(descriptor),
            label_values,
            value,
        }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.descriptor
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Ensures the label values line up with the descriptor's label names.
    pub fn check_shape(&self) -> Result<(), MetricError> {
        let expected: usize = self.descriptor.label_names.len();
        let actual: usize = self.label_values.len();
        if expected != actual {
            return Err(MetricError::LabelMismatch {
                name: self.descriptor.name.clone(),
                expected,
                actual,
            });
        }
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_with_matching_labels_passes_shape_check() {
        let desc = MetricDescriptor::gauge("test_metric", "help", &["a", "b"]);
        let sample = MetricSample::new(&desc, vec!["x".into(), "y".into()], 1.0);
        assert_eq!(sample.check_shape(), Ok(()));
        assert_eq!(sample.descriptor().name(), "test_metric");
    }

    #[test]
    fn sample_with_missing_label_fails_shape_check() {
        let desc = MetricDescriptor::counter("test_total", "help", &["iface"]);
        let sample = MetricSample::new(&desc, Vec::new(), 3.0);
        assert_eq!(
            sample.check_shape(),
            Err(MetricError::LabelMismatch {
                name: "test_total".into(),
                expected: 1,
                actual: 0,
            })
        );
    }

    #[test]
    fn descriptor_constructors_set_kind() {
        assert_eq!(MetricDescriptor::gauge("g", "h", &[]).kind(), MetricKind::Gauge);
        assert_eq!(MetricDescriptor::counter("c", "h", &[]).kind(), MetricKind::Counter);
    }
}
