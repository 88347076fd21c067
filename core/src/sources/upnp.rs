//! Active UPnP port forwards from the miniupnpd lease file.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use wrtmon_common::config::SourcePaths;
use wrtmon_common::metric::{MetricDescriptor, MetricSample};
use wrtmon_common::record::MappingRecord;

use crate::source::{self, SnapshotSource};

const MAX_FIELDS: usize = 7;
const MIN_FIELDS: usize = 6;
const UNKNOWN_DESCRIPTION: &str = "unknown";

pub struct UpnpSource {
    lease_paths: Vec<PathBuf>,
    count: Arc<MetricDescriptor>,
    info: Arc<MetricDescriptor>,
    lease: Arc<MetricDescriptor>,
}

impl UpnpSource {
    pub fn new(paths: &SourcePaths) -> Self {
        let labels: &[&str] = &[
            "protocol",
            "external_port",
            "internal_ip",
            "internal_port",
            "description",
        ];
        Self {
            lease_paths: paths.upnp_leases.clone(),
            count: MetricDescriptor::gauge(
                "openwrt_upnp_mapping_count",
                "total number of active upnp port mappings",
                &[],
            ),
            info: MetricDescriptor::gauge(
                "openwrt_upnp_mapping_info",
                "information about upnp port mappings",
                labels,
            ),
            lease: MetricDescriptor::gauge(
                "openwrt_upnp_mapping_lease_seconds",
                "upnp port mapping lease duration in seconds",
                labels,
            ),
        }
    }
}

#[async_trait]
impl SnapshotSource for UpnpSource {
    fn name(&self) -> &'static str {
        "upnp"
    }

    fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        vec![
            Arc::clone(&self.count),
            Arc::clone(&self.info),
            Arc::clone(&self.lease),
        ]
    }

    async fn collect(&self) -> Vec<MetricSample> {
        let mappings: Vec<MappingRecord> = match source::read_first_existing(&self.lease_paths) {
            Ok((path, lines)) => {
                debug!("reading UPnP leases from {}", path.display());
                parse_upnp_leases(&lines)
            }
            Err(e) => {
                warn!("failed to read UPnP leases: {e}");
                return Vec::new();
            }
        };

        let mut samples: Vec<MetricSample> = Vec::with_capacity(1 + mappings.len() * 2);
        samples.push(MetricSample::new(&self.count, Vec::new(), mappings.len() as f64));

        for mapping in mappings {
            let labels = vec![
                mapping.protocol,
                mapping.external_port,
                mapping.internal_ip,
                mapping.internal_port,
                mapping.description,
            ];
            samples.push(MetricSample::new(&self.info, labels.clone(), 1.0));
            samples.push(MetricSample::new(&self.lease, labels, mapping.lease_seconds));
        }

        samples
    }
}

/// Parses miniupnpd lease lines.
///
/// Two layouts exist:
/// * `PROTO:EXT_PORT:INT_IP:INT_PORT:LEASE:DESC`
/// * `PROTO:EXT_PORT:INT_IP:INT_PORT:TIMESTAMP:LEASE:DESC`
///
/// The description is the remainder of the line and may itself contain colons.
pub fn parse_upnp_leases<S: AsRef<str>>(lines: &[S]) -> Vec<MappingRecord> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_lease_line)
        .collect()
}

fn parse_lease_line(line: &str) -> Option<MappingRecord> {
    let fields: Vec<&str> = line.splitn(MAX_FIELDS, ':').collect();
    if fields.len() < MIN_FIELDS {
        debug!("skipping malformed UPnP lease: {line:?}");
        return None;
    }

    let (lease, description) = if fields.len() == MIN_FIELDS {
        (fields[4], fields[5])
    } else {
        (fields[5], fields[6])
    };

    let description: &str = match description.trim() {
        "" => UNKNOWN_DESCRIPTION,
        trimmed => trimmed,
    };

    Some(MappingRecord {
        protocol: fields[0].to_uppercase(),
        external_port: fields[1].to_string(),
        internal_ip: fields[2].to_string(),
        internal_port: fields[3].to_string(),
        lease_seconds: lease.trim().parse::<f64>().unwrap_or(0.0),
        description: description.to_string(),
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
