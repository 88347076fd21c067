//! # Probe Model
//!
//! Targets, per-target outcomes and the statistics folded out of raw
//! round-trip times.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::error::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Whether `addr` belongs to this family.
    pub fn matches(&self, addr: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }

    /// Label value exposed on the latency metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "IPv4",
            AddressFamily::V6 => "IPv6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A host to measure, pinned to one address family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeTarget {
    pub host: String,
    pub family: AddressFamily,
}

impl ProbeTarget {
    pub fn new(host: impl Into<String>, family: AddressFamily) -> Self {
        Self {
            host: host.into(),
            family,
        }
    }
}

/// Aggregated latency and loss for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeStats {
    pub resolved_address: IpAddr,
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    /// Percentage in `[0, 100]`.
    pub packet_loss: f64,
}

impl ProbeStats {
    /// Folds the round-trip times of received replies into statistics.
    ///
    /// Latencies are truncated to microseconds before being expressed in
    /// milliseconds. With no replies all latencies are zero and loss is 100%.
    pub fn from_round_trips(resolved_address: IpAddr, sent: usize, rtts: &[Duration]) -> Self {
        let received: usize = rtts.len().min(sent);
        let packet_loss: f64 = if sent == 0 {
            100.0
        } else {
            (sent - received) as f64 / sent as f64 * 100.0
        };

        let replies: &[Duration] = &rtts[..received];
        if replies.is_empty() {
            return Self {
                resolved_address,
                min_ms: 0.0,
                avg_ms: 0.0,
                max_ms: 0.0,
                packet_loss,
            };
        }

        let min: Duration = replies.iter().copied().min().unwrap_or_default();
        let max: Duration = replies.iter().copied().max().unwrap_or_default();
        let total: Duration = replies.iter().sum();
        let avg: Duration = total / replies.len() as u32;

        Self {
            resolved_address,
            min_ms: to_millis(min),
            avg_ms: to_millis(avg),
            max_ms: to_millis(max),
            packet_loss,
        }
    }
}

fn to_millis(rtt: Duration) -> f64 {
    rtt.as_micros() as f64 / 1000.0
}

/// Exactly one of these is produced per target per scrape.
#[derive(Debug)]
pub struct ProbeResult {
    pub target: ProbeTarget,
    pub outcome: Result<ProbeStats, ProbeError>,
}

impl ProbeResult {
    pub fn ok(target: ProbeTarget, stats: ProbeStats) -> Self {
        Self {
            target,
            outcome: Ok(stats),
        }
    }

    pub fn failed(target: ProbeTarget, error: ProbeError) -> Self {
        Self {
            target,
            outcome: Err(error),
        }
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
