//! # Process Configuration
//!
//! Everything here is read once at startup and never mutated afterwards. The
//! values are passed by reference into the sources and the probe dispatcher.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;
use crate::probe::{AddressFamily, ProbeTarget};

pub const DEFAULT_LISTEN_ADDRESS: &str = ":9101";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

pub const ENV_TARGETS_V4: &str = "PING_TARGETS";
pub const ENV_TARGETS_V6: &str = "PING_TARGETS_V6";
pub const ENV_COUNT: &str = "PING_COUNT";
pub const ENV_INTERVAL: &str = "PING_INTERVAL";
pub const ENV_TIMEOUT: &str = "PING_TIMEOUT";
pub const ENV_CONCURRENCY: &str = "PING_CONCURRENCY";
pub const ENV_PRIVILEGED: &str = "PING_PRIVILEGED";

const DEFAULT_COUNT: usize = 10;
/// Echo sequence numbers are 16 bits wide.
pub const MAX_COUNT: usize = u16::MAX as usize;
const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_CONCURRENCY: usize = 10;

pub struct Config {
    /// Address the exposition endpoint binds to. A bare `:port` binds every interface.
    pub listen_address: String,
    /// Path under which the metrics are served.
    pub metrics_path: String,
    pub probe: ProbeConfig,
    pub paths: SourcePaths,
}

impl Config {
    pub fn new(listen_address: &str, metrics_path: &str, probe: ProbeConfig) -> Result<Self, ConfigError> {
        if !metrics_path.starts_with('/') {
            return Err(ConfigError::MetricsPath(metrics_path.to_string()));
        }

        Ok(Self {
            listen_address: normalize_listen_address(listen_address)?,
            metrics_path: metrics_path.to_string(),
            probe,
            paths: SourcePaths::default(),
        })
    }
}

/// Turns `:9101` into `0.0.0.0:9101`; anything else must already carry a host.
pub fn normalize_listen_address(addr: &str) -> Result<String, ConfigError> {
    let addr = addr.trim();
    let Some((host, port)) = addr.rsplit_once(':') else {
        return Err(ConfigError::ListenAddress(addr.to_string()));
    };

    if port.parse::<u16>().is_err() {
        return Err(ConfigError::ListenAddress(addr.to_string()));
    }

    if host.is_empty() {
        Ok(format!("0.0.0.0:{port}"))
    } else {
        Ok(addr.to_string())
    }
}

/// Settings of the latency source and its probe dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub targets: Vec<ProbeTarget>,
    /// Echo requests sent per target.
    pub count: usize,
    /// Delay between two echo requests to the same target.
    pub interval: Duration,
    /// How long to wait for replies after the last request.
    pub timeout: Duration,
    /// Upper bound on simultaneously probed targets.
    pub concurrency: usize,
    /// Raw ICMP sockets (needs root or CAP_NET_RAW) instead of timed TCP handshakes.
    pub privileged: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            count: DEFAULT_COUNT,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
            privileged: true,
        }
    }
}

impl ProbeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a key lookup. Malformed or non-positive values
    /// keep their default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(list) = lookup(ENV_TARGETS_V4) {
            cfg.targets.extend(parse_targets(&list, AddressFamily::V4));
        }
        if let Some(list) = lookup(ENV_TARGETS_V6) {
            cfg.targets.extend(parse_targets(&list, AddressFamily::V6));
        }

        if let Some(count) = read(&lookup, ENV_COUNT, parse_count) {
            cfg.count = count;
        }
        if let Some(interval) = read(&lookup, ENV_INTERVAL, parse_duration) {
            cfg.interval = interval;
        }
        if let Some(timeout) = read(&lookup, ENV_TIMEOUT, parse_duration) {
            cfg.timeout = timeout;
        }
        if let Some(concurrency) = read(&lookup, ENV_CONCURRENCY, parse_positive) {
            cfg.concurrency = concurrency;
        }
        if let Some(privileged) = read(&lookup, ENV_PRIVILEGED, parse_bool) {
            cfg.privileged = privileged;
        }

        cfg
    }
}

fn read<F, T>(lookup: &F, key: &str, parse: fn(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let raw: String = lookup(key)?;
    let parsed: Option<T> = parse(raw.trim());
    if parsed.is_none() {
        debug!("ignoring malformed {key}={raw:?}, keeping default");
    }
    parsed
}

/// Splits a comma-separated host list, dropping empty entries.
pub fn parse_targets(list: &str, family: AddressFamily) -> Vec<ProbeTarget> {
    list.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(|host| ProbeTarget::new(host, family))
        .collect()
}

fn parse_positive(value: &str) -> Option<usize> {
    value.parse::<usize>().ok().filter(|n| *n > 0)
}

fn parse_count(value: &str) -> Option<usize> {
    parse_positive(value).filter(|n| *n <= MAX_COUNT)
}

fn parse_duration(value: &str) -> Option<Duration> {
    humantime::parse_duration(value).ok().filter(|d| !d.is_zero())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Where the file-backed sources look for their data. First existing path wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub dhcp_leases: Vec<PathBuf>,
    /// Command listing the neighbour table. `None` goes straight to `arp_table`.
    pub neighbor_command: Option<Vec<String>>,
    pub arp_table: PathBuf,
    pub upnp_leases: Vec<PathBuf>,
    pub net_dev: PathBuf,
    pub uptime: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            dhcp_leases: vec![
                PathBuf::from("/tmp/dhcp.leases"),
                PathBuf::from("/var/lib/misc/dnsmasq.leases"),
                PathBuf::from("/tmp/dnsmasq.leases"),
            ],
            neighbor_command: Some(vec!["ip".into(), "neigh".into(), "show".into()]),
            arp_table: PathBuf::from("/proc/net/arp"),
            upnp_leases: vec![
                PathBuf::from("/var/run/miniupnpd.leases"),
                PathBuf::from("/tmp/miniupnpd.leases"),
                PathBuf::from("/var/lib/miniupnpd/leases"),
            ],
            net_dev: PathBuf::from("/proc/net/dev"),
            uptime: PathBuf::from("/proc/uptime"),
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
