use std::io;
use std::net::IpAddr;

use thiserror::Error;

use crate::probe::AddressFamily;

/// Raised when a sample does not fit the family it claims to belong to.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    #[error("metric {name} expects {expected} label values, got {actual}")]
    LabelMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Per-target failures of the probe dispatcher.
///
/// Packet loss is never represented here: a target that answers nothing is a
/// valid measurement with 100% loss.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("no {family} address found for {host}")]
    NoAddress { host: String, family: AddressFamily },

    #[error("failed to open probe socket towards {addr}: {source}")]
    Socket {
        addr: IpAddr,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid listen address '{0}'")]
    ListenAddress(String),

    #[error("metrics path must start with '/', got '{0}'")]
    MetricsPath(String),
}
