//! # Probe Dispatcher
//!
//! Measures latency and loss towards a fixed list of targets, running at most
//! `concurrency` probes at the same time.
//!
//! The two seams are traits so the dispatcher can be exercised without
//! touching the network:
//! * [`Resolver`] turns a hostname into addresses.
//! * [`Prober`] performs the blocking round-trip measurement against one address.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wrtmon_common::config::ProbeConfig;
use wrtmon_common::error::ProbeError;

mod dispatcher;
mod icmp;
mod resolver;
mod tcp;

pub use dispatcher::ProbeDispatcher;
pub use icmp::IcmpProber;
pub use resolver::SystemResolver;
pub use tcp::TcpConnectProber;

/// Performs one probe run against a resolved address.
///
/// Implementations block the calling thread for at most
/// `count * interval + timeout` and return the round-trip times of the
/// replies they received. Lost packets are simply absent from the result.
pub trait Prober: Send + Sync {
    fn probe(&self, addr: IpAddr, cfg: &ProbeConfig) -> Result<Vec<Duration>, ProbeError>;
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Picks the prober matching the configured privilege mode.
pub fn prober_for(cfg: &ProbeConfig) -> Arc<dyn Prober> {
    if cfg.privileged {
        Arc::new(IcmpProber)
    } else {
        Arc::new(TcpConnectProber::default())
    }
}
