//! Unprivileged probing: times TCP handshakes instead of ICMP echoes.
//!
//! Any answer from the target counts as a reply, including a refused
//! connection, since the RST still travelled the full round trip.

use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use wrtmon_common::config::ProbeConfig;
use wrtmon_common::error::ProbeError;

use super::Prober;

const DEFAULT_PORT: u16 = 443;

pub struct TcpConnectProber {
    pub port: u16,
}

impl Default for TcpConnectProber {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl Prober for TcpConnectProber {
    fn probe(&self, addr: IpAddr, cfg: &ProbeConfig) -> Result<Vec<Duration>, ProbeError> {
        let socket_addr: SocketAddr = SocketAddr::new(addr, self.port);
        let mut rtts: Vec<Duration> = Vec::with_capacity(cfg.count);
        let rounds: u32 = u32::try_from(cfg.count).unwrap_or(u32::MAX);
        let deadline: Instant =
            Instant::now() + cfg.interval.saturating_mul(rounds).saturating_add(cfg.timeout);

        for attempt in 0..cfg.count {
            if attempt > 0 {
                thread::sleep(cfg.interval.min(deadline.saturating_duration_since(Instant::now())));
            }
            let Some(budget) = attempt_budget(deadline, Instant::now(), cfg.timeout) else {
                break;
            };
            if let Some(rtt) = handshake(socket_addr, budget)? {
                rtts.push(rtt);
            }
        }

        Ok(rtts)
    }
}

/// Time one handshake may take so the whole round stays within `deadline`.
fn attempt_budget(deadline: Instant, now: Instant, timeout: Duration) -> Option<Duration> {
    let remaining: Duration = deadline.saturating_duration_since(now);
    if remaining.is_zero() {
        return None;
    }
    Some(timeout.min(remaining))
}

/// Round-trip time of one handshake, `None` when the target stayed silent.
fn handshake(socket_addr: SocketAddr, timeout: Duration) -> Result<Option<Duration>, ProbeError> {
    let start: Instant = Instant::now();
    match TcpStream::connect_timeout(&socket_addr, timeout) {
        Ok(_) => Ok(Some(start.elapsed())),
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => Ok(Some(start.elapsed())),
        Err(e) if is_local_failure(&e) => Err(ProbeError::Socket {
            addr: socket_addr.ip(),
            source: e,
        }),
        Err(_) => Ok(None),
    }
}

fn is_local_failure(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::AddrNotAvailable | io::ErrorKind::Unsupported
    )
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
    use std::net::{Ipv4Addr, TcpListener};

    fn quick_config(count: usize) -> ProbeConfig {
        ProbeConfig {
            count,
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(500),
            ..ProbeConfig::default()
        }
    }

    #[test]
    fn listening_port_answers_every_handshake() {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let prober = TcpConnectProber {
            port: listener.local_addr().unwrap().port(),
        };

        let rtts = prober.probe(IpAddr::V4(Ipv4Addr::LOCALHOST), &quick_config(3)).unwrap();
        assert_eq!(rtts.len(), 3);
    }

    #[test]
    fn refused_connection_still_counts_as_a_reply() {
        let port = {
            let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            listener.local_addr().unwrap().port()
        };
        let prober = TcpConnectProber { port };

        let rtts = prober.probe(IpAddr::V4(Ipv4Addr::LOCALHOST), &quick_config(2)).unwrap();
        assert_eq!(rtts.len(), 2);
    }

    #[test]
    #[ignore]
    fn unroutable_address_times_out_as_loss() {
        let prober = TcpConnectProber::default();
        let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1));
        let rtts = prober.probe(ip, &quick_config(1)).unwrap();
        assert!(rtts.is_empty());
    }

    #[test]
    fn attempt_budget_shrinks_to_the_round_deadline() {
        let now = Instant::now();
        let timeout = Duration::from_millis(500);

        assert_eq!(attempt_budget(now + Duration::from_secs(2), now, timeout), Some(timeout));
        assert_eq!(
            attempt_budget(now + Duration::from_millis(120), now, timeout),
            Some(Duration::from_millis(120))
        );
        assert_eq!(attempt_budget(now, now, timeout), None);
        assert_eq!(attempt_budget(now, now + Duration::from_millis(1), timeout), None);
    }

    #[test]
    #[ignore]
    fn silent_target_round_stays_within_one_timeout() {
        let prober = TcpConnectProber::default();
        let ip = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 1));
        let cfg = ProbeConfig {
            count: 3,
            interval: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
            ..ProbeConfig::default()
        };

        let start = Instant::now();
        let rtts = prober.probe(ip, &cfg).unwrap();

        assert!(rtts.is_empty());
        assert!(start.elapsed() < Duration::from_millis(500), "round took {:?}", start.elapsed());
    }
}
