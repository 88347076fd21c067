//! Privileged probing over raw ICMP sockets.
//!
//! This prober requires **root privileges** (or `CAP_NET_RAW`) to open the
//! Layer 4 transport channel. Every call opens its own socket and tags its
//! requests with a random identifier, since a raw socket sees every echo
//! reply arriving at the host.

use std::io;
use std::net::IpAddr;
use std::thread;
use std::time::{Duration, Instant};

use pnet::packet::Packet;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::icmpv6::Icmpv6Packet;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::{
    self, TransportChannelType, TransportProtocol, TransportReceiver, TransportSender,
};
use tracing::{debug, trace};
use wrtmon_common::config::ProbeConfig;
use wrtmon_common::error::ProbeError;
use wrtmon_protocols::icmp::{self as codec, EchoReply};

use super::Prober;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));
const CHANNEL_TYPE_ICMPV6: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv6(IpNextHeaderProtocols::Icmpv6));

pub struct IcmpProber;

impl Prober for IcmpProber {
    fn probe(&self, addr: IpAddr, cfg: &ProbeConfig) -> Result<Vec<Duration>, ProbeError> {
        let mut session = EchoSession::open(addr, cfg.count)
            .map_err(|source| ProbeError::Socket { addr, source })?;
        Ok(session.run(cfg))
    }
}

struct EchoSession {
    addr: IpAddr,
    identifier: u16,
    tx: TransportSender,
    rx: TransportReceiver,
    sent_at: Vec<Option<Instant>>,
    rtts: Vec<Option<Duration>>,
}

impl EchoSession {
    fn open(addr: IpAddr, count: usize) -> io::Result<Self> {
        let channel_type: TransportChannelType = match addr {
            IpAddr::V4(_) => CHANNEL_TYPE_ICMP,
            IpAddr::V6(_) => CHANNEL_TYPE_ICMPV6,
        };
        let (tx, rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, channel_type)?;

        Ok(Self {
            addr,
            identifier: rand::random(),
            tx,
            rx,
            sent_at: vec![None; count],
            rtts: vec![None; count],
        })
    }

    fn run(&mut self, cfg: &ProbeConfig) -> Vec<Duration> {
        for seq in 0..cfg.count {
            let next_send: Instant = Instant::now() + cfg.interval;
            if let Err(e) = self.send_request(seq) {
                debug!("echo request {seq} to {} not sent: {e}", self.addr);
            }

            if seq + 1 < cfg.count {
                // Replies may all be in before the interval is over.
                self.receive_until(next_send);
                thread::sleep(next_send.saturating_duration_since(Instant::now()));
            }
        }

        let deadline: Instant = Instant::now() + cfg.timeout;
        self.receive_until(deadline);

        self.rtts.iter().flatten().copied().collect()
    }

    fn send_request(&mut self, seq: usize) -> anyhow::Result<()> {
        let sequence: u16 =
            u16::try_from(seq).map_err(|_| anyhow::anyhow!("sequence {seq} exceeds 16 bits"))?;
        let sent = match self.addr {
            IpAddr::V4(_) => {
                let bytes: Vec<u8> = codec::create_echo_request_v4(self.identifier, sequence)?;
                let packet = IcmpPacket::new(&bytes)
                    .ok_or_else(|| anyhow::anyhow!("echo request too short"))?;
                self.tx.send_to(packet, self.addr)
            }
            IpAddr::V6(_) => {
                let bytes: Vec<u8> = codec::create_echo_request_v6(self.identifier, sequence)?;
                let packet = Icmpv6Packet::new(&bytes)
                    .ok_or_else(|| anyhow::anyhow!("ICMPv6 echo request too short"))?;
                self.tx.send_to(packet, self.addr)
            }
        };
        sent?;
        self.sent_at[seq] = Some(Instant::now());
        Ok(())
    }

    /// Collects replies until `deadline` or until every sent request has been answered.
    fn receive_until(&mut self, deadline: Instant) {
        loop {
            let now: Instant = Instant::now();
            if now >= deadline || self.all_answered() {
                return;
            }

            match self.next_reply(deadline - now) {
                Ok(Some(reply)) => self.record(reply),
                Ok(None) => {}
                Err(e) => {
                    debug!("receiving from {} failed: {e}", self.addr);
                    return;
                }
            }
        }
    }

    /// Waits for one packet; `None` for timeouts and unrelated traffic.
    fn next_reply(&mut self, wait: Duration) -> io::Result<Option<EchoReply>> {
        let received: Option<(Vec<u8>, IpAddr)> = match self.addr {
            IpAddr::V4(_) => transport::icmp_packet_iter(&mut self.rx)
                .next_with_timeout(wait)?
                .map(|(packet, source)| (packet.packet().to_vec(), source)),
            IpAddr::V6(_) => transport::icmpv6_packet_iter(&mut self.rx)
                .next_with_timeout(wait)?
                .map(|(packet, source)| (packet.packet().to_vec(), source)),
        };

        let Some((bytes, source)) = received else {
            return Ok(None);
        };
        if source != self.addr {
            return Ok(None);
        }

        let reply: Option<EchoReply> = match self.addr {
            IpAddr::V4(_) => codec::parse_echo_reply_v4(&bytes),
            IpAddr::V6(_) => codec::parse_echo_reply_v6(&bytes),
        };
        Ok(reply.filter(|reply| reply.identifier == self.identifier))
    }

    fn record(&mut self, reply: EchoReply) {
        let seq: usize = reply.sequence as usize;
        let Some(Some(sent)) = self.sent_at.get(seq).copied() else {
            return;
        };
        if self.rtts[seq].is_none() {
            let rtt: Duration = sent.elapsed();
            trace!("reply {seq} from {} in {rtt:?}", self.addr);
            self.rtts[seq] = Some(rtt);
        }
    }

    fn all_answered(&self) -> bool {
        self.sent_at
            .iter()
            .zip(&self.rtts)
            .all(|(sent, rtt)| sent.is_none() || rtt.is_some())
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
