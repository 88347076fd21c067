use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpTypes};
use pnet::packet::icmpv6::{self, Icmpv6Code, Icmpv6Packet, Icmpv6Types};

pub const ECHO_HDR_LEN: usize = 8;
pub const ECHO_PAYLOAD_LEN: usize = 16;

/// Identifier and sequence number carried by an echo message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    pub identifier: u16,
    pub sequence: u16,
}

/// Builds an ICMPv4 echo request with its checksum filled in.
pub fn create_echo_request_v4(identifier: u16, sequence: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ECHO_HDR_LEN + ECHO_PAYLOAD_LEN];
    {
        let mut echo = icmp::echo_request::MutableEchoRequestPacket::new(&mut buffer)
            .context("creating echo request packet")?;
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode::new(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(&payload(sequence));
        echo.set_checksum(0);
    }

    let checksum: u16 = {
        let packet = IcmpPacket::new(&buffer).context("reading back echo request")?;
        icmp::checksum(&packet)
    };
    icmp::echo_request::MutableEchoRequestPacket::new(&mut buffer)
        .context("writing echo request checksum")?
        .set_checksum(checksum);

    Ok(buffer)
}

/// Builds an ICMPv6 echo request.
///
/// The checksum is left at zero: it covers the IPv6 pseudo header, which the
/// kernel fills in for raw ICMPv6 sockets.
pub fn create_echo_request_v6(identifier: u16, sequence: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer: Vec<u8> = vec![0u8; ECHO_HDR_LEN + ECHO_PAYLOAD_LEN];
    {
        let mut echo = icmpv6::echo_request::MutableEchoRequestPacket::new(&mut buffer)
            .context("creating ICMPv6 echo request packet")?;
        echo.set_icmpv6_type(Icmpv6Types::EchoRequest);
        echo.set_icmpv6_code(Icmpv6Code(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(&payload(sequence));
        echo.set_checksum(0);
    }
    Ok(buffer)
}

/// Returns the echo fields if `bytes` is an ICMPv4 echo reply.
pub fn parse_echo_reply_v4(bytes: &[u8]) -> Option<EchoReply> {
    let packet = IcmpPacket::new(bytes)?;
    if packet.get_icmp_type() != IcmpTypes::EchoReply {
        return None;
    }
    let reply = icmp::echo_reply::EchoReplyPacket::new(packet.packet())?;
    Some(EchoReply {
        identifier: reply.get_identifier(),
        sequence: reply.get_sequence_number(),
    })
}

/// Returns the echo fields if `bytes` is an ICMPv6 echo reply.
pub fn parse_echo_reply_v6(bytes: &[u8]) -> Option<EchoReply> {
    let packet = Icmpv6Packet::new(bytes)?;
    if packet.get_icmpv6_type() != Icmpv6Types::EchoReply {
        return None;
    }
    let reply = icmpv6::echo_reply::EchoReplyPacket::new(packet.packet())?;
    Some(EchoReply {
        identifier: reply.get_identifier(),
        sequence: reply.get_sequence_number(),
    })
}

fn payload(sequence: u16) -> [u8; ECHO_PAYLOAD_LEN] {
    let mut payload = [0u8; ECHO_PAYLOAD_LEN];
    payload[..2].copy_from_slice(&sequence.to_be_bytes());
    payload
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
