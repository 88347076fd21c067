//! Packet codecs used by the probers.

pub mod icmp;
