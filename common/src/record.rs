//! Typed records produced by the snapshot sources before they are turned
//! into metric samples.

/// A device seen in the DHCP leases or the neighbour table.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub hostname: Option<String>,
    pub ip: String,
    pub mac: String,
    pub online_seconds: f64,
    pub lease_remaining_seconds: f64,
}

impl DeviceRecord {
    /// Identity of a device. Either part may be empty.
    pub fn key(&self) -> (&str, &str) {
        (&self.mac, &self.ip)
    }
}

/// Counters of one entry in the kernel's interface statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceRecord {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
}

/// One active UPnP port forward.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRecord {
    pub protocol: String,
    pub external_port: String,
    pub internal_ip: String,
    pub internal_port: String,
    /// Zero means permanent.
    pub lease_seconds: f64,
    pub description: String,
}

/// An address configured on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub interface: String,
    pub ip: String,
    /// `"4"` or `"6"`.
    pub version: &'static str,
    pub scope: &'static str,
}
