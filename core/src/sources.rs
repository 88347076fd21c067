//! Concrete [`SnapshotSource`](crate::source::SnapshotSource) implementations.
//!
//! Each submodule pairs a stateless parser (text layout -> typed records) with
//! the source that reads the system state and turns records into samples.

pub mod addresses;
pub mod devices;
pub mod interfaces;
pub mod latency;
pub mod upnp;

pub use addresses::AddressSource;
pub use devices::DeviceSource;
pub use interfaces::InterfaceSource;
pub use latency::LatencySource;
pub use upnp::UpnpSource;
