//! # wrtmon collection engine
//!
//! * [`source`]: the contract every data source implements.
//! * [`sources`]: the concrete sources (interfaces, addresses, devices, UPnP, latency).
//! * [`probe`]: the bounded concurrent probe dispatcher behind the latency source.
//! * [`registry`]: the fixed set of sources scraped together.
//! * [`exposition`]: rendering of a scrape into the Prometheus text format.

pub mod exposition;
pub mod probe;
pub mod registry;
pub mod source;
pub mod sources;
