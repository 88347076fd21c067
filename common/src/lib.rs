//! # wrtmon common types
//!
//! Values shared by every crate in the workspace: the process configuration,
//! the metric model handed to the exposition layer, the typed records each
//! snapshot source produces, and the probe data passed between the dispatcher
//! and the latency source.

pub mod config;
pub mod error;
pub mod metric;
pub mod probe;
pub mod record;
