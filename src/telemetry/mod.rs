//! Telemetry
//!
//! Counters for the watch loop and the HTTP surface that exposes them.

pub mod metrics;
pub mod server;

pub use metrics::*;
pub use server::*;
