//! Link health monitoring
//!
//! Tracks traffic counters and how long ago telemetry last arrived.

pub mod monitor;

pub use monitor::{LinkMonitor, LinkStats, LinkStatus, DEFAULT_TELEMETRY_TIMEOUT_MS};
