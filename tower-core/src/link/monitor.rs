//! Link monitor implementation
//!
//! Counts traffic in both directions and ages the last telemetry frame so the
//! display can show "no telemetry received recently" without the core pushing
//! anything.

use tower_protocol::FramerStats;

/// Telemetry older than this is reported stale
pub const DEFAULT_TELEMETRY_TIMEOUT_MS: u32 = 1000;

/// Downlink condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Nothing received yet
    NoData,
    /// Telemetry arriving within the timeout
    Healthy,
    /// Last telemetry is older than the timeout
    Stale,
}

/// Traffic counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Uplink frames written
    pub frames_sent: u32,
    /// Uplink writes that failed
    pub send_failures: u32,
    /// Raw bytes read from the transport
    pub bytes_received: u32,
    /// Transport reads that failed
    pub read_failures: u32,
    /// Framer counters (frames, discarded bytes, false headers)
    pub framer: FramerStats,
}

/// Link monitor
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    /// Staleness threshold (ms)
    timeout_ms: u32,
    /// Time since last telemetry (ms), `None` before the first frame
    since_telemetry_ms: Option<u32>,
    stats: LinkStats,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_TELEMETRY_TIMEOUT_MS)
    }
}

impl LinkMonitor {
    /// Create a monitor with the given staleness threshold
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            since_telemetry_ms: None,
            stats: LinkStats::default(),
        }
    }

    /// Record a decoded telemetry frame
    pub fn telemetry_received(&mut self) {
        self.since_telemetry_ms = Some(0);
    }

    /// Record raw bytes read from the transport
    pub fn bytes_received(&mut self, count: usize) {
        self.stats.bytes_received = self.stats.bytes_received.wrapping_add(count as u32);
    }

    /// Copy the framer's counters
    pub fn update_framer(&mut self, stats: FramerStats) {
        self.stats.framer = stats;
    }

    /// Record an uplink write
    pub fn frame_sent(&mut self) {
        self.stats.frames_sent = self.stats.frames_sent.wrapping_add(1);
    }

    /// Record a failed uplink write
    pub fn send_failed(&mut self) {
        self.stats.send_failures = self.stats.send_failures.wrapping_add(1);
    }

    /// Record a failed transport read
    pub fn read_failed(&mut self) {
        self.stats.read_failures = self.stats.read_failures.wrapping_add(1);
    }

    /// Update time tracking
    ///
    /// # Arguments
    /// - `delta_ms`: Time elapsed since last update
    pub fn update_time(&mut self, delta_ms: u32) {
        if let Some(since) = self.since_telemetry_ms.as_mut() {
            *since = since.saturating_add(delta_ms);
        }
    }

    /// Current downlink condition
    pub fn status(&self) -> LinkStatus {
        match self.since_telemetry_ms {
            None => LinkStatus::NoData,
            Some(since) if since > self.timeout_ms => LinkStatus::Stale,
            Some(_) => LinkStatus::Healthy,
        }
    }

    /// Check if telemetry is fresh
    pub fn is_link_healthy(&self) -> bool {
        self.status() == LinkStatus::Healthy
    }

    /// Milliseconds since the last telemetry frame
    pub fn since_telemetry_ms(&self) -> Option<u32> {
        self.since_telemetry_ms
    }

    /// Get traffic counters
    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}
