//! Downlink stream framer
//!
//! Turns an arbitrarily chunked byte stream into validated telemetry frames.
//! Bytes ahead of a header are dropped, an incomplete frame is kept until the
//! rest arrives, and a header that fails validation is skipped one byte at a
//! time so the scan always makes progress.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::telemetry::{Telemetry, DOWNLINK_HEADER, TELEMETRY_FRAME_LEN};

/// Receive buffer capacity
///
/// Must hold at least one full frame; anything larger only reduces how often
/// the buffer is compacted.
pub const RX_BUFFER_SIZE: usize = 64;

const _: () = assert!(RX_BUFFER_SIZE >= TELEMETRY_FRAME_LEN);

/// Running counters kept by the framer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FramerStats {
    /// Frames decoded
    pub frames: u32,
    /// Bytes thrown away while hunting for a header
    pub discarded_bytes: u32,
    /// Header bytes that did not start a valid frame
    pub false_headers: u32,
}

/// Stream framer for downlink telemetry
#[derive(Debug, Clone, Default)]
pub struct StreamFramer {
    buffer: Vec<u8, RX_BUFFER_SIZE>,
    stats: FramerStats,
}

impl StreamFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            stats: FramerStats::default(),
        }
    }

    /// Drop any buffered partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes held waiting for the rest of a frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Counters since creation
    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Feed a chunk of received bytes
    ///
    /// The whole chunk is taken in before this returns, whatever `on_frame`
    /// does. Every frame it completes is passed to `on_frame` in stream order;
    /// a trailing partial frame stays buffered for the next chunk.
    ///
    /// Returns the number of frames completed.
    pub fn feed(&mut self, chunk: &[u8], mut on_frame: impl FnMut(Telemetry)) -> usize {
        let mut pending = chunk;
        let mut completed = 0;
        loop {
            while let Some(telemetry) = self.next_frame() {
                on_frame(telemetry);
                completed += 1;
            }
            if pending.is_empty() {
                return completed;
            }
            // `next_frame` leaves less than one frame buffered, so there is room
            self.fill(&mut pending);
        }
    }

    /// Move as much pending input into the buffer as fits
    fn fill(&mut self, pending: &mut &[u8]) {
        let room = self.buffer.capacity() - self.buffer.len();
        let (now, later) = pending.split_at(room.min(pending.len()));
        // `now` fits by construction
        let _ = self.buffer.extend_from_slice(now);
        *pending = later;
    }

    /// Extract the next frame from the buffer, if one is complete
    fn next_frame(&mut self) -> Option<Telemetry> {
        loop {
            match self.buffer.iter().position(|&b| b == DOWNLINK_HEADER) {
                Some(0) => {}
                Some(start) => self.discard(start),
                None => {
                    let len = self.buffer.len();
                    self.discard(len);
                    return None;
                }
            }

            if self.buffer.len() < TELEMETRY_FRAME_LEN {
                return None;
            }

            match Telemetry::decode(&self.buffer[..TELEMETRY_FRAME_LEN]) {
                Ok(telemetry) => {
                    self.consume(TELEMETRY_FRAME_LEN);
                    self.stats.frames = self.stats.frames.wrapping_add(1);
                    return Some(telemetry);
                }
                Err(_) => {
                    // False-positive header, skip it and rescan
                    self.consume(1);
                    self.stats.false_headers = self.stats.false_headers.wrapping_add(1);
                }
            }
        }
    }

    /// Drop garbage bytes from the front
    fn discard(&mut self, count: usize) {
        self.consume(count);
        self.stats.discarded_bytes = self.stats.discarded_bytes.wrapping_add(count as u32);
    }

    fn consume(&mut self, count: usize) {
        let len = self.buffer.len();
        self.buffer.copy_within(count..len, 0);
        self.buffer.truncate(len - count);
    }
}
