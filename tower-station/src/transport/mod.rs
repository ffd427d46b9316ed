//! Byte transport abstractions
//!
//! The station never opens ports or enumerates devices. Whatever owns the
//! serial device hands over one transmit half and one receive half; the I/O
//! loops only need the capabilities below.
//!
//! ```text
//!   Station ──► LinkTx::write(frame)          (uplink loop)
//!   Station ◄── LinkRx::read_available(buf)   (downlink loop)
//! ```

mod stream;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use stream::{StreamRx, StreamTx};

use std::io;

use serde::{Deserialize, Serialize};

/// Transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Port closed or device gone
    Closed,
    /// Operating system I/O failure
    Io(io::ErrorKind),
    /// Write did not complete in time
    Timeout,
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => TransportError::Closed,
            kind => TransportError::Io(kind),
        }
    }
}

/// Transmit half
pub trait LinkTx: Send {
    /// Error type for write operations
    type Error: core::fmt::Debug;

    /// Write a complete frame
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Check if the port can take writes
    fn is_open(&self) -> bool;
}

/// Receive half
pub trait LinkRx: Send {
    /// Error type for read operations
    type Error: core::fmt::Debug;

    /// Copy whatever bytes are pending into `buf`
    ///
    /// Must not block for longer than a short timeout. `Ok(0)` means no data.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Check if the port can still deliver bytes
    fn is_open(&self) -> bool;
}

/// Serial port parameters
///
/// Handed to whatever opens the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path or name; empty means "first available port"
    pub port: String,
    /// Baud rate in bits per second
    pub baudrate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baudrate: 115200,
        }
    }
}
