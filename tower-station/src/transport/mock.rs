//! In-memory transport for testing
//!
//! A [`MockLink`] hands out a transmit and a receive half that share one
//! buffer set with the test, so a test can inject received bytes and inspect
//! written frames while the station's threads own the halves.

use std::cell::RefCell;
use std::sync::Arc;
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::{LinkRx, LinkTx, TransportError};

#[derive(Debug)]
struct MockInner {
    open: bool,
    fail_writes: bool,
    fail_reads: bool,
    writes: Vec<Vec<u8>>,
    rx_buffer: Vec<u8>,
}

type Shared = Arc<Mutex<CriticalSectionRawMutex, RefCell<MockInner>>>;

/// Test side of an in-memory link
///
/// # Example
///
/// ```ignore
/// use tower_station::transport::mock::MockLink;
/// use tower_station::transport::{LinkRx, LinkTx};
///
/// let link = MockLink::new();
/// let (mut tx, mut rx) = link.split();
///
/// tx.write(&[0xAA, 0x00, 0x00, 0xBB]).unwrap();
/// assert_eq!(link.tx_buffer(), vec![0xAA, 0x00, 0x00, 0xBB]);
///
/// link.inject_rx_data(&[0xCC, 0x01]);
/// let mut buf = [0u8; 8];
/// assert_eq!(rx.read_available(&mut buf).unwrap(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockLink {
    inner: Shared,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    /// Create an open link with empty buffers
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RefCell::new(MockInner {
                open: true,
                fail_writes: false,
                fail_reads: false,
                writes: Vec::new(),
                rx_buffer: Vec::new(),
            }))),
        }
    }

    /// Create the two halves handed to the station
    pub fn split(&self) -> (MockTx, MockRx) {
        (
            MockTx {
                inner: self.inner.clone(),
            },
            MockRx {
                inner: self.inner.clone(),
            },
        )
    }

    fn with<R>(&self, f: impl FnOnce(&mut MockInner) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Queue bytes for the receive half
    pub fn inject_rx_data(&self, data: &[u8]) {
        self.with(|inner| inner.rx_buffer.extend_from_slice(data));
    }

    /// Bytes not yet read by the receive half
    pub fn pending_rx(&self) -> usize {
        self.with(|inner| inner.rx_buffer.len())
    }

    /// Every written byte, concatenated
    pub fn tx_buffer(&self) -> Vec<u8> {
        self.with(|inner| inner.writes.concat())
    }

    /// Each `write` call as its own frame
    pub fn written_frames(&self) -> Vec<Vec<u8>> {
        self.with(|inner| inner.writes.clone())
    }

    /// Forget captured writes
    pub fn clear_tx_buffer(&self) {
        self.with(|inner| inner.writes.clear());
    }

    /// Open or close both halves
    pub fn set_open(&self, open: bool) {
        self.with(|inner| inner.open = open);
    }

    /// Make writes fail with an I/O error
    pub fn fail_writes(&self, fail: bool) {
        self.with(|inner| inner.fail_writes = fail);
    }

    /// Make reads fail with an I/O error
    pub fn fail_reads(&self, fail: bool) {
        self.with(|inner| inner.fail_reads = fail);
    }
}

/// Transmit half of a [`MockLink`]
#[derive(Debug)]
pub struct MockTx {
    inner: Shared,
}

impl LinkTx for MockTx {
    type Error = TransportError;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if !inner.open {
                return Err(TransportError::Closed);
            }
            if inner.fail_writes {
                return Err(TransportError::Io(std::io::ErrorKind::Other));
            }
            inner.writes.push(data.to_vec());
            Ok(())
        })
    }

    fn is_open(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().open)
    }
}

/// Receive half of a [`MockLink`]
#[derive(Debug)]
pub struct MockRx {
    inner: Shared,
}

impl LinkRx for MockRx {
    type Error = TransportError;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.inner.lock(|cell| {
            let mut inner = cell.borrow_mut();
            if !inner.open {
                return Err(TransportError::Closed);
            }
            if inner.fail_reads {
                return Err(TransportError::Io(std::io::ErrorKind::Other));
            }
            let to_read = core::cmp::min(buf.len(), inner.rx_buffer.len());
            buf[..to_read].copy_from_slice(&inner.rx_buffer[..to_read]);
            inner.rx_buffer.drain(..to_read);
            Ok(to_read)
        })
    }

    fn is_open(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().open)
    }
}
