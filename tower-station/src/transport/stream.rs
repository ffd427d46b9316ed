//! Adapters for `std::io` byte streams
//!
//! Wraps any reader/writer pair (a serial port handle with a read timeout, a
//! TCP socket, a pipe) as a link half. A read that times out is "no data";
//! end of stream or a broken pipe closes the half for good.

use std::io::{self, Read, Write};

use super::{LinkRx, LinkTx, TransportError};

/// Transmit half over an `io::Write`
#[derive(Debug)]
pub struct StreamTx<W> {
    inner: W,
    open: bool,
}

impl<W: Write + Send> StreamTx<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, open: true }
    }

    /// Give back the wrapped writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> LinkTx for StreamTx<W> {
    type Error = TransportError;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        let result = self
            .inner
            .write_all(data)
            .and_then(|()| self.inner.flush())
            .map_err(TransportError::from);

        if result == Err(TransportError::Closed) {
            self.open = false;
        }
        result
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Receive half over an `io::Read`
#[derive(Debug)]
pub struct StreamRx<R> {
    inner: R,
    open: bool,
}

impl<R: Read + Send> StreamRx<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, open: true }
    }

    /// Give back the wrapped reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Send> LinkRx for StreamRx<R> {
    type Error = TransportError;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if !self.open {
            return Err(TransportError::Closed);
        }
        match self.inner.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.open = false;
                Err(TransportError::Closed)
            }
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(e) => {
                let err = TransportError::from(e);
                if err == TransportError::Closed {
                    self.open = false;
                }
                Err(err)
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
