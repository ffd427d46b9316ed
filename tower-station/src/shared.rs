//! State shared between the I/O loops and the input path
//!
//! One lock guards the control state together with the station-side flags, so
//! a frame is always encoded from a consistent snapshot and the auto-send flag
//! is read under the same boundary as the fields it gates.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::Duration;
use heapless::Vec;

use tower_core::link::LinkMonitor;
use tower_core::ControlState;
use tower_protocol::MAX_UPLINK_FRAME_SIZE;

use crate::config::StationConfig;

/// Bytes of the most recent uplink frame
pub type FrameBytes = Vec<u8, MAX_UPLINK_FRAME_SIZE>;

/// Everything behind the station lock
#[derive(Debug, Clone)]
pub struct StationState {
    pub control: ControlState,
    pub link: LinkMonitor,
    /// Periodic sending enabled
    pub auto_send: bool,
    /// Auto-send period
    pub send_period: Duration,
    /// Last frame written to the transport
    pub last_sent: Option<FrameBytes>,
}

impl StationState {
    pub fn new(config: &StationConfig) -> Self {
        Self {
            control: ControlState::new(&config.control),
            link: LinkMonitor::new(config.link.telemetry_timeout_ms),
            auto_send: config.link.auto_send,
            send_period: config.link.send_period(),
            last_sent: None,
        }
    }
}

/// Cloneable handle to the station lock
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<Mutex<CriticalSectionRawMutex, RefCell<StationState>>>,
}

impl SharedState {
    pub fn new(state: StationState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RefCell::new(state))),
        }
    }

    /// Run `f` inside the critical section
    ///
    /// `f` must not call back into `lock` on the same handle.
    pub fn lock<R>(&self, f: impl FnOnce(&mut StationState) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> StationState {
        self.lock(|state| state.clone())
    }
}
