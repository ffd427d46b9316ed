//! Inter-thread communication
//!
//! Telemetry fan-out from the downlink loop to registered consumers, and the
//! one-shot send request picked up by the uplink loop.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use heapless::Vec;
use log::warn;

use tower_protocol::Telemetry;

/// Records buffered per consumer before new ones are dropped
pub const TELEMETRY_CHANNEL_SIZE: usize = 16;

/// Maximum number of telemetry consumers
pub const MAX_SUBSCRIBERS: usize = 4;

/// One decoded downlink frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    pub telemetry: Telemetry,
    /// When the frame was pulled off the wire
    pub received_at: Instant,
}

type TelemetryChannel = Channel<CriticalSectionRawMutex, TelemetryRecord, TELEMETRY_CHANNEL_SIZE>;

/// Request for one immediate uplink frame
pub type SendSignal = Signal<CriticalSectionRawMutex, ()>;

/// Subscriber limit reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFull;

type Subscribers = Vec<Arc<TelemetryChannel>, MAX_SUBSCRIBERS>;

/// Telemetry fan-out
#[derive(Clone)]
pub struct TelemetryBus {
    subscribers: Arc<Mutex<CriticalSectionRawMutex, RefCell<Subscribers>>>,
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(RefCell::new(Vec::new()))),
        }
    }

    /// Register a consumer
    pub fn subscribe(&self) -> Result<TelemetryReceiver, BusFull> {
        let channel = Arc::new(TelemetryChannel::new());
        self.subscribers.lock(|subs| {
            subs.borrow_mut()
                .push(channel.clone())
                .map_err(|_| BusFull)
        })?;
        Ok(TelemetryReceiver { channel })
    }

    /// Number of registered consumers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock(|subs| subs.borrow().len())
    }

    /// Hand a record to every consumer, dropping it for those that are full
    ///
    /// Consumers whose receiver has been dropped are unregistered first.
    pub fn publish(&self, record: TelemetryRecord) {
        let subscribers = self.subscribers.lock(|subs| {
            let mut subs = subs.borrow_mut();
            subs.retain(|channel| Arc::strong_count(channel) > 1);
            subs.clone()
        });
        for (index, channel) in subscribers.iter().enumerate() {
            if channel.try_send(record).is_err() {
                warn!("Telemetry consumer {} full, dropping record", index);
            }
        }
    }
}

/// Consumer end of the telemetry bus
pub struct TelemetryReceiver {
    channel: Arc<TelemetryChannel>,
}

impl TelemetryReceiver {
    /// Next buffered record, if any
    pub fn try_recv(&self) -> Option<TelemetryRecord> {
        self.channel.try_receive().ok()
    }

    /// Take every buffered record, oldest first
    pub fn drain(&self) -> impl Iterator<Item = TelemetryRecord> + '_ {
        core::iter::from_fn(move || self.try_recv())
    }

    /// Number of buffered records
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}
