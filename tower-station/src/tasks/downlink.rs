//! Downlink loop
//!
//! Drains the transport into the stream framer and dispatches every decoded
//! telemetry frame: mirror fields under the lock, then fan-out to consumers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embassy_time::{Duration, Instant};
use log::{debug, info, trace, warn};

use tower_protocol::{StreamFramer, Telemetry};

use crate::channels::{TelemetryBus, TelemetryRecord};
use crate::shared::SharedState;
use crate::transport::LinkRx;

use super::sleep_while_running;

/// Buffer size for one transport read
const RX_BUF_SIZE: usize = 64;

/// Everything the downlink loop owns
pub struct DownlinkTask<R> {
    pub rx: R,
    pub state: SharedState,
    pub bus: TelemetryBus,
    pub running: Arc<AtomicBool>,
    /// Sleep when no bytes are pending
    pub poll: Duration,
    /// Sleep after an error or while the port is closed
    pub backoff: Duration,
}

/// Downlink loop body, run on its own thread
pub fn downlink_task<R: LinkRx>(task: DownlinkTask<R>) {
    info!("Downlink task started");

    let DownlinkTask {
        mut rx,
        state,
        bus,
        running,
        poll,
        backoff,
    } = task;
    let mut framer = StreamFramer::new();
    let mut buf = [0u8; RX_BUF_SIZE];
    let mut last_tick = Instant::now();
    let mut was_open = true;

    while running.load(Ordering::Acquire) {
        // Age the last telemetry in whole milliseconds, keeping the remainder
        let elapsed_ms = last_tick.elapsed().as_millis();
        last_tick += Duration::from_millis(elapsed_ms);
        let elapsed_ms = u32::try_from(elapsed_ms).unwrap_or(u32::MAX);
        state.lock(|s| s.link.update_time(elapsed_ms));

        let open = rx.is_open();
        if open != was_open {
            if open {
                info!("Transport open, resuming receive");
            } else {
                warn!("Transport closed, waiting");
            }
            was_open = open;
        }
        if !open {
            sleep_while_running(&running, backoff);
            continue;
        }

        let pause = match rx.read_available(&mut buf) {
            Ok(0) => poll,
            Ok(n) => {
                trace!("RX: {} bytes", n);
                let mut frames = Vec::new();
                framer.feed(&buf[..n], |telemetry| frames.push(telemetry));
                let framer_stats = framer.stats();
                state.lock(|s| {
                    s.link.bytes_received(n);
                    s.link.update_framer(framer_stats);
                });

                for telemetry in frames {
                    dispatch(&state, &bus, telemetry);
                }
                // More may be pending; read again right away
                Duration::from_ticks(0)
            }
            Err(e) => {
                warn!("Transport read error: {:?}", e);
                state.lock(|s| s.link.read_failed());
                backoff
            }
        };

        sleep_while_running(&running, pause);
    }

    info!("Downlink task stopped");
}

/// Hand one telemetry frame to the mirror and the consumers
fn dispatch(state: &SharedState, bus: &TelemetryBus, telemetry: Telemetry) {
    let received_at = Instant::now();
    debug!(
        "Telemetry: switch={} roll={} pitch={} yaw={}",
        telemetry.switch, telemetry.roll, telemetry.pitch, telemetry.yaw
    );

    state.lock(|s| {
        s.control.apply_telemetry(telemetry, received_at.as_millis());
        s.link.telemetry_received();
    });

    bus.publish(TelemetryRecord {
        telemetry,
        received_at,
    });
}
