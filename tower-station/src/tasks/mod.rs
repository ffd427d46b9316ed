//! Station I/O loops
//!
//! Each loop runs on its own named thread and stops cooperatively when its
//! running flag is cleared. Neither loop ends on a bad frame or a failed
//! transport call.

pub mod downlink;
pub mod uplink;

pub use downlink::{downlink_task, DownlinkTask};
pub use uplink::{uplink_task, UplinkTask};

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use embassy_time::{Duration, Instant};

/// Longest single sleep, so a stop request is seen promptly
const SLEEP_SLICE: Duration = Duration::from_millis(5);

/// Sleep for `period`, returning early once `running` is cleared
pub(crate) fn sleep_while_running(running: &AtomicBool, period: Duration) {
    let deadline = Instant::now() + period;
    loop {
        if !running.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        let step = (deadline - now).min(SLEEP_SLICE);
        thread::sleep(std::time::Duration::from_micros(step.as_micros()));
    }
}
