//! Uplink loop
//!
//! Every period: snapshot the control state, pick the frame for the current
//! mode, encode it and write it, if auto-send is on or a one-shot send was
//! requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace, warn};

use tower_protocol::Uplink;

use crate::channels::SendSignal;
use crate::shared::{FrameBytes, SharedState};
use crate::transport::LinkTx;

use super::sleep_while_running;

/// Everything the uplink loop owns
pub struct UplinkTask<T> {
    pub tx: T,
    pub state: SharedState,
    pub send_request: Arc<SendSignal>,
    pub running: Arc<AtomicBool>,
    /// Skip auto-send writes that repeat the previous frame
    pub send_on_change: bool,
}

/// Uplink loop body, run on its own thread
pub fn uplink_task<T: LinkTx>(task: UplinkTask<T>) {
    info!("Uplink task started");

    let UplinkTask {
        mut tx,
        state,
        send_request,
        running,
        send_on_change,
    } = task;
    let mut previous: Option<FrameBytes> = None;

    while running.load(Ordering::Acquire) {
        let requested = send_request.signaled();
        if requested {
            send_request.reset();
        }

        // One snapshot per iteration; encoding happens outside the lock
        let (auto_send, period, uplink) =
            state.lock(|s| (s.auto_send, s.send_period, s.control.uplink()));

        if auto_send || requested {
            if let Some(frame) = encode(&uplink) {
                let unchanged = previous.as_ref() == Some(&frame);
                if send_on_change && unchanged && !requested {
                    trace!("Frame unchanged, skipping");
                } else if transmit(&mut tx, &state, &frame) {
                    previous = Some(frame);
                }
            }
        }

        sleep_while_running(&running, period);
    }

    info!("Uplink task stopped");
}

fn encode(uplink: &Uplink) -> Option<FrameBytes> {
    match uplink.encode_to_vec() {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!("Failed to encode {:?} frame: {:?}", uplink.kind(), e);
            None
        }
    }
}

/// Write one frame and record the outcome
fn transmit<T: LinkTx>(tx: &mut T, state: &SharedState, frame: &FrameBytes) -> bool {
    if !tx.is_open() {
        debug!("Transport closed, frame not sent");
        state.lock(|s| s.link.send_failed());
        return false;
    }

    match tx.write(frame) {
        Ok(()) => {
            trace!("TX: {} bytes", frame.len());
            state.lock(|s| {
                s.link.frame_sent();
                s.last_sent = Some(frame.clone());
            });
            true
        }
        Err(e) => {
            warn!("Uplink write failed: {:?}", e);
            state.lock(|s| s.link.send_failed());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use embassy_time::Duration;
    use tower_core::Mode;
    use tower_protocol::UplinkKind;

    use crate::config::StationConfig;
    use crate::shared::StationState;
    use crate::transport::mock::MockLink;

    struct Harness {
        link: MockLink,
        state: SharedState,
        send_request: Arc<SendSignal>,
        running: Arc<AtomicBool>,
        handle: thread::JoinHandle<()>,
    }

    impl Harness {
        fn start(configure: impl FnOnce(&mut StationState), send_on_change: bool) -> Self {
            let link = MockLink::new();
            let (tx, _rx) = link.split();

            let mut initial = StationState::new(&StationConfig::default());
            initial.send_period = Duration::from_millis(2);
            configure(&mut initial);

            let state = SharedState::new(initial);
            let send_request = Arc::new(SendSignal::new());
            let running = Arc::new(AtomicBool::new(true));

            let task = UplinkTask {
                tx,
                state: state.clone(),
                send_request: send_request.clone(),
                running: running.clone(),
                send_on_change,
            };
            let handle = thread::spawn(move || uplink_task(task));

            Self {
                link,
                state,
                send_request,
                running,
                handle,
            }
        }

        fn stop(self) -> MockLink {
            self.running.store(false, Ordering::Release);
            self.handle.join().unwrap();
            self.link
        }
    }

    fn stop_frame() -> FrameBytes {
        Uplink::Stop.encode_to_vec().unwrap()
    }

    fn settle() {
        thread::sleep(std::time::Duration::from_millis(40));
    }

    /// Poll until `done` holds, giving up after two seconds
    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..400 {
            if done() {
                return true;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_auto_send_writes_periodically() {
        let harness = Harness::start(|s| s.auto_send = true, false);
        assert!(wait_for(|| harness.link.written_frames().len() >= 3));
        let link = harness.stop();

        let frames = link.written_frames();
        for frame in &frames {
            assert_eq!(&frame[..], &stop_frame()[..]);
        }
    }

    #[test]
    fn test_nothing_sent_when_disabled() {
        let harness = Harness::start(|_| {}, false);
        settle();
        let link = harness.stop();
        assert!(link.written_frames().is_empty());
    }

    #[test]
    fn test_one_shot_send() {
        let harness = Harness::start(|_| {}, false);
        harness.send_request.signal(());
        assert!(wait_for(|| !harness.send_request.signaled()));
        settle();

        let last = harness.state.lock(|s| s.last_sent.clone());
        let link = harness.stop();

        assert_eq!(link.written_frames().len(), 1);
        assert_eq!(last, Some(stop_frame()));
    }

    #[test]
    fn test_frame_follows_mode() {
        let harness = Harness::start(
            |s| {
                s.auto_send = true;
                s.control.request_mode(Mode::Tower).unwrap();
            },
            false,
        );
        assert!(wait_for(|| !harness.link.written_frames().is_empty()));
        let link = harness.stop();

        let frames = link.written_frames();
        assert_eq!(frames[0].len(), UplinkKind::Tower.frame_len());
        assert_eq!(frames[0][1], UplinkKind::Tower.tag());
    }

    #[test]
    fn test_send_on_change_skips_repeats() {
        let harness = Harness::start(|s| s.auto_send = true, true);
        assert!(wait_for(|| !harness.link.written_frames().is_empty()));
        settle();
        assert_eq!(harness.link.written_frames().len(), 1);

        harness
            .state
            .lock(|s| s.control.request_mode(Mode::Auto))
            .unwrap();
        assert!(wait_for(|| harness.link.written_frames().len() >= 2));
        settle();
        let link = harness.stop();

        let frames = link.written_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1][1], UplinkKind::Auto.tag());
    }

    #[test]
    fn test_write_failures_counted() {
        let harness = Harness::start(|_| {}, false);
        harness.link.fail_writes(true);
        harness.state.lock(|s| s.auto_send = true);

        let state = harness.state.clone();
        assert!(wait_for(|| state.lock(|s| s.link.stats().send_failures) >= 2));
        let last = harness.state.lock(|s| s.last_sent.clone());
        let link = harness.stop();

        assert!(last.is_none());
        assert!(link.written_frames().is_empty());
    }
}
