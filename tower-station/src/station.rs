//! Ground station orchestration
//!
//! Owns the shared state, the navigator and the telemetry bus, and starts the
//! two I/O loops against a transport:
//!
//! ```text
//!   operator actions ──► Station::handle_action ──┐
//!                                                 ▼
//!                         ┌──────────── SharedState ────────────┐
//!                         │ ControlState · LinkMonitor · flags  │
//!                         └──────┬───────────────────────▲──────┘
//!                                │ snapshot              │ mirror
//!                        "uplink" thread          "downlink" thread
//!                                │                       │
//!                           LinkTx::write      LinkRx::read_available
//!                                                        │
//!                                                        ▼
//!                                          TelemetryBus ──► receivers
//! ```

use std::fmt::Write as _;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use tower_core::link::{LinkStats, LinkStatus};
use tower_core::{Action, ControlState, Mode, NavEvent, Navigator, TransitionRejected};

use crate::channels::{SendSignal, TelemetryBus, TelemetryReceiver};
use crate::config::StationConfig;
use crate::shared::{FrameBytes, SharedState, StationState};
use crate::tasks::{downlink_task, uplink_task, DownlinkTask, UplinkTask};
use crate::transport::{LinkRx, LinkTx};

/// Poll interval while waiting for a loop to exit
const JOIN_POLL: std::time::Duration = std::time::Duration::from_millis(1);

/// Station errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationError {
    /// I/O loops already running for this station
    AlreadyRunning,
    /// Thread could not be spawned
    Spawn(io::ErrorKind),
    /// Telemetry consumer limit reached
    TooManySubscribers,
    /// Send period of zero
    InvalidPeriod,
}

impl From<io::Error> for StationError {
    fn from(e: io::Error) -> Self {
        StationError::Spawn(e.kind())
    }
}

/// Snapshot for a display
#[derive(Debug, Clone)]
pub struct StationView {
    /// Control state, cursor and telemetry mirror included
    pub control: ControlState,
    pub link_status: LinkStatus,
    pub link_stats: LinkStats,
    /// Milliseconds since the last telemetry frame
    pub since_telemetry_ms: Option<u32>,
    pub auto_send: bool,
    pub send_period: Duration,
    pub last_sent: Option<FrameBytes>,
}

impl StationView {
    /// Last sent frame as space-separated hex, e.g. `AA 00 BB 4C`
    pub fn last_sent_hex(&self) -> String {
        let mut text = String::new();
        if let Some(frame) = &self.last_sent {
            for (i, byte) in frame.iter().enumerate() {
                if i > 0 {
                    text.push(' ');
                }
                let _ = write!(text, "{:02X}", byte);
            }
        }
        text
    }
}

/// The ground station
pub struct Station {
    config: StationConfig,
    state: SharedState,
    navigator: Navigator,
    bus: TelemetryBus,
    send_request: Arc<SendSignal>,
    active: Arc<AtomicBool>,
}

impl Station {
    pub fn new(config: StationConfig) -> Self {
        let state = SharedState::new(StationState::new(&config));
        let navigator = Navigator::new(&config.control);

        Self {
            config,
            state,
            navigator,
            bus: TelemetryBus::new(),
            send_request: Arc::new(SendSignal::new()),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Handle to the shared state
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Start the uplink and downlink loops
    pub fn start<T, R>(&self, tx: T, rx: R) -> Result<StationHandle, StationError>
    where
        T: LinkTx + 'static,
        R: LinkRx + 'static,
    {
        if self.active.swap(true, Ordering::AcqRel) {
            return Err(StationError::AlreadyRunning);
        }

        let link = &self.config.link;
        let uplink = UplinkTask {
            tx,
            state: self.state.clone(),
            send_request: self.send_request.clone(),
            running: Arc::new(AtomicBool::new(true)),
            send_on_change: link.send_on_change,
        };
        let downlink = DownlinkTask {
            rx,
            state: self.state.clone(),
            bus: self.bus.clone(),
            running: Arc::new(AtomicBool::new(true)),
            poll: link.receive_poll(),
            backoff: link.error_backoff(),
        };

        let mut handle = StationHandle {
            workers: Vec::with_capacity(2),
            join_timeout: link.join_timeout(),
            active: self.active.clone(),
        };

        let running = uplink.running.clone();
        match thread::Builder::new()
            .name("uplink".into())
            .spawn(move || uplink_task(uplink))
        {
            Ok(thread) => handle.workers.push(Worker::new("uplink", running, thread)),
            Err(e) => {
                warn!("Failed to spawn uplink thread: {}", e);
                handle.shutdown();
                return Err(e.into());
            }
        }

        let running = downlink.running.clone();
        match thread::Builder::new()
            .name("downlink".into())
            .spawn(move || downlink_task(downlink))
        {
            Ok(thread) => handle.workers.push(Worker::new("downlink", running, thread)),
            Err(e) => {
                warn!("Failed to spawn downlink thread: {}", e);
                handle.shutdown();
                return Err(e.into());
            }
        }

        info!("Station started");
        Ok(handle)
    }

    /// Whether the I/O loops are running
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Apply one operator action
    pub fn handle_action(&self, action: Action) -> Option<NavEvent> {
        let event = self
            .state
            .lock(|s| self.navigator.process_input(&mut s.control, action));
        if let Some(event) = &event {
            debug!("{:?} -> {:?}", action, event);
        }
        event
    }

    /// Request a mode transition directly
    pub fn request_mode(&self, mode: Mode) -> Result<(), TransitionRejected> {
        let result = self.state.lock(|s| s.control.request_mode(mode));
        match result {
            Ok(()) => info!("Mode: {}", mode.name()),
            Err(rejected) => debug!(
                "Transition {} -> {} rejected",
                rejected.from.name(),
                rejected.to.name()
            ),
        }
        result
    }

    /// Enable or disable periodic sending
    ///
    /// The uplink loop sees the change on its next iteration.
    pub fn set_auto_send(&self, enabled: bool) {
        self.state.lock(|s| s.auto_send = enabled);
        info!("Auto-send {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn auto_send(&self) -> bool {
        self.state.lock(|s| s.auto_send)
    }

    /// Change the auto-send period
    pub fn set_send_period(&self, period: Duration) -> Result<(), StationError> {
        if period.as_ticks() == 0 {
            return Err(StationError::InvalidPeriod);
        }
        self.state.lock(|s| s.send_period = period);
        debug!("Send period {} ms", period.as_millis());
        Ok(())
    }

    /// Send the current frame once, whether or not auto-send is on
    pub fn send_now(&self) {
        self.send_request.signal(());
    }

    /// Register a telemetry consumer
    pub fn subscribe(&self) -> Result<TelemetryReceiver, StationError> {
        self.bus
            .subscribe()
            .map_err(|_| StationError::TooManySubscribers)
    }

    /// Consistent snapshot for rendering
    pub fn view(&self) -> StationView {
        self.state.lock(|s| StationView {
            control: s.control.clone(),
            link_status: s.link.status(),
            link_stats: s.link.stats(),
            since_telemetry_ms: s.link.since_telemetry_ms(),
            auto_send: s.auto_send,
            send_period: s.send_period,
            last_sent: s.last_sent.clone(),
        })
    }
}

/// One I/O thread and its running flag
struct Worker {
    name: &'static str,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    fn new(name: &'static str, running: Arc<AtomicBool>, thread: JoinHandle<()>) -> Self {
        Self {
            name,
            running,
            thread: Some(thread),
        }
    }

    /// Wait for the thread until `deadline`, detaching it if it overruns
    fn join(&mut self, deadline: Instant) -> bool {
        let Some(thread) = self.thread.take() else {
            return true;
        };

        while !thread.is_finished() {
            if Instant::now() >= deadline {
                warn!("{} thread did not stop in time, detaching", self.name);
                return false;
            }
            thread::sleep(JOIN_POLL);
        }

        if thread.join().is_err() {
            warn!("{} thread panicked", self.name);
        }
        true
    }
}

/// Running I/O loops; stopped on [`stop`](Self::stop) or drop
pub struct StationHandle {
    workers: Vec<Worker>,
    join_timeout: Duration,
    active: Arc<AtomicBool>,
}

impl StationHandle {
    /// Stop both loops
    ///
    /// Returns false if a loop had to be detached after the join timeout.
    pub fn stop(mut self) -> bool {
        self.shutdown()
    }

    /// Check if every loop is still running
    pub fn is_running(&self) -> bool {
        self.workers
            .iter()
            .all(|w| w.thread.as_ref().is_some_and(|t| !t.is_finished()))
    }

    fn shutdown(&mut self) -> bool {
        if self.workers.is_empty() {
            self.active.store(false, Ordering::Release);
            return true;
        }

        for worker in &self.workers {
            worker.running.store(false, Ordering::Release);
        }

        // One deadline for all loops; they stop in parallel
        let deadline = Instant::now() + self.join_timeout;
        let mut clean = true;
        for worker in &mut self.workers {
            clean &= worker.join(deadline);
        }
        self.workers.clear();
        self.active.store(false, Ordering::Release);

        info!("Station stopped");
        clean
    }
}

impl Drop for StationHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tower_core::{Field, SubMode};
    use tower_protocol::{Telemetry, Uplink, UplinkKind};

    use crate::transport::mock::MockLink;

    fn fast_config() -> StationConfig {
        let mut config = StationConfig::default();
        config.link.send_period_ms = 2;
        config.link.receive_poll_ms = 1;
        config.link.error_backoff_ms = 5;
        config
    }

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..400 {
            if done() {
                return true;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        false
    }

    fn press(station: &Station, keys: &[Action]) {
        for &key in keys {
            station.handle_action(key);
        }
    }

    #[test]
    fn test_start_twice_rejected() {
        let station = Station::new(fast_config());
        let link = MockLink::new();
        let (tx, rx) = link.split();
        let (tx2, rx2) = link.split();

        let handle = station.start(tx, rx).unwrap();
        assert!(station.is_running());
        assert!(matches!(
            station.start(tx2, rx2),
            Err(StationError::AlreadyRunning)
        ));

        assert!(handle.stop());
        assert!(!station.is_running());
    }

    #[test]
    fn test_restart_after_stop() {
        let station = Station::new(fast_config());
        let link = MockLink::new();

        let (tx, rx) = link.split();
        let handle = station.start(tx, rx).unwrap();
        assert!(handle.is_running());
        drop(handle);

        let (tx, rx) = link.split();
        let handle = station.start(tx, rx).unwrap();
        assert!(handle.stop());
    }

    #[test]
    fn test_auto_frame_on_the_wire() {
        let station = Station::new(fast_config());
        let link = MockLink::new();
        let (tx, rx) = link.split();
        let handle = station.start(tx, rx).unwrap();

        station.request_mode(Mode::Auto).unwrap();
        // Switch, speed, then the four servos
        press(
            &station,
            &[
                Action::Confirm,
                Action::Digit(1),
                Action::Confirm,
                Action::Right,
                Action::Confirm,
            ],
        );
        press(&station, &[Action::Digit(7), Action::Digit(5), Action::Digit(0)]);
        for angle in ["30", "60", "120", "150"] {
            press(&station, &[Action::Confirm, Action::Right, Action::Confirm]);
            for c in angle.chars() {
                station.handle_action(Action::from_char(c).unwrap());
            }
        }
        station.send_now();

        assert!(wait_for(|| station.view().last_sent.is_some()));
        assert!(handle.stop());

        let frame = station.view().last_sent.unwrap();
        assert_eq!(frame.len(), 23);
        assert_eq!(&frame[..3], &[0xAA, 0x01, 0x01]);
        assert_eq!(frame[21], 0xBB);

        match Uplink::decode(&frame).unwrap() {
            Uplink::Auto(cmd) => {
                assert_eq!(cmd.switch, 1);
                assert_eq!(cmd.speed, 750);
                assert_eq!(cmd.servos, [30.0, 60.0, 120.0, 150.0]);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_telemetry_reaches_view_and_subscriber() {
        let station = Station::new(fast_config());
        let consumer = station.subscribe().unwrap();
        let link = MockLink::new();
        let (tx, rx) = link.split();
        let handle = station.start(tx, rx).unwrap();

        assert_eq!(station.view().link_status, LinkStatus::NoData);

        let telemetry = Telemetry {
            switch: 1,
            roll: 1.0,
            pitch: 2.0,
            yaw: 3.0,
        };
        link.inject_rx_data(&[0x55, 0xCC]);
        link.inject_rx_data(&telemetry.to_bytes());

        assert!(wait_for(|| !consumer.is_empty()));
        assert_eq!(consumer.try_recv().map(|r| r.telemetry), Some(telemetry));

        let view = station.view();
        assert_eq!(view.control.telemetry().map(|m| m.telemetry), Some(telemetry));
        assert_eq!(view.link_status, LinkStatus::Healthy);
        assert!(view.link_stats.framer.discarded_bytes >= 1);

        assert!(handle.stop());
    }

    #[test]
    fn test_auto_send_toggle() {
        let station = Station::new(fast_config());
        let link = MockLink::new();
        let (tx, rx) = link.split();
        let handle = station.start(tx, rx).unwrap();

        station.set_auto_send(true);
        assert!(wait_for(|| link.written_frames().len() >= 3));

        station.set_auto_send(false);
        thread::sleep(std::time::Duration::from_millis(20));
        let count = link.written_frames().len();
        thread::sleep(std::time::Duration::from_millis(30));
        assert_eq!(link.written_frames().len(), count);

        assert!(handle.stop());
    }

    #[test]
    fn test_send_period_validation() {
        let station = Station::new(fast_config());
        assert_eq!(
            station.set_send_period(Duration::from_ticks(0)),
            Err(StationError::InvalidPeriod)
        );
        station.set_send_period(Duration::from_millis(100)).unwrap();
        assert_eq!(station.view().send_period, Duration::from_millis(100));
    }

    #[test]
    fn test_tuning_pid_commit_via_actions() {
        let station = Station::new(fast_config());

        // STOP menu: AUTO, TOWER, TUNING
        press(&station, &[Action::Down, Action::Down, Action::Confirm]);
        assert_eq!(station.view().control.mode(), Mode::Tuning);

        // Sub-mode menu: SERVO, PID, JACOBIAN
        press(&station, &[Action::Down, Action::Confirm]);
        let view = station.view();
        assert_eq!(view.control.sub_mode(), SubMode::Pid);
        assert!(view.control.is_confirmed());

        // Second group, kp row, type 2.5 and commit
        press(&station, &[Action::Right, Action::Confirm]);
        assert_eq!(
            station.view().control.field_at_cursor(),
            Some(Field::PidGain { row: 1, gain: 0 })
        );
        press(
            &station,
            &[Action::Digit(2), Action::DecimalPoint, Action::Digit(5)],
        );
        assert_eq!(
            station.handle_action(Action::Confirm),
            Some(NavEvent::PidCommitted(1))
        );

        let view = station.view();
        assert_eq!(view.control.pid_table()[1].gains.kp, 2.5);
        match view.control.uplink() {
            Uplink::Pid { marker, gains } => {
                assert_eq!(marker, 0xA2);
                assert_eq!(gains.kp, 2.5);
            }
            other => panic!("unexpected frame {:?}", other),
        }
        assert_eq!(view.control.uplink().kind(), UplinkKind::Pid);
    }

    #[test]
    fn test_rejected_transition_leaves_mode() {
        let station = Station::new(fast_config());
        station.request_mode(Mode::Auto).unwrap();

        let rejected = station.request_mode(Mode::Tuning).unwrap_err();
        assert_eq!(rejected.from, Mode::Auto);
        assert_eq!(station.view().control.mode(), Mode::Auto);
    }

    #[test]
    fn test_last_sent_hex() {
        let mut view = Station::new(fast_config()).view();
        assert_eq!(view.last_sent_hex(), "");

        view.last_sent = Some(FrameBytes::from_slice(&[0xAA, 0x00, 0xBB, 0x4C]).unwrap());
        assert_eq!(view.last_sent_hex(), "AA 00 BB 4C");
    }

    #[test]
    fn test_closed_link_does_not_stop_loops() {
        let station = Station::new(fast_config());
        let link = MockLink::new();
        let (tx, rx) = link.split();
        link.set_open(false);
        let handle = station.start(tx, rx).unwrap();

        station.set_auto_send(true);
        assert!(wait_for(|| station.view().link_stats.send_failures >= 2));
        assert!(handle.is_running());

        link.set_open(true);
        assert!(wait_for(|| !link.written_frames().is_empty()));
        assert!(handle.stop());
    }
}
