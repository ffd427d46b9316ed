//! The shared control record
//!
//! One `ControlState` exists per station. The navigation controller edits the
//! command and tuning fields, the receive path overwrites the telemetry
//! mirror, and the uplink loop encodes whatever frame the current mode
//! selects. Callers wrap it in a single lock so every frame is built from a
//! consistent snapshot.

use heapless::{String, Vec};
use tower_protocol::{DriveCommand, PidGains, Telemetry, Uplink, PID_MARKER_NONE};

use super::mode::{Mode, SubMode, TransitionRejected};
use crate::config::{ControlConfig, PresetConfig, MAX_LABEL_LEN, MAX_PID_ROWS};
use crate::navigation::NumericInput;

/// Neutral servo value applied on STOP
pub const SERVO_NEUTRAL: f32 = 0.0;

/// One row of the PID table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidRow {
    /// Display name
    pub name: String<MAX_LABEL_LEN>,
    /// Marker byte sent while this row is committed
    pub code: u8,
    /// Current gains
    pub gains: PidGains,
}

/// Last telemetry frame received from the vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryMirror {
    pub telemetry: Telemetry,
    /// Station uptime when the frame was decoded (ms)
    pub received_at_ms: u64,
}

/// Ground station control state
#[derive(Debug, Clone)]
pub struct ControlState {
    pub(crate) mode: Mode,
    pub(crate) sub_mode: SubMode,
    pub(crate) switch: u8,
    pub(crate) speed: i16,
    pub(crate) servo_angles: [f32; 4],
    pub(crate) pid_table: Vec<PidRow, MAX_PID_ROWS>,
    pub(crate) jacobian: [[f32; 4]; 3],
    pub(crate) selected_pid_row: usize,
    /// Row whose edits are being committed, `None` while browsing
    pub(crate) pid_tuning_marker: Option<usize>,
    pub(crate) nav_row: usize,
    pub(crate) nav_col: usize,
    pub(crate) nav_confirmed: bool,
    pub(crate) input: NumericInput,
    pub(crate) telemetry: Option<TelemetryMirror>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(&ControlConfig::default())
    }
}

impl ControlState {
    /// Create the startup state: STOP, zeroed commands, configured tables
    pub fn new(config: &ControlConfig) -> Self {
        let pid_table = config
            .pid_rows
            .iter()
            .map(|row| PidRow {
                name: row.name.clone(),
                code: row.code,
                gains: row.gains,
            })
            .collect();

        Self {
            mode: Mode::Stop,
            sub_mode: SubMode::default(),
            switch: 0,
            speed: 0,
            servo_angles: [SERVO_NEUTRAL; 4],
            pid_table,
            jacobian: config.jacobian,
            selected_pid_row: 0,
            pid_tuning_marker: None,
            nav_row: 0,
            nav_col: 0,
            nav_confirmed: false,
            input: NumericInput::new(),
            telemetry: None,
        }
    }

    /// Get current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Get current tuning target
    pub fn sub_mode(&self) -> SubMode {
        self.sub_mode
    }

    pub fn switch(&self) -> u8 {
        self.switch
    }

    pub fn speed(&self) -> i16 {
        self.speed
    }

    pub fn servo_angles(&self) -> [f32; 4] {
        self.servo_angles
    }

    pub fn pid_table(&self) -> &[PidRow] {
        &self.pid_table
    }

    pub fn jacobian(&self) -> [[f32; 4]; 3] {
        self.jacobian
    }

    /// Index of the PID row shown in the tuning grid
    pub fn selected_pid_row(&self) -> usize {
        self.selected_pid_row
    }

    /// Row being committed, if any
    pub fn pid_tuning_marker(&self) -> Option<usize> {
        self.pid_tuning_marker
    }

    /// Cursor as (row, col)
    pub fn cursor(&self) -> (usize, usize) {
        (self.nav_row, self.nav_col)
    }

    /// Whether the cursor is editing a value rather than choosing one
    pub fn is_confirmed(&self) -> bool {
        self.nav_confirmed
    }

    /// Text typed so far for the field under the cursor
    pub fn input_text(&self) -> &str {
        self.input.as_str()
    }

    /// Last telemetry received, if any
    pub fn telemetry(&self) -> Option<&TelemetryMirror> {
        self.telemetry.as_ref()
    }

    /// Drive command as carried by AUTO and TOWER frames
    pub fn drive_command(&self) -> DriveCommand {
        DriveCommand {
            switch: self.switch,
            speed: self.speed,
            servos: self.servo_angles,
        }
    }

    /// Marker byte for the PID frame
    ///
    /// `PID_MARKER_NONE` while browsing, otherwise the committed row's code.
    pub fn pid_marker_code(&self) -> u8 {
        self.pid_tuning_marker
            .and_then(|row| self.pid_table.get(row))
            .map_or(PID_MARKER_NONE, |row| row.code)
    }

    /// Request a mode change
    ///
    /// Checks the transition rule before touching anything. On success the
    /// cursor and input buffer are reset for the new grid, and entering STOP
    /// zeroes the drive commands and clears the PID marker.
    pub fn request_mode(&mut self, to: Mode) -> Result<(), TransitionRejected> {
        let from = self.mode;
        if !from.can_transition_to(to) {
            return Err(TransitionRejected { from, to });
        }

        self.mode = to;
        if to == Mode::Stop {
            self.safe_reset();
        }
        self.reset_cursor();
        Ok(())
    }

    /// Zero drive outputs
    fn safe_reset(&mut self) {
        self.switch = 0;
        self.speed = 0;
        self.servo_angles = [SERVO_NEUTRAL; 4];
        self.pid_tuning_marker = None;
    }

    /// Frame to send for the current mode and sub-mode
    pub fn uplink(&self) -> Uplink {
        match (self.mode, self.sub_mode) {
            (Mode::Stop, _) => Uplink::Stop,
            (Mode::Auto, _) => Uplink::Auto(self.drive_command()),
            (Mode::Tower, _) => Uplink::Tower(self.drive_command()),
            (Mode::Tuning, SubMode::Servo) => Uplink::Servo(self.servo_angles),
            (Mode::Tuning, SubMode::Pid) => Uplink::Pid {
                marker: self.pid_marker_code(),
                gains: self
                    .pid_table
                    .get(self.selected_pid_row)
                    .map(|row| row.gains)
                    .unwrap_or_default(),
            },
            (Mode::Tuning, SubMode::Jacobian) => Uplink::Jacobian(self.jacobian),
        }
    }

    /// Mirror a decoded telemetry frame
    pub fn apply_telemetry(&mut self, telemetry: Telemetry, received_at_ms: u64) {
        self.telemetry = Some(TelemetryMirror {
            telemetry,
            received_at_ms,
        });
    }

    /// Load a preset into the drive command fields
    pub(crate) fn apply_preset(&mut self, preset: &PresetConfig) {
        self.switch = preset.switch;
        self.speed = preset.speed;
        self.servo_angles = preset.servos;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dirty_state(mode: Mode) -> ControlState {
        let mut state = ControlState::default();
        state.mode = mode;
        state.switch = 2;
        state.speed = -1234;
        state.servo_angles = [11.0, 22.0, 33.0, 44.0];
        state.pid_tuning_marker = Some(3);
        state
    }

    #[test]
    fn test_startup_defaults() {
        let state = ControlState::default();

        assert_eq!(state.mode(), Mode::Stop);
        assert_eq!(state.switch(), 0);
        assert_eq!(state.servo_angles(), [0.0; 4]);
        assert_eq!(state.pid_table().len(), 6);
        assert_eq!(state.pid_tuning_marker(), None);
        assert!(state.telemetry().is_none());
        assert_eq!(state.uplink(), Uplink::Stop);
    }

    #[test]
    fn test_illegal_transition_leaves_mode() {
        let mut state = dirty_state(Mode::Auto);
        let result = state.request_mode(Mode::Tuning);

        assert_eq!(
            result,
            Err(TransitionRejected {
                from: Mode::Auto,
                to: Mode::Tuning
            })
        );
        assert_eq!(state.mode(), Mode::Auto);
        assert_eq!(state.speed(), -1234);
    }

    #[test]
    fn test_transition_table_applied() {
        for from in Mode::ALL {
            for to in Mode::ALL {
                let mut state = dirty_state(from);
                let result = state.request_mode(to);

                if from.can_transition_to(to) {
                    assert!(result.is_ok());
                    assert_eq!(state.mode(), to);
                } else {
                    assert!(result.is_err());
                    assert_eq!(state.mode(), from);
                }
            }
        }
    }

    #[test]
    fn test_stop_resets_commands() {
        for from in Mode::ALL {
            let mut state = dirty_state(from);
            state.request_mode(Mode::Stop).unwrap();

            assert_eq!(state.switch(), 0);
            assert_eq!(state.speed(), 0);
            assert_eq!(state.servo_angles(), [SERVO_NEUTRAL; 4]);
            assert_eq!(state.pid_tuning_marker(), None);
        }
    }

    #[test]
    fn test_entering_tuning_keeps_sub_mode() {
        let mut state = ControlState::default();
        state.sub_mode = SubMode::Jacobian;
        state.request_mode(Mode::Tuning).unwrap();
        assert_eq!(state.sub_mode(), SubMode::Jacobian);
    }

    #[test]
    fn test_drive_swap_keeps_commands() {
        let mut state = dirty_state(Mode::Auto);
        state.request_mode(Mode::Tower).unwrap();
        assert_eq!(state.speed(), -1234);
        assert!(matches!(state.uplink(), Uplink::Tower(cmd) if cmd.switch == 2));
    }

    #[test]
    fn test_uplink_selection() {
        let mut state = ControlState::default();
        state.switch = 1;
        state.speed = 750;
        state.servo_angles = [30.0, 60.0, 120.0, 150.0];

        state.mode = Mode::Auto;
        let encoded = state.uplink().encode_to_vec().unwrap();
        assert_eq!(encoded.len(), 23);
        assert_eq!(&encoded[..3], &[0xAA, 0x01, 0x01]);
        assert_eq!(encoded[21], 0xBB);
        assert_eq!(Uplink::decode(&encoded), Ok(Uplink::Auto(state.drive_command())));

        state.mode = Mode::Tuning;
        state.sub_mode = SubMode::Servo;
        assert_eq!(state.uplink(), Uplink::Servo([30.0, 60.0, 120.0, 150.0]));

        state.sub_mode = SubMode::Jacobian;
        assert_eq!(state.uplink(), Uplink::Jacobian(state.jacobian()));
    }

    #[test]
    fn test_pid_uplink_marker() {
        let mut state = ControlState::default();
        state.mode = Mode::Tuning;
        state.sub_mode = SubMode::Pid;
        state.selected_pid_row = 3;

        let browsing = state.uplink();
        assert_eq!(
            browsing,
            Uplink::Pid {
                marker: PID_MARKER_NONE,
                gains: state.pid_table()[3].gains
            }
        );

        state.pid_tuning_marker = Some(3);
        assert!(matches!(state.uplink(), Uplink::Pid { marker: 0xB2, .. }));
    }

    #[test]
    fn test_apply_telemetry() {
        let mut state = ControlState::default();
        let telemetry = Telemetry {
            switch: 1,
            roll: 1.0,
            pitch: 2.0,
            yaw: 3.0,
        };
        state.apply_telemetry(telemetry, 420);

        let mirror = state.telemetry().unwrap();
        assert_eq!(mirror.telemetry, telemetry);
        assert_eq!(mirror.received_at_ms, 420);
    }

    fn any_mode() -> impl Strategy<Value = Mode> {
        prop_oneof![
            Just(Mode::Stop),
            Just(Mode::Auto),
            Just(Mode::Tower),
            Just(Mode::Tuning),
        ]
    }

    proptest! {
        #[test]
        fn prop_stop_always_resets(
            from in any_mode(),
            switch in 0u8..3,
            speed in any::<i16>(),
            servos in proptest::array::uniform4(-360.0f32..360.0),
        ) {
            let mut state = ControlState::default();
            state.mode = from;
            state.switch = switch;
            state.speed = speed;
            state.servo_angles = servos;
            state.pid_tuning_marker = Some(0);

            prop_assert!(state.request_mode(Mode::Stop).is_ok());
            prop_assert_eq!(state.switch(), 0);
            prop_assert_eq!(state.speed(), 0);
            prop_assert_eq!(state.servo_angles(), [0.0; 4]);
            prop_assert_eq!(state.pid_tuning_marker(), None);
        }
    }
}
