//! Operator input handling
//!
//! The navigator turns discrete actions into edits of the control state:
//! cursor moves, selector choices, mode requests, numeric entry, presets.
//! Anything that does not apply in the current context is a no-op.

use heapless::Vec;

use super::grid::Field;
use crate::config::{ControlConfig, PresetConfig, MAX_PRESETS};
use crate::input::Action;
use crate::state::{ControlState, Mode, SubMode, TransitionRejected};

/// Highest main switch value
pub const MAX_SWITCH: u8 = 2;

/// Wire index of `output_min` within a PID row
const OUTPUT_MIN: usize = 5;

/// Notable outcome of an action, for logging and display
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NavEvent {
    /// Mode transition accepted
    ModeChanged(Mode),
    /// Mode transition refused, state unchanged
    ModeRejected(TransitionRejected),
    /// Tuning target chosen, its grid is now active
    SubModeSelected(SubMode),
    /// Tuning grid left, back at the target selector
    TuningClosed,
    /// Started editing a drive field
    EditStarted(Field),
    /// Stopped editing a drive field
    EditFinished(Field),
    /// Parsed input written to a field (value after range policy)
    ValueApplied { field: Field, value: f32 },
    /// PID row chosen for browsing
    PidGroupSelected(usize),
    /// PID row marked for commit on the vehicle
    PidCommitted(usize),
    /// Main switch flipped
    SwitchToggled(u8),
    /// Preset loaded (1-based)
    PresetApplied(u8),
}

/// Navigation/tuning controller
#[derive(Debug, Clone)]
pub struct Navigator {
    presets: Vec<PresetConfig, MAX_PRESETS>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(&ControlConfig::default())
    }
}

impl Navigator {
    /// Create a navigator with the configured presets
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            presets: config.presets.clone(),
        }
    }

    /// Number of presets available
    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    /// Process one operator action
    pub fn process_input(&self, state: &mut ControlState, action: Action) -> Option<NavEvent> {
        match action {
            Action::Up => self.handle_move(state, -1, 0),
            Action::Down => self.handle_move(state, 1, 0),
            Action::Left => self.handle_move(state, 0, -1),
            Action::Right => self.handle_move(state, 0, 1),
            Action::Confirm => self.handle_confirm(state),
            Action::Escape => self.handle_escape(state),
            Action::Digit(digit) => self.handle_digit(state, digit),
            Action::DecimalPoint => {
                if state.accepts_value() && state.input.push_point() {
                    Self::apply_input(state)
                } else {
                    None
                }
            }
            Action::Backspace => {
                if state.accepts_value() && state.input.backspace() {
                    Self::apply_input(state)
                } else {
                    None
                }
            }
            Action::ToggleSwitch => self.handle_toggle_switch(state),
            Action::Preset(number) => self.handle_preset(state, number),
        }
    }

    fn handle_move(&self, state: &mut ControlState, d_row: isize, d_col: isize) -> Option<NavEvent> {
        state.move_cursor(d_row, d_col);
        None
    }

    fn handle_confirm(&self, state: &mut ControlState) -> Option<NavEvent> {
        match state.field_at_cursor()? {
            Field::ModeChoice(mode) => Some(Self::request_mode(state, mode)),
            Field::SubModeChoice(sub_mode) => {
                state.sub_mode = sub_mode;
                state.nav_confirmed = true;
                state.pid_tuning_marker = None;
                state.set_cursor(0, 0);
                Some(NavEvent::SubModeSelected(sub_mode))
            }
            Field::PidGroup(row) => {
                // Step down onto the first gain of the chosen row
                state.set_cursor(1, row);
                Some(NavEvent::PidGroupSelected(row))
            }
            Field::PidGain { row, .. } => {
                state.input.clear();
                state.pid_tuning_marker = Some(row);
                Some(NavEvent::PidCommitted(row))
            }
            field @ (Field::Switch | Field::Speed | Field::Servo(_)) if state.mode.is_drive() => {
                state.nav_confirmed = !state.nav_confirmed;
                state.input.clear();
                if state.nav_confirmed {
                    Some(NavEvent::EditStarted(field))
                } else {
                    Some(NavEvent::EditFinished(field))
                }
            }
            // Servo and matrix cells apply as they are typed
            _ => None,
        }
    }

    fn handle_escape(&self, state: &mut ControlState) -> Option<NavEvent> {
        if state.mode == Mode::Tuning && state.nav_confirmed {
            state.reset_cursor();
            state.pid_tuning_marker = None;
            return Some(NavEvent::TuningClosed);
        }
        Some(Self::request_mode(state, Mode::Stop))
    }

    fn handle_digit(&self, state: &mut ControlState, digit: u8) -> Option<NavEvent> {
        if state.accepts_value() {
            if state.input.push_digit(digit) {
                return Self::apply_input(state);
            }
            return None;
        }

        // On a selector, digit N picks the Nth entry
        let index = (digit as usize).checked_sub(1)?;
        let grid = state.grid();
        let (row, col) = state.cursor();

        if grid.cols == 1 {
            if index >= grid.rows {
                return None;
            }
            state.set_cursor(index, col);
            None
        } else {
            if index >= grid.cols {
                return None;
            }
            state.set_cursor(row, index);
            if state.in_pid_grid() {
                Some(NavEvent::PidGroupSelected(index))
            } else {
                None
            }
        }
    }

    fn handle_toggle_switch(&self, state: &mut ControlState) -> Option<NavEvent> {
        if !state.mode.is_drive() {
            return None;
        }
        state.switch = if state.switch == 0 { 1 } else { 0 };
        Some(NavEvent::SwitchToggled(state.switch))
    }

    fn handle_preset(&self, state: &mut ControlState, number: u8) -> Option<NavEvent> {
        if !state.mode.is_drive() {
            return None;
        }
        let preset = self.presets.get((number as usize).checked_sub(1)?)?;
        state.apply_preset(preset);
        state.input.clear();
        Some(NavEvent::PresetApplied(number))
    }

    fn request_mode(state: &mut ControlState, mode: Mode) -> NavEvent {
        match state.request_mode(mode) {
            Ok(()) => NavEvent::ModeChanged(mode),
            Err(rejected) => NavEvent::ModeRejected(rejected),
        }
    }

    /// Parse the entry buffer into the field under the cursor
    fn apply_input(state: &mut ControlState) -> Option<NavEvent> {
        let field = state.field_at_cursor()?;
        let value = state.input.value()?;
        let value = Self::write_field(state, field, value)?;
        Some(NavEvent::ValueApplied { field, value })
    }

    /// Store a value, applying the field's range policy
    ///
    /// Gains are floored at 0. `output_min` goes further than a plain cap at
    /// 0: the keypad has no minus sign, so the typed number is taken as a
    /// magnitude and stored as `-|value|`.
    ///
    /// Returns the value actually stored.
    fn write_field(state: &mut ControlState, field: Field, value: f32) -> Option<f32> {
        match field {
            Field::Switch => {
                state.switch = value.clamp(0.0, MAX_SWITCH as f32) as u8;
                Some(state.switch as f32)
            }
            Field::Speed => {
                state.speed = value.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                Some(state.speed as f32)
            }
            Field::Servo(channel) => {
                *state.servo_angles.get_mut(channel)? = value;
                Some(value)
            }
            Field::PidGain { row, gain } => {
                let value = limit_gain(gain, value);
                let gains = &mut state.pid_table.get_mut(row)?.gains;
                gains.set_field(gain, value).then_some(value)
            }
            Field::Jacobian { row, col } => {
                *state.jacobian.get_mut(row)?.get_mut(col)? = value;
                Some(value)
            }
            Field::ModeChoice(_) | Field::SubModeChoice(_) | Field::PidGroup(_) => None,
        }
    }
}

/// Gains and limits are non-negative; `output_min` is entered as a magnitude
/// and stored as a non-positive limit.
fn limit_gain(gain: usize, value: f32) -> f32 {
    if gain == OUTPUT_MIN {
        value.min(-value)
    } else {
        value.max(0.0)
    }
}
