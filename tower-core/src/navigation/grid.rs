//! Per-mode grids and field addressing

use tower_protocol::PidGains;

use crate::state::{ControlState, Mode, SubMode};

/// Number of rows in the PID grid: group selector plus one row per gain
pub const PID_GRID_ROWS: usize = 1 + PidGains::FIELD_COUNT;

/// Grid dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Check if a cell lies inside the grid
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    fn clamp(&self, row: usize, col: usize) -> (usize, usize) {
        (
            row.min(self.rows.saturating_sub(1)),
            col.min(self.cols.saturating_sub(1)),
        )
    }
}

/// What the cursor addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    /// STOP menu entry
    ModeChoice(Mode),
    /// TUNING menu entry
    SubModeChoice(SubMode),
    /// Main switch
    Switch,
    /// Fan/throttle command
    Speed,
    /// Servo channel
    Servo(usize),
    /// PID group selector cell
    PidGroup(usize),
    /// One gain of one PID row
    PidGain { row: usize, gain: usize },
    /// Jacobian matrix cell
    Jacobian { row: usize, col: usize },
}

impl Field {
    /// Check if this cell chooses something rather than holding a value
    pub fn is_selector(&self) -> bool {
        matches!(
            self,
            Field::ModeChoice(_) | Field::SubModeChoice(_) | Field::PidGroup(_)
        )
    }
}

impl ControlState {
    /// Grid active for the current mode, sub-mode and confirm flag
    ///
    /// In the PID grid, row 0 picks the group and rows 1..=6 hold that
    /// group's gains; columns run over the PID table rows.
    pub fn grid(&self) -> Grid {
        match self.mode {
            Mode::Stop => Grid::new(Mode::STOP_MENU.len(), 1),
            Mode::Auto | Mode::Tower => Grid::new(1, 6),
            Mode::Tuning if !self.nav_confirmed => Grid::new(SubMode::MENU.len(), 1),
            Mode::Tuning => match self.sub_mode {
                SubMode::Servo => Grid::new(1, 4),
                SubMode::Pid => Grid::new(PID_GRID_ROWS, self.pid_table.len()),
                SubMode::Jacobian => Grid::new(3, 4),
            },
        }
    }

    /// Field under the cursor, if the cursor addresses one
    pub fn field_at_cursor(&self) -> Option<Field> {
        let (row, col) = (self.nav_row, self.nav_col);
        if !self.grid().contains(row, col) {
            return None;
        }

        let field = match self.mode {
            Mode::Stop => Field::ModeChoice(Mode::STOP_MENU[row]),
            Mode::Auto | Mode::Tower => match col {
                0 => Field::Switch,
                1 => Field::Speed,
                n => Field::Servo(n - 2),
            },
            Mode::Tuning if !self.nav_confirmed => Field::SubModeChoice(SubMode::MENU[row]),
            Mode::Tuning => match (self.sub_mode, row) {
                (SubMode::Servo, _) => Field::Servo(col),
                (SubMode::Pid, 0) => Field::PidGroup(col),
                (SubMode::Pid, gain_row) => Field::PidGain {
                    row: col,
                    gain: gain_row - 1,
                },
                (SubMode::Jacobian, _) => Field::Jacobian { row, col },
            },
        };
        Some(field)
    }

    /// Whether digits typed now edit a value
    pub fn accepts_value(&self) -> bool {
        self.nav_confirmed && self.field_at_cursor().is_some_and(|f| !f.is_selector())
    }

    pub(crate) fn in_pid_grid(&self) -> bool {
        self.mode == Mode::Tuning && self.nav_confirmed && self.sub_mode == SubMode::Pid
    }

    /// Back to the top-left cell of the selector level
    pub(crate) fn reset_cursor(&mut self) {
        self.nav_row = 0;
        self.nav_col = 0;
        self.nav_confirmed = false;
        self.input.clear();
    }

    /// Move the cursor by a step, stopping at the grid edges
    pub(crate) fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let row = self.nav_row.saturating_add_signed(d_row);
        let col = self.nav_col.saturating_add_signed(d_col);
        self.set_cursor(row, col);
    }

    /// Place the cursor, clamped to the active grid
    ///
    /// Partial input never carries over to another cell.
    pub(crate) fn set_cursor(&mut self, row: usize, col: usize) {
        let (row, col) = self.grid().clamp(row, col);
        self.nav_row = row;
        self.nav_col = col;
        self.input.clear();

        if self.in_pid_grid() {
            self.select_pid_row(col);
        }
    }

    /// Show another PID row, dropping a commit marker that belongs elsewhere
    pub(crate) fn select_pid_row(&mut self, row: usize) {
        if self.pid_tuning_marker.is_some_and(|marked| marked != row) {
            self.pid_tuning_marker = None;
        }
        self.selected_pid_row = row;
    }
}
