//! Operator actions
//!
//! Whatever captures keys or buttons reduces them to these actions before
//! handing them to the [`Navigator`](crate::navigation::Navigator).

/// A discrete operator action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    /// Choose the entry under the cursor, or toggle value editing
    Confirm,
    /// Leave the tuning grid, or request STOP
    Escape,
    /// Numeric key 0-9
    Digit(u8),
    DecimalPoint,
    Backspace,
    /// Flip the main switch between off and on
    ToggleSwitch,
    /// Load command preset N (1-based)
    Preset(u8),
}

impl Action {
    /// Map a typed character to a numeric entry action
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0'..='9' => c.to_digit(10).map(|d| Action::Digit(d as u8)),
            '.' => Some(Action::DecimalPoint),
            _ => None,
        }
    }

    /// Returns true if this action moves the cursor
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Action::Up | Action::Down | Action::Left | Action::Right
        )
    }

    /// Returns true if this action edits the entry buffer
    pub fn is_entry(&self) -> bool {
        matches!(
            self,
            Action::Digit(_) | Action::DecimalPoint | Action::Backspace
        )
    }
}
