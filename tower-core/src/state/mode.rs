//! Operating modes and the transition rule

/// Top-level operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Safe state, drive commands zeroed
    #[default]
    Stop,
    /// Vehicle flies its own control law
    Auto,
    /// Ground station drives the vehicle
    Tower,
    /// In-flight parameter tuning
    Tuning,
}

/// Tuning target, meaningful only in [`Mode::Tuning`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubMode {
    #[default]
    Servo,
    Pid,
    Jacobian,
}

/// An illegal mode transition was requested
///
/// The mode is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransitionRejected {
    pub from: Mode,
    pub to: Mode,
}

impl Mode {
    /// All modes, in selector order
    pub const ALL: [Mode; 4] = [Mode::Stop, Mode::Auto, Mode::Tower, Mode::Tuning];

    /// Modes offered by the STOP selector grid, top to bottom
    pub const STOP_MENU: [Mode; 3] = [Mode::Auto, Mode::Tower, Mode::Tuning];

    /// Check whether a transition to `to` is allowed
    ///
    /// STOP can be entered from anywhere; STOP and TUNING can be left for
    /// anything; AUTO and TOWER can swap directly. Everything else must pass
    /// through STOP.
    pub fn can_transition_to(self, to: Mode) -> bool {
        use Mode::*;

        match (self, to) {
            (_, Stop) => true,
            (Stop, _) => true,
            (Tuning, _) => true,
            (Auto, Tower) | (Tower, Auto) => true,
            _ => false,
        }
    }

    /// Check if this mode commands the drive outputs
    pub fn is_drive(&self) -> bool {
        matches!(self, Mode::Auto | Mode::Tower)
    }

    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Stop => "STOP",
            Mode::Auto => "AUTO",
            Mode::Tower => "TOWER",
            Mode::Tuning => "TUNING",
        }
    }
}

impl SubMode {
    /// Sub-modes offered by the TUNING selector grid, top to bottom
    pub const MENU: [SubMode; 3] = [SubMode::Servo, SubMode::Pid, SubMode::Jacobian];

    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            SubMode::Servo => "SERVO",
            SubMode::Pid => "PID",
            SubMode::Jacobian => "JACOBIAN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reachable_from_any_mode() {
        for from in Mode::ALL {
            assert!(from.can_transition_to(Mode::Stop));
        }
    }

    #[test]
    fn test_stop_and_tuning_leave_to_any_mode() {
        for to in Mode::ALL {
            assert!(Mode::Stop.can_transition_to(to));
            assert!(Mode::Tuning.can_transition_to(to));
        }
    }

    #[test]
    fn test_drive_modes_swap_directly() {
        assert!(Mode::Auto.can_transition_to(Mode::Tower));
        assert!(Mode::Tower.can_transition_to(Mode::Auto));
    }

    #[test]
    fn test_tuning_requires_stop_first() {
        assert!(!Mode::Auto.can_transition_to(Mode::Tuning));
        assert!(!Mode::Tower.can_transition_to(Mode::Tuning));
    }

    #[test]
    fn test_full_transition_table() {
        use Mode::*;

        // (from, to, allowed)
        let table = [
            (Stop, Stop, true),
            (Stop, Auto, true),
            (Stop, Tower, true),
            (Stop, Tuning, true),
            (Auto, Stop, true),
            (Auto, Auto, false),
            (Auto, Tower, true),
            (Auto, Tuning, false),
            (Tower, Stop, true),
            (Tower, Auto, true),
            (Tower, Tower, false),
            (Tower, Tuning, false),
            (Tuning, Stop, true),
            (Tuning, Auto, true),
            (Tuning, Tower, true),
            (Tuning, Tuning, true),
        ];

        for (from, to, allowed) in table {
            assert_eq!(from.can_transition_to(to), allowed, "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn test_is_drive() {
        assert!(Mode::Auto.is_drive());
        assert!(Mode::Tower.is_drive());
        assert!(!Mode::Stop.is_drive());
        assert!(!Mode::Tuning.is_drive());
    }
}
