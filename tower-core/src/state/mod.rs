//! Control state and mode state machine
//!
//! The mode decides which uplink frame shape is sent and which navigation
//! grid is active. Mode changes go through a fixed transition rule; entering
//! STOP is the single path that zeroes the drive commands.

pub mod control;
pub mod mode;

pub use control::{ControlState, PidRow, TelemetryMirror};
pub use mode::{Mode, SubMode, TransitionRejected};
