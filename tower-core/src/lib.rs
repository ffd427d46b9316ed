//! Transport-agnostic ground station logic
//!
//! This crate contains everything between the operator's key presses and the
//! bytes on the wire, without touching the wire itself:
//!
//! - Control state (commands, tuning tables, cursor, telemetry mirror)
//! - Mode state machine and uplink frame selection
//! - Navigation/tuning controller over per-mode grids
//! - Link health monitoring
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod input;
pub mod link;
pub mod navigation;
pub mod state;

pub use input::Action;
pub use link::{LinkMonitor, LinkStats, LinkStatus};
pub use navigation::{Field, Grid, NavEvent, Navigator, NumericInput};
pub use state::{ControlState, Mode, PidRow, SubMode, TelemetryMirror, TransitionRejected};
