//! Carrier Tower Link Protocol
//!
//! This crate defines the serial protocol between the ground station (tower)
//! and the vehicle. Commands flow up in one of six fixed-size frame shapes
//! chosen by the operating mode; telemetry flows down in a single shape.
//!
//! # Protocol Overview
//!
//! Uplink frames (ground → vehicle):
//! ```text
//! ┌──────┬─────────┬───────────────────┬──────┬───────┐
//! │ 0xAA │ TAG     │ FIELDS            │ 0xBB │ CRC-8 │
//! │ 1B   │ 1B      │ 0–49B             │ 1B   │ 1B    │
//! └──────┴─────────┴───────────────────┴──────┴───────┘
//! ```
//!
//! Downlink frames (vehicle → ground):
//! ```text
//! ┌──────┬────────┬──────┬───────┬─────┬──────┬───────┐
//! │ 0xCC │ SWITCH │ ROLL │ PITCH │ YAW │ 0xDD │ CRC-8 │
//! │ 1B   │ 1B     │ f32  │ f32   │ f32 │ 1B   │ 1B    │
//! └──────┴────────┴──────┴───────┴─────┴──────┴───────┘
//! ```
//!
//! All multi-byte fields are little-endian. The CRC covers every byte from the
//! header through the tail inclusive.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod checksum;
mod wire;
pub mod frame;
pub mod framer;
pub mod telemetry;

pub use checksum::crc8;
pub use frame::{
    DriveCommand, FrameError, PidGains, Uplink, UplinkKind, MAX_UPLINK_FRAME_SIZE,
    PID_MARKER_NONE, UPLINK_HEADER, UPLINK_TAIL,
};
pub use framer::{FramerStats, StreamFramer};
pub use telemetry::{Telemetry, DOWNLINK_HEADER, DOWNLINK_TAIL, TELEMETRY_FRAME_LEN};
