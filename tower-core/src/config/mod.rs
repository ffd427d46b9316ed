//! Configuration types
//!
//! Defines the tunable tables and presets a ground station starts from.

pub mod types;

pub use types::*;
