//! Navigation and tuning controller
//!
//! Every mode presents a small grid of fields. The operator moves a cursor
//! over it, confirms to choose or to start editing, and types numbers that are
//! written straight into the addressed field.
//!
//! ```text
//! STOP            AUTO / TOWER                 TUNING
//! ┌───────┐       ┌────┬─────┬──┬──┬──┬──┐     ┌──────────┐
//! │ AUTO  │       │ SW │ SPD │S0│S1│S2│S3│     │ SERVO    │──▶ 1 × 4
//! │ TOWER │       └────┴─────┴──┴──┴──┴──┘     │ PID      │──▶ 7 × N
//! │ TUNING│                                    │ JACOBIAN │──▶ 3 × 4
//! └───────┘                                    └──────────┘
//! ```

pub mod controller;
pub mod grid;
pub mod input;

pub use controller::{NavEvent, Navigator};
pub use grid::{Field, Grid};
pub use input::NumericInput;
