//! Configuration type definitions
//!
//! These types describe the control tables the station starts with. On the
//! host they are deserialized from the station's TOML file; every struct has a
//! default so a partial file is enough.

use heapless::{String, Vec};
use tower_protocol::PidGains;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum label length
pub const MAX_LABEL_LEN: usize = 16;

/// Maximum number of tunable control loops
pub const MAX_PID_ROWS: usize = 8;

/// Maximum number of command presets
pub const MAX_PRESETS: usize = 9;

/// One tunable control loop
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidRowConfig {
    /// Display name
    pub name: String<MAX_LABEL_LEN>,
    /// Marker byte announced while this row is being committed
    pub code: u8,
    /// Starting gains
    #[cfg_attr(feature = "serde", serde(default))]
    pub gains: PidGains,
}

/// A command preset applied in AUTO or TOWER
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PresetConfig {
    pub switch: u8,
    pub speed: i16,
    pub servos: [f32; 4],
}

/// Control tables and presets
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControlConfig {
    /// PID table rows, fixed for the life of the station
    pub pid_rows: Vec<PidRowConfig, MAX_PID_ROWS>,
    /// Control allocation matrix
    pub jacobian: [[f32; 4]; 3],
    /// Presets, selected 1-based
    pub presets: Vec<PresetConfig, MAX_PRESETS>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            pid_rows: default_pid_rows(),
            jacobian: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            presets: default_presets(),
        }
    }
}

fn label(text: &str) -> String<MAX_LABEL_LEN> {
    let mut s = String::new();
    let _ = s.push_str(text);
    s
}

/// Angle (outer) and rate (inner) loops for each axis
fn default_pid_rows() -> Vec<PidRowConfig, MAX_PID_ROWS> {
    let angle = PidGains {
        kp: 4.0,
        ki: 0.0,
        kd: 0.0,
        integral_clamp: 0.0,
        output_max: 200.0,
        output_min: -200.0,
    };
    let rate = PidGains {
        kp: 0.5,
        ki: 0.05,
        kd: 0.01,
        integral_clamp: 100.0,
        output_max: 500.0,
        output_min: -500.0,
    };

    let rows = [
        ("roll_angle", 0xA1, angle),
        ("roll_rate", 0xA2, rate),
        ("pitch_angle", 0xB1, angle),
        ("pitch_rate", 0xB2, rate),
        ("yaw_angle", 0xC1, angle),
        ("yaw_rate", 0xC2, rate),
    ];

    let mut table = Vec::new();
    for (name, code, gains) in rows {
        let _ = table.push(PidRowConfig {
            name: label(name),
            code,
            gains,
        });
    }
    table
}

fn default_presets() -> Vec<PresetConfig, MAX_PRESETS> {
    let mut presets = Vec::new();
    let _ = presets.push(PresetConfig {
        switch: 1,
        speed: 1000,
        servos: [500.0; 4],
    });
    let _ = presets.push(PresetConfig {
        switch: 1,
        speed: 2000,
        servos: [1000.0; 4],
    });
    presets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pid_table() {
        let config = ControlConfig::default();
        let codes: Vec<u8, MAX_PID_ROWS> = config.pid_rows.iter().map(|r| r.code).collect();

        assert_eq!(config.pid_rows.len(), 6);
        assert_eq!(&codes[..], &[0xA1, 0xA2, 0xB1, 0xB2, 0xC1, 0xC2]);
        assert_eq!(config.pid_rows[3].name.as_str(), "pitch_rate");
    }

    #[test]
    fn test_default_gains_respect_limits() {
        for row in ControlConfig::default().pid_rows {
            assert!(row.gains.output_min <= 0.0);
            assert!(row.gains.output_max >= 0.0);
            assert!(row.gains.kp >= 0.0);
        }
    }

    #[test]
    fn test_default_presets() {
        let presets = ControlConfig::default().presets;
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0].speed, 1000);
        assert_eq!(presets[1].servos, [1000.0; 4]);
    }
}
