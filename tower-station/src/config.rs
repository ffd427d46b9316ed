//! Station configuration
//!
//! Loaded from a TOML file. Every section is optional and falls back to the
//! defaults in the embedded `station.toml`:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baudrate = 115200
//!
//! [link]
//! send_period_ms = 20
//! auto_send = false
//!
//! [[control.pid_rows]]
//! name = "roll_rate"
//! code = 0xA2
//! gains = { kp = 0.5, ki = 0.05, kd = 0.01, integral_clamp = 100.0, output_max = 500.0, output_min = -500.0 }
//! ```

use std::fs;
use std::io;
use std::path::Path;

use embassy_time::Duration;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use tower_core::config::ControlConfig;
use tower_core::link::DEFAULT_TELEMETRY_TIMEOUT_MS;
use tower_protocol::PID_MARKER_NONE;

use crate::transport::SerialConfig;

/// Default configuration shipped with the station
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/station.toml");

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// File could not be read
    Io(io::ErrorKind),
    /// File is not valid UTF-8
    InvalidUtf8,
    /// TOML parsing failed
    TomlParse,
    /// PID table is empty
    NoPidRows,
    /// PID row uses the "no row" marker as its code
    ReservedPidCode(u8),
    /// Two PID rows share a code
    DuplicatePidCode(u8),
    /// A loop period or timeout is zero
    InvalidPeriod,
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e.kind())
    }
}

/// I/O loop timing and behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Auto-send period (ms)
    pub send_period_ms: u32,
    /// Receive loop sleep when no bytes are pending (ms)
    pub receive_poll_ms: u32,
    /// Receive loop sleep after a transport error or while closed (ms)
    pub error_backoff_ms: u32,
    /// Start with auto-send enabled
    pub auto_send: bool,
    /// Skip auto-send writes whose bytes equal the previous frame
    pub send_on_change: bool,
    /// Telemetry older than this is stale (ms)
    pub telemetry_timeout_ms: u32,
    /// Bound on waiting for each loop to exit on stop (ms)
    pub join_timeout_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            send_period_ms: 20,
            receive_poll_ms: 10,
            error_backoff_ms: 100,
            auto_send: false,
            send_on_change: false,
            telemetry_timeout_ms: DEFAULT_TELEMETRY_TIMEOUT_MS,
            join_timeout_ms: 500,
        }
    }
}

impl LinkConfig {
    pub fn send_period(&self) -> Duration {
        Duration::from_millis(self.send_period_ms as u64)
    }

    pub fn receive_poll(&self) -> Duration {
        Duration::from_millis(self.receive_poll_ms as u64)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms as u64)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms as u64)
    }
}

/// Complete station configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    pub serial: SerialConfig,
    pub link: LinkConfig,
    pub control: ControlConfig,
}

impl StationConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: StationConfig = toml::from_str(text).map_err(|e| {
            warn!("TOML parse error: {}", e);
            ConfigError::TomlParse
        })?;

        config.validate()?;
        log_config_summary(&config);
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading configuration from {}", path.display());

        let bytes = fs::read(path)?;
        debug!("Read {} bytes of TOML", bytes.len());

        let text = std::str::from_utf8(&bytes).map_err(|_| ConfigError::InvalidUtf8)?;
        Self::from_toml_str(text)
    }

    /// Configuration shipped with the station
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        let link = &self.link;
        if link.send_period_ms == 0
            || link.receive_poll_ms == 0
            || link.error_backoff_ms == 0
            || link.telemetry_timeout_ms == 0
        {
            return Err(ConfigError::InvalidPeriod);
        }

        let rows = &self.control.pid_rows;
        if rows.is_empty() {
            return Err(ConfigError::NoPidRows);
        }
        for (i, row) in rows.iter().enumerate() {
            if row.code == PID_MARKER_NONE {
                return Err(ConfigError::ReservedPidCode(row.code));
            }
            if rows[..i].iter().any(|other| other.code == row.code) {
                return Err(ConfigError::DuplicatePidCode(row.code));
            }
        }
        Ok(())
    }
}

/// Log a summary of the loaded configuration
fn log_config_summary(config: &StationConfig) {
    info!("Configuration loaded successfully");
    if config.serial.port.is_empty() {
        debug!("  serial: first available port @ {} baud", config.serial.baudrate);
    } else {
        debug!(
            "  serial: {} @ {} baud",
            config.serial.port, config.serial.baudrate
        );
    }
    debug!(
        "  link: send every {} ms (auto-send {}), poll every {} ms",
        config.link.send_period_ms,
        if config.link.auto_send { "on" } else { "off" },
        config.link.receive_poll_ms
    );
    debug!("  {} PID rows", config.control.pid_rows.len());
    for row in &config.control.pid_rows {
        debug!("    {} (0x{:02X})", row.name, row.code);
    }
    debug!("  {} presets", config.control.presets.len());
}
