//! Ground station host runtime
//!
//! Connects the transport-agnostic control logic to a byte transport:
//!
//! - Transport traits, a `std::io` adapter and an in-memory mock
//! - Shared state behind one critical section
//! - Uplink and downlink loops on named threads
//! - Telemetry fan-out to registered consumers
//! - TOML configuration
//!
//! Logging goes through the `log` facade; the embedding binary picks the
//! backend.
//!
//! # Example
//!
//! ```no_run
//! use tower_core::{Action, Mode};
//! use tower_station::transport::{StreamRx, StreamTx};
//! use tower_station::{Station, StationConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StationConfig::embedded().map_err(|e| format!("{:?}", e))?;
//! let port = std::net::TcpStream::connect("127.0.0.1:5760")?;
//! port.set_read_timeout(Some(std::time::Duration::from_millis(10)))?;
//!
//! let station = Station::new(config);
//! let telemetry = station.subscribe().map_err(|e| format!("{:?}", e))?;
//! let handle = station
//!     .start(StreamTx::new(port.try_clone()?), StreamRx::new(port))
//!     .map_err(|e| format!("{:?}", e))?;
//!
//! station.request_mode(Mode::Auto).map_err(|e| format!("{:?}", e))?;
//! station.handle_action(Action::Preset(1));
//! station.set_auto_send(true);
//!
//! for record in telemetry.drain() {
//!     println!("roll {}", record.telemetry.roll);
//! }
//! handle.stop();
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod channels;
pub mod config;
pub mod shared;
pub mod station;
pub mod tasks;
pub mod transport;

pub use channels::{TelemetryBus, TelemetryReceiver, TelemetryRecord};
pub use config::{ConfigError, LinkConfig, StationConfig};
pub use shared::{SharedState, StationState};
pub use station::{Station, StationError, StationHandle, StationView};
pub use transport::{LinkRx, LinkTx, SerialConfig, TransportError};
