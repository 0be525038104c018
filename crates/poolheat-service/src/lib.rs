//! Prometheus exporter for a pool heat pump and its circulation pump.
//!
//! This crate provides a service that:
//! - Locates the Hue bridge over mDNS (or uses a configured URL)
//! - Polls the AquaTemp cloud for heat-pump temperatures and power state
//! - Reads the pool pump's smart plug from the bridge
//! - Exposes the values on `GET /metrics` in Prometheus text format
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/poolheatmetrics/config.toml`:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8023"
//!
//! [aquatemp]
//! username = "me@example.com"
//! password = "secret"
//!
//! [hue]
//! pump_name = "Poolpump"
//! discovery_timeout = 30
//!
//! [poll]
//! interval = 60
//! ```
//!
//! # First start
//!
//! The bridge only grants access right after its link button was pressed.
//! Press it, then run `poolheatmetrics pair` (or start the service) within
//! 30 seconds. The granted access id is stored and reused from then on.

pub mod api;
pub mod config;
pub mod logging;
pub mod poller;
pub mod state;

pub use config::{
    AquaTempConfig, Config, ConfigError, HueConfig, LoggingConfig, PollConfig, ServerConfig,
    StorageConfig,
};
pub use poller::{PollError, Poller};
pub use state::{AppState, Published};
