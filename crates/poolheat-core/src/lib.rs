//! Vendor clients for the pool heat-pump exporter.
//!
//! This crate talks to the two upstream systems the exporter observes:
//!
//! - **AquaTemp cloud**: login with cached session tokens, device resolution
//!   and telemetry reads ([`AquaTempClient`])
//! - **Hue bridge**: access registration, pump device lookup and on/off state
//!   ([`HueBridge`])
//! - **Bridge discovery**: bounded mDNS browse for `_hue._tcp.local.`
//!   ([`discover_bridge`])
//!
//! Persistent state (session, device code, bridge access id) goes through any
//! [`poolheat_types::KeyValueStore`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use poolheat_core::{HueBridge, discover_bridge};
//! use poolheat_store::Store;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Store::open_default()?;
//!
//!     let url = discover_bridge(Duration::from_secs(30), &CancellationToken::new()).await?;
//!     let bridge = HueBridge::new(&url)?;
//!     let access_id = bridge.ensure_access(&store).await?;
//!     let pump = bridge.resolve_pump_device(&access_id, "Poolpump").await?;
//!
//!     println!("pump running: {}", bridge.is_on(&access_id, &pump).await?);
//!     Ok(())
//! }
//! ```

pub mod aquatemp;
pub mod discovery;
pub mod error;
pub mod hue;

pub use aquatemp::{AquaTempClient, DataPoint, hash_password, parse_data_points};
pub use discovery::{Announcement, MdnsBrowser, ServiceBrowser, discover, discover_bridge};
pub use error::{Error, ErrorClass, Rejection, Result};
pub use hue::HueBridge;

// Re-export the shared types for convenience
pub use poolheat_types::{
    BridgeBinding, CredentialRecord, DataCode, DeviceTelemetry, KeyValueStore,
    SENTINEL_TEMPERATURE, TelemetrySnapshot,
};
