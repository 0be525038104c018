//! Durable credential and binding cache for the pool heat-pump exporter.
//!
//! This crate provides a SQLite-backed key-value [`Store`] implementing
//! [`poolheat_types::KeyValueStore`]. It survives process restarts and holds
//! the AquaTemp session, the resolved device code and the bridge access id.
//!
//! # Example
//!
//! ```no_run
//! use poolheat_store::Store;
//! use poolheat_types::{KeyValueStore, keys};
//!
//! let store = Store::open_default()?;
//! if let Some(access_id) = store.get(keys::BRIDGE_ACCESS_ID)? {
//!     println!("bridge access id: {}", String::from_utf8_lossy(&access_id));
//! }
//! # Ok::<(), poolheat_store::Error>(())
//! ```

mod error;
mod schema;
mod store;

pub use error::{Error, Result};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/poolheatmetrics/state.db`
/// - macOS: `~/Library/Application Support/poolheatmetrics/state.db`
/// - Windows: `C:\Users\<user>\AppData\Local\poolheatmetrics\state.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("poolheatmetrics")
        .join("state.db")
}
