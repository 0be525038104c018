//! Durable key-value persistence seam.
//!
//! The exporter keeps three logical entries across restarts: the AquaTemp
//! credential record, the resolved device code (scoped per account) and the
//! bridge access id. Any backend implementing [`KeyValueStore`] can hold them.

/// A durable byte-oriented key-value map.
///
/// Accessed from a single thread of control; implementations need no
/// internal locking.
pub trait KeyValueStore {
    /// Backend error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), Self::Error>;

    /// Whether a value is stored under `key`.
    fn contains(&self, key: &str) -> Result<bool, Self::Error> {
        Ok(self.get(key)?.is_some())
    }
}

/// Fixed keys used by the exporter.
pub mod keys {
    /// AquaTemp token and user id, stored as one JSON record.
    pub const CREDENTIALS: &str = "aquatemp.credentials";

    /// Prefix of the per-account device code entries.
    pub const DEVICE_PREFIX: &str = "aquatemp.device.";

    /// Access id granted by the Hue bridge.
    pub const BRIDGE_ACCESS_ID: &str = "hue.access_id";

    /// Key of the device code cached for `user_id`.
    ///
    /// ```
    /// assert_eq!(poolheat_types::keys::device("42"), "aquatemp.device.42");
    /// ```
    #[must_use]
    pub fn device(user_id: &str) -> String {
        format!("{DEVICE_PREFIX}{user_id}")
    }
}
