//! Shared types for the pool heat-pump metrics exporter.
//!
//! This crate holds the plain data passed between the vendor clients
//! (`poolheat-core`), the credential store (`poolheat-store`) and the
//! exporter service (`poolheat-service`).
//!
//! # Example
//!
//! ```
//! use poolheat_types::{DataCode, TelemetrySnapshot};
//!
//! let mut snapshot = TelemetrySnapshot::default();
//! snapshot.apply(DataCode::Incoming, 18.5);
//! assert_eq!(snapshot.incoming, 18.5);
//! assert_eq!(snapshot.target, -1.0);
//! ```

pub mod kv;
pub mod types;

pub use kv::{KeyValueStore, keys};
pub use types::{
    BridgeBinding, CredentialRecord, DataCode, DeviceTelemetry, SENTINEL_TEMPERATURE,
    TelemetrySnapshot,
};

#[cfg(test)]
mod tests {
    use super::*;

    // --- DataCode tests ---

    #[test]
    fn test_data_code_strings() {
        assert_eq!(DataCode::Target.as_str(), "R02");
        assert_eq!(DataCode::Incoming.as_str(), "T02");
        assert_eq!(DataCode::Outgoing.as_str(), "T03");
        assert_eq!(DataCode::Power.as_str(), "Power");
    }

    #[test]
    fn test_data_code_lookup() {
        for code in DataCode::ALL {
            assert_eq!(DataCode::from_code(code.as_str()), Some(code));
        }
        assert_eq!(DataCode::from_code("r02"), None);
        assert_eq!(DataCode::from_code(""), None);
    }

    #[test]
    fn test_data_code_display() {
        assert_eq!(DataCode::Power.to_string(), "Power");
    }

    // --- TelemetrySnapshot tests ---

    #[test]
    fn test_snapshot_default_is_sentinel() {
        let snapshot = TelemetrySnapshot::default();
        assert_eq!(snapshot.incoming, SENTINEL_TEMPERATURE);
        assert_eq!(snapshot.outgoing, SENTINEL_TEMPERATURE);
        assert_eq!(snapshot.target, SENTINEL_TEMPERATURE);
        assert!(!snapshot.on);
    }

    #[test]
    fn test_snapshot_apply_all_codes() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.apply(DataCode::Target, 21.0);
        snapshot.apply(DataCode::Incoming, 18.5);
        snapshot.apply(DataCode::Outgoing, 19.0);
        snapshot.apply(DataCode::Power, 1.0);

        assert_eq!(
            snapshot,
            TelemetrySnapshot {
                incoming: 18.5,
                outgoing: 19.0,
                target: 21.0,
                on: true,
            }
        );
    }

    #[test]
    fn test_snapshot_power_truthiness() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.apply(DataCode::Power, 0.5);
        assert!(snapshot.on);
        snapshot.apply(DataCode::Power, 0.0);
        assert!(!snapshot.on);
        snapshot.apply(DataCode::Power, -1.0);
        assert!(snapshot.on);
    }

    // --- CredentialRecord tests ---

    #[test]
    fn test_credential_debug_redacts_token() {
        let record = CredentialRecord::new("very-secret-token", "U1");
        let debug_str = format!("{:?}", record);
        assert!(!debug_str.contains("very-secret-token"));
        assert!(debug_str.contains("U1"));
    }

    #[test]
    fn test_credential_serialization() {
        let record = CredentialRecord::new("T1", "U1");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"token":"T1","user_id":"U1"}"#);

        let parsed: CredentialRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    // --- Keys tests ---

    #[test]
    fn test_device_key_is_scoped_per_user() {
        assert_ne!(keys::device("U1"), keys::device("U2"));
        assert!(keys::device("U1").starts_with(keys::DEVICE_PREFIX));
    }
}
