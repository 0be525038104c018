//! Core types for heat-pump telemetry and bridge bindings.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value reported for a temperature the vendor did not return in a poll.
pub const SENTINEL_TEMPERATURE: f64 = -1.0;

/// Data point codes requested from the AquaTemp cloud.
///
/// Each code maps onto exactly one field of [`TelemetrySnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataCode {
    /// `R02`: target water temperature.
    Target,
    /// `T02`: incoming water temperature.
    Incoming,
    /// `T03`: outgoing water temperature.
    Outgoing,
    /// `Power`: heat pump switched on.
    Power,
}

impl DataCode {
    /// All codes, in the order they are requested.
    pub const ALL: [DataCode; 4] = [
        DataCode::Target,
        DataCode::Incoming,
        DataCode::Outgoing,
        DataCode::Power,
    ];

    /// The vendor's protocol code string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DataCode::Target => "R02",
            DataCode::Incoming => "T02",
            DataCode::Outgoing => "T03",
            DataCode::Power => "Power",
        }
    }

    /// Look up a vendor protocol code. Unknown codes yield `None`.
    ///
    /// ```
    /// use poolheat_types::DataCode;
    ///
    /// assert_eq!(DataCode::from_code("T02"), Some(DataCode::Incoming));
    /// assert_eq!(DataCode::from_code("Set_Temp"), None);
    /// ```
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }
}

impl fmt::Display for DataCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One poll's worth of heat-pump readings.
///
/// Fields the vendor did not return keep their sentinel: `-1.0` for
/// temperatures and `false` for the power flag.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TelemetrySnapshot {
    /// Incoming water temperature in °C.
    pub incoming: f64,
    /// Outgoing water temperature in °C.
    pub outgoing: f64,
    /// Target water temperature in °C.
    pub target: f64,
    /// Whether the heat pump is switched on.
    pub on: bool,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            incoming: SENTINEL_TEMPERATURE,
            outgoing: SENTINEL_TEMPERATURE,
            target: SENTINEL_TEMPERATURE,
            on: false,
        }
    }
}

impl TelemetrySnapshot {
    /// Store a reported value in the field the code maps to.
    ///
    /// `Power` is interpreted by truthiness: any non-zero value means on.
    pub fn apply(&mut self, code: DataCode, value: f64) {
        match code {
            DataCode::Target => self.target = value,
            DataCode::Incoming => self.incoming = value,
            DataCode::Outgoing => self.outgoing = value,
            DataCode::Power => self.on = value != 0.0,
        }
    }
}

/// Telemetry together with the vendor device code it was read from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceTelemetry {
    /// Vendor-assigned device code.
    pub device_code: String,
    /// The readings.
    pub snapshot: TelemetrySnapshot,
}

/// Cached AquaTemp session.
///
/// Token and user id are always stored together as one record.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CredentialRecord {
    /// Session token sent as the `x-token` header.
    pub token: String,
    /// Account user id.
    pub user_id: String,
}

impl CredentialRecord {
    /// Create a new record.
    pub fn new(token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_id: user_id.into(),
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Where the pump switch lives on the local bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BridgeBinding {
    /// Bridge base URL, rediscovered on every start.
    pub bridge_url: String,
    /// Bridge-issued access id (the Hue "username").
    pub access_id: String,
    /// Bridge-internal id of the pump switch.
    pub device_id: String,
}
