//! Error types for poolheat-core.
//!
//! # Recovery
//!
//! Only one failure class is recovered locally: when the AquaTemp cloud
//! rejects a request made with cached credentials, the poll loop forces a
//! fresh login once and retries. [`Error::class`] tells the two apart so
//! callers can match on it instead of guessing from the variant.
//!
//! | Error | Class | Notes |
//! |-------|-------|-------|
//! | [`Error::Auth`] | `AuthExpired` if vendor/401/403 rejection | Logging in |
//! | [`Error::DeviceResolution`] | `AuthExpired` if vendor/401/403 rejection | Listing shared devices |
//! | [`Error::TelemetryFetch`] | `AuthExpired` if vendor/401/403 rejection | Reading data points |
//! | [`Error::DiscoveryTimeout`] | `Other` | Fatal at startup |
//! | [`Error::AccessNotGranted`] | `Other` | Press the bridge link button and restart |
//! | [`Error::DeviceNotFound`] | `Other` | Pump name not configured on bridge |
//! | [`Error::StatusFetch`] | `Other` | Bridge light state |
//! | [`Error::Transport`] | `Other` | Network failure, not retried |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the vendor clients and bridge discovery.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// AquaTemp login failed.
    #[error("Authentication failed: {0}")]
    Auth(Rejection),

    /// Could not resolve the AquaTemp device code.
    #[error("Device resolution failed: {0}")]
    DeviceResolution(Rejection),

    /// Could not read data points from AquaTemp.
    #[error("Telemetry fetch failed: {0}")]
    TelemetryFetch(Rejection),

    /// No bridge announced itself within the bound.
    #[error("No bridge announced within {0:?}")]
    DiscoveryTimeout(Duration),

    /// Discovery was cancelled before a bridge was found.
    #[error("Discovery cancelled")]
    Cancelled,

    /// The mDNS daemon could not be started or queried.
    #[error("mDNS error: {0}")]
    Mdns(String),

    /// The bridge refused to register this client.
    #[error("Bridge access not granted: {0}")]
    AccessNotGranted(String),

    /// No bridge device carries the configured name.
    #[error("Device '{0}' not found on bridge")]
    DeviceNotFound(String),

    /// Could not read a device state from the bridge.
    #[error("Status fetch failed: {0}")]
    StatusFetch(Rejection),

    /// The request never produced a response.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The credential store failed.
    #[error("Credential store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// How the poll loop should react to an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Cached credentials were rejected; a forced login may fix it.
    AuthExpired,
    /// Anything else.
    Other,
}

/// Why an upstream service refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    /// Non-success HTTP status.
    Status { status: u16, body: String },
    /// HTTP succeeded but the vendor reported an application error.
    Vendor { code: i64, message: String },
    /// The response was well-formed but lacked the expected item.
    Missing(&'static str),
}

impl Rejection {
    /// Whether this rejection points at stale or invalid credentials.
    pub fn is_auth_related(&self) -> bool {
        match self {
            Self::Vendor { .. } => true,
            Self::Status { status, .. } => matches!(status, 401 | 403),
            Self::Missing(_) => false,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { status, body } if body.is_empty() => write!(f, "HTTP {}", status),
            Self::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            Self::Vendor { code, message } if message.is_empty() => {
                write!(f, "error_code {}", code)
            }
            Self::Vendor { code, message } => write!(f, "error_code {}: {}", code, message),
            Self::Missing(what) => write!(f, "response contained no {}", what),
        }
    }
}

impl Error {
    /// Classify this error for the reauthentication policy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Auth(r) | Self::DeviceResolution(r) | Self::TelemetryFetch(r)
                if r.is_auth_related() =>
            {
                ErrorClass::AuthExpired
            }
            _ => ErrorClass::Other,
        }
    }

    /// Wrap a credential store error.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }
}

/// Result type alias using poolheat-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
