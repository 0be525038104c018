//! State shared between the poll loop and the metrics endpoint.
//!
//! The poll loop is the only writer. Each successful cycle replaces the
//! published values as one [`Published`] snapshot, so a scrape sees either
//! the previous cycle or the new one and never a mix.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tokio::sync::RwLock;

use poolheat_types::DeviceTelemetry;

/// Values published by one successful poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    /// Heat-pump readings and the device they came from.
    pub telemetry: DeviceTelemetry,
    /// Configured name of the pump switch.
    pub pump_name: String,
    /// Whether the pump switch is on.
    pub pump_running: bool,
    /// When the cycle completed.
    pub polled_at: OffsetDateTime,
}

/// Shared application state.
#[derive(Debug, Default)]
pub struct AppState {
    latest: RwLock<Option<Arc<Published>>>,
    poll_failures: AtomicU64,
}

impl AppState {
    /// Create new application state with nothing published.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the published values.
    pub async fn publish(&self, published: Published) {
        *self.latest.write().await = Some(Arc::new(published));
    }

    /// The most recently published values, if any cycle succeeded yet.
    pub async fn latest(&self) -> Option<Arc<Published>> {
        self.latest.read().await.clone()
    }

    /// Count a failed poll cycle.
    pub fn record_failure(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of failed poll cycles since start.
    pub fn poll_failures(&self) -> u64 {
        self.poll_failures.load(Ordering::Relaxed)
    }
}
