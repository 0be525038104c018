//! Poll loop.
//!
//! [`Poller::init`] runs once at startup: it locates the bridge, binds to the
//! pump switch and makes sure an AquaTemp session exists. Any failure there is
//! fatal. [`Poller::run`] then polls on a fixed period until cancelled.
//!
//! Inside a cycle only a rejected AquaTemp session is recovered, by one forced
//! login and one retry. If the retry is rejected as well the cycle is
//! aborted, counted and the loop waits for the next tick. Every other failure
//! ends the loop with an error.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use poolheat_core::{AquaTempClient, ErrorClass, HueBridge, discover_bridge};
use poolheat_types::{BridgeBinding, DeviceTelemetry, KeyValueStore};

use crate::config::{Config, HueConfig};
use crate::state::{AppState, Published};

/// Consecutive failures reported at warn level before going quiet.
const LOUD_FAILURES: u32 = 3;

/// Poll loop errors.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Failed to locate bridge: {0}")]
    Discovery(poolheat_core::Error),
    #[error("Failed to bind to pump switch: {0}")]
    Binding(poolheat_core::Error),
    #[error("Failed to log in: {0}")]
    Login(poolheat_core::Error),
    #[error("Failed to fetch telemetry: {0}")]
    Telemetry(poolheat_core::Error),
    #[error("Failed to read pump state: {0}")]
    PumpStatus(poolheat_core::Error),
}

impl PollError {
    /// Whether the poll loop must stop on this error.
    ///
    /// Only a session the cloud keeps rejecting is survivable; the next cycle
    /// starts over with another login attempt.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Login(e) | Self::Telemetry(e) => e.class() != ErrorClass::AuthExpired,
            _ => true,
        }
    }
}

/// Return a client for the configured bridge, discovering it if no URL is set.
pub async fn locate_bridge(
    config: &HueConfig,
    cancel: &CancellationToken,
) -> poolheat_core::Result<HueBridge> {
    let url = match &config.bridge_url {
        Some(url) => {
            info!("Using configured bridge at {}", url);
            url.clone()
        }
        None => discover_bridge(config.discovery_timeout(), cancel).await?,
    };
    HueBridge::new(&url)
}

/// Sequential poller for the heat pump and the pump switch.
pub struct Poller<S> {
    store: S,
    aquatemp: AquaTempClient,
    bridge: HueBridge,
    binding: BridgeBinding,
    pump_name: String,
    period: Duration,
    state: Arc<AppState>,
}

impl<S: KeyValueStore> Poller<S> {
    /// Run the startup sequence: discovery, binding, initial login.
    pub async fn init(
        config: &Config,
        store: S,
        state: Arc<AppState>,
        cancel: &CancellationToken,
    ) -> Result<Self, PollError> {
        let bridge = locate_bridge(&config.hue, cancel)
            .await
            .map_err(PollError::Discovery)?;
        Self::with_bridge(config, store, state, bridge).await
    }

    /// Like [`Poller::init`], for an already located bridge.
    pub async fn with_bridge(
        config: &Config,
        store: S,
        state: Arc<AppState>,
        bridge: HueBridge,
    ) -> Result<Self, PollError> {
        let access_id = bridge
            .ensure_access(&store)
            .await
            .map_err(PollError::Binding)?;
        let device_id = bridge
            .resolve_pump_device(&access_id, &config.hue.pump_name)
            .await
            .map_err(PollError::Binding)?;

        let binding = BridgeBinding {
            bridge_url: bridge.base_url().to_string(),
            access_id,
            device_id,
        };
        info!(
            "Bound to '{}' (device {}) on {}",
            config.hue.pump_name, binding.device_id, binding.bridge_url
        );

        let aquatemp = AquaTempClient::new(
            &config.aquatemp.base_url,
            &config.aquatemp.username,
            config.aquatemp.password(),
        )
        .map_err(PollError::Login)?;
        aquatemp
            .login(&store, false)
            .await
            .map_err(PollError::Login)?;

        Ok(Self {
            store,
            aquatemp,
            bridge,
            binding,
            pump_name: config.hue.pump_name.clone(),
            period: config.poll.interval(),
            state,
        })
    }

    /// The bridge binding established at startup.
    pub fn binding(&self) -> &BridgeBinding {
        &self.binding
    }

    /// Run one poll cycle and publish its values.
    pub async fn poll_once(&self) -> Result<Published, PollError> {
        let telemetry = self.fetch_with_reauth().await?;

        let pump_running = self
            .bridge
            .is_on(&self.binding.access_id, &self.binding.device_id)
            .await
            .map_err(PollError::PumpStatus)?;

        let published = Published {
            telemetry,
            pump_name: self.pump_name.clone(),
            pump_running,
            polled_at: OffsetDateTime::now_utc(),
        };
        self.state.publish(published.clone()).await;

        debug!(
            "Published {}: in={} out={} target={} on={} pump={}",
            published.telemetry.device_code,
            published.telemetry.snapshot.incoming,
            published.telemetry.snapshot.outgoing,
            published.telemetry.snapshot.target,
            published.telemetry.snapshot.on,
            published.pump_running
        );
        Ok(published)
    }

    /// Fetch telemetry, logging in again once if the session was rejected.
    async fn fetch_with_reauth(&self) -> Result<DeviceTelemetry, PollError> {
        let credentials = self
            .aquatemp
            .login(&self.store, false)
            .await
            .map_err(PollError::Login)?;

        match self.aquatemp.fetch_telemetry(&self.store, &credentials).await {
            Ok(telemetry) => Ok(telemetry),
            Err(e) if e.class() == ErrorClass::AuthExpired => {
                info!("AquaTemp session rejected ({}), logging in again", e);
                let credentials = self
                    .aquatemp
                    .login(&self.store, true)
                    .await
                    .map_err(PollError::Login)?;
                self.aquatemp
                    .fetch_telemetry(&self.store, &credentials)
                    .await
                    .map_err(PollError::Telemetry)
            }
            Err(e) => Err(PollError::Telemetry(e)),
        }
    }

    /// Poll every period until `cancel` fires or a cycle fails fatally.
    ///
    /// The first cycle runs immediately. A slow cycle delays the next one
    /// instead of triggering a burst.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), PollError> {
        info!("Polling every {}s", self.period.as_secs());

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.poll_once().await {
                Ok(_) => {
                    if consecutive_failures > 0 {
                        info!("Polling recovered after {} failure(s)", consecutive_failures);
                    }
                    consecutive_failures = 0;
                }
                Err(e) if e.is_fatal() => {
                    self.state.record_failure();
                    return Err(e);
                }
                Err(e) => {
                    self.state.record_failure();
                    consecutive_failures += 1;
                    if consecutive_failures <= LOUD_FAILURES {
                        warn!("Poll aborted: {} (attempt {})", e, consecutive_failures);
                    } else if consecutive_failures == LOUD_FAILURES + 1 {
                        error!(
                            "Poll aborted {} times in a row, will continue trying silently: {}",
                            consecutive_failures, e
                        );
                    } else {
                        debug!("Poll aborted: {}", e);
                    }
                }
            }
        }

        info!("Poll loop stopped");
        Ok(())
    }
}
