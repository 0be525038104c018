//! Bridge discovery over mDNS.
//!
//! [`discover`] drives a [`ServiceBrowser`] until the first resolved
//! announcement arrives, checking once per [`POLL_INTERVAL`] until the bound
//! expires or the cancellation token fires.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use mdns_sd::{Receiver, ServiceDaemon, ServiceEvent};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::hue::SERVICE_TYPE;

/// How long each check waits for an announcement.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A resolved service announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Full mDNS instance name.
    pub fullname: String,
    /// Addresses the instance resolved to.
    pub addresses: Vec<IpAddr>,
    /// Announced port.
    pub port: u16,
}

impl Announcement {
    /// Base URL of the announced service.
    ///
    /// Port 443 selects `https`, anything else `http`. IPv4 addresses are
    /// preferred; `None` when the announcement carried no address.
    pub fn url(&self) -> Option<String> {
        let addr = self
            .addresses
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| self.addresses.first())?;

        let host = match addr {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{}]", v6),
        };

        Some(match self.port {
            443 => format!("https://{}", host),
            80 => format!("http://{}", host),
            port => format!("http://{}:{}", host, port),
        })
    }
}

/// Source of service announcements.
#[async_trait]
pub trait ServiceBrowser: Send {
    /// Wait up to `wait` for the next resolved announcement.
    ///
    /// `Ok(None)` means nothing arrived in time.
    async fn next_announcement(&mut self, wait: Duration) -> Result<Option<Announcement>>;
}

/// [`ServiceBrowser`] backed by the `mdns-sd` daemon.
pub struct MdnsBrowser {
    daemon: ServiceDaemon,
    receiver: Receiver<ServiceEvent>,
}

impl MdnsBrowser {
    /// Start browsing for `service_type`.
    pub fn browse(service_type: &str) -> Result<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| Error::Mdns(e.to_string()))?;
        let receiver = daemon
            .browse(service_type)
            .map_err(|e| Error::Mdns(e.to_string()))?;

        debug!("Browsing mDNS for {}", service_type);
        Ok(Self { daemon, receiver })
    }
}

#[async_trait]
impl ServiceBrowser for MdnsBrowser {
    async fn next_announcement(&mut self, wait: Duration) -> Result<Option<Announcement>> {
        let receiver = self.receiver.clone();
        let deadline = std::time::Instant::now() + wait;

        // The receiver is synchronous; keep the blocking wait off the runtime.
        tokio::task::spawn_blocking(move || {
            loop {
                let remaining = deadline.saturating_duration_since(std::time::Instant::now());
                if remaining.is_zero() {
                    return Ok(None);
                }

                let event = match receiver.recv_timeout(remaining) {
                    Ok(event) => event,
                    Err(_) => return Ok(None),
                };

                match event {
                    ServiceEvent::ServiceResolved(info) => {
                        return Ok(Some(Announcement {
                            fullname: info.get_fullname().to_string(),
                            addresses: info.get_addresses().iter().copied().collect(),
                            port: info.get_port(),
                        }));
                    }
                    ServiceEvent::SearchStopped(_) => {
                        return Err(Error::Mdns("search stopped".to_string()));
                    }
                    other => debug!("Ignoring mDNS event {:?}", other),
                }
            }
        })
        .await
        .map_err(|e| Error::Mdns(format!("browse task failed: {}", e)))?
    }
}

impl Drop for MdnsBrowser {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.shutdown() {
            debug!("mDNS daemon shutdown failed: {}", e);
        }
    }
}

/// Wait for the first usable announcement from `browser`.
///
/// Returns its base URL. Announcements without an address are skipped.
pub async fn discover<B>(
    browser: &mut B,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String>
where
    B: ServiceBrowser + ?Sized,
{
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::DiscoveryTimeout(timeout));
        }
        let wait = remaining.min(POLL_INTERVAL);

        let announcement = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = browser.next_announcement(wait) => result?,
        };

        match announcement {
            Some(announcement) => match announcement.url() {
                Some(url) => {
                    info!("Discovered {} at {}", announcement.fullname, url);
                    return Ok(url);
                }
                None => warn!("Skipping {} without address", announcement.fullname),
            },
            None => debug!("No bridge yet, {:?} left", remaining.saturating_sub(wait)),
        }
    }
}

/// Locate a Hue bridge on the local network.
pub async fn discover_bridge(timeout: Duration, cancel: &CancellationToken) -> Result<String> {
    info!("Looking for a Hue bridge (up to {:?})", timeout);
    let mut browser = MdnsBrowser::browse(SERVICE_TYPE)?;
    discover(&mut browser, timeout, cancel).await
}
