//! Client for the local Hue bridge (API v1).
//!
//! The exporter needs three things from the bridge: a registered access id,
//! the id of the smart plug that switches the pool pump, and that plug's
//! on/off state. Bridges serve a self-signed certificate, so certificate
//! validation is disabled for this client only.

use std::collections::BTreeMap;

use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use poolheat_types::{KeyValueStore, keys};

use crate::aquatemp::normalize_base_url;
use crate::error::{Error, Rejection, Result};

/// mDNS service type announced by Hue bridges.
pub const SERVICE_TYPE: &str = "_hue._tcp.local.";

/// Client description sent when registering with the bridge.
pub const DEVICE_TYPE: &str = "poolheatmetrics#exporter";

/// Client for one Hue bridge.
#[derive(Debug, Clone)]
pub struct HueBridge {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Light {
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: LightState,
}

#[derive(Debug, Default, Deserialize)]
struct LightState {
    #[serde(default)]
    on: bool,
}

#[derive(Debug, Deserialize)]
struct FullState {
    #[serde(default)]
    lights: BTreeMap<String, Light>,
}

/// `error` element of a bridge answer.
#[derive(Debug, Deserialize)]
struct HueError {
    #[serde(rename = "type", default)]
    kind: i64,
    #[serde(default)]
    description: String,
}

impl HueBridge {
    /// Create a client for the bridge at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| Error::invalid_config(format!("failed to build HTTP client: {}", e)))?;
        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Return the stored access id, registering with the bridge if there is none.
    ///
    /// Registration only succeeds within a short window after the bridge's
    /// link button was pressed. Any refusal is reported as
    /// [`Error::AccessNotGranted`] and nothing is stored.
    pub async fn ensure_access<S>(&self, store: &S) -> Result<String>
    where
        S: KeyValueStore + ?Sized,
    {
        if let Some(bytes) = store.get(keys::BRIDGE_ACCESS_ID).map_err(Error::store)? {
            match String::from_utf8(bytes) {
                Ok(id) if !id.is_empty() => {
                    debug!("Using stored bridge access id");
                    return Ok(id);
                }
                _ => warn!("Ignoring unreadable stored bridge access id"),
            }
        }

        info!("Registering with bridge at {}", self.base_url);

        let url = format!("{}/api", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "devicetype": DEVICE_TYPE }))
            .send()
            .await
            .map_err(|e| Error::Transport {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::AccessNotGranted(format!("HTTP {}", status.as_u16())));
        }

        let body = read_json(response, &url).await?;
        if let Some(err) = first_error(&body) {
            return Err(Error::AccessNotGranted(err.description));
        }

        let access_id = body
            .get(0)
            .and_then(|item| item.pointer("/success/username"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::invalid_response("registration answer has no username"))?
            .to_string();

        store
            .set(keys::BRIDGE_ACCESS_ID, access_id.as_bytes())
            .map_err(Error::store)?;

        info!("Bridge access granted");
        Ok(access_id)
    }

    /// Find the id of the device named `name`.
    ///
    /// Names are compared exactly; the first match in id order wins.
    pub async fn resolve_pump_device(&self, access_id: &str, name: &str) -> Result<String> {
        let url = format!("{}/api/{}", self.base_url, access_id);
        let response = self.get(&url).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StatusFetch(Rejection::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let body = read_json(response, &url).await?;
        if let Some(err) = first_error(&body) {
            return Err(Error::AccessNotGranted(err.description));
        }

        let state: FullState = serde_json::from_value(body)
            .map_err(|e| Error::invalid_response(format!("bad bridge state: {}", e)))?;

        let device_id = state
            .lights
            .into_iter()
            .find(|(_, light)| light.name == name)
            .map(|(id, _)| id)
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?;

        info!("Found '{}' as bridge device {}", name, device_id);
        Ok(device_id)
    }

    /// Whether the device is currently switched on.
    pub async fn is_on(&self, access_id: &str, device_id: &str) -> Result<bool> {
        let url = format!("{}/api/{}/lights/{}", self.base_url, access_id, device_id);
        let response = self.get(&url).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StatusFetch(Rejection::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let body = read_json(response, &url).await?;
        if let Some(err) = first_error(&body) {
            return Err(Error::StatusFetch(Rejection::Vendor {
                code: err.kind,
                message: err.description,
            }));
        }

        let light: Light = serde_json::from_value(body)
            .map_err(|e| Error::invalid_response(format!("bad light state: {}", e)))?;

        debug!("Bridge device {} on={}", device_id, light.state.on);
        Ok(light.state.on)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Transport {
                url: url.to_string(),
                source: e,
            })
    }
}

async fn read_json(response: Response, url: &str) -> Result<Value> {
    response.json().await.map_err(|e| Error::Transport {
        url: url.to_string(),
        source: e,
    })
}

/// The bridge reports failures as `[{"error": {...}}]`, usually with HTTP 200.
fn first_error(body: &Value) -> Option<HueError> {
    body.as_array()?
        .iter()
        .find_map(|item| item.get("error"))
        .and_then(|err| serde_json::from_value(err.clone()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error() {
        let body = json!([{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]);
        let err = first_error(&body).unwrap();
        assert_eq!(err.kind, 101);
        assert_eq!(err.description, "link button not pressed");
    }

    #[test]
    fn test_first_error_on_success() {
        assert!(first_error(&json!([{"success": {"username": "abc"}}])).is_none());
        assert!(first_error(&json!({"lights": {}})).is_none());
    }

    #[test]
    fn test_full_state_parsing() {
        let body = json!({
            "lights": {
                "1": {"name": "Hall", "state": {"on": false}},
                "7": {"name": "Poolpump", "state": {"on": true}, "type": "On/Off plug-in unit"}
            },
            "groups": {}
        });
        let state: FullState = serde_json::from_value(body).unwrap();
        assert_eq!(state.lights.len(), 2);
        assert!(state.lights["7"].state.on);
        assert_eq!(state.lights["1"].name, "Hall");
    }

    #[test]
    fn test_bridge_normalizes_url() {
        let bridge = HueBridge::new("http://192.168.1.2/").unwrap();
        assert_eq!(bridge.base_url(), "http://192.168.1.2");
    }

    #[test]
    fn test_bridge_rejects_bare_host() {
        assert!(matches!(
            HueBridge::new("192.168.1.2"),
            Err(Error::InvalidConfig(_))
        ));
    }
}
