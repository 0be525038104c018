//! HTTP client for the AquaTemp (linked-go) heat-pump cloud.
//!
//! The cloud wraps every answer in an envelope:
//!
//! ```json
//! { "error_code": "0", "error_msg": "Success", "objectResult": ... }
//! ```
//!
//! A request is only successful when the HTTP status is 2xx *and*
//! `error_code` is zero. Session tokens are cached in a [`KeyValueStore`] and
//! trusted until the cloud rejects one.
//!
//! # Example
//!
//! ```no_run
//! use poolheat_core::AquaTempClient;
//! use poolheat_store::Store;
//! use secrecy::SecretString;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open_default()?;
//! let client = AquaTempClient::new(
//!     poolheat_core::aquatemp::DEFAULT_BASE_URL,
//!     "me@example.com",
//!     SecretString::from("secret".to_string()),
//! )?;
//!
//! let credentials = client.login(&store, false).await?;
//! let telemetry = client.fetch_telemetry(&store, &credentials).await?;
//! println!("incoming: {:.1} °C", telemetry.snapshot.incoming);
//! # Ok(())
//! # }
//! ```

use md5::{Digest, Md5};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use poolheat_types::{
    CredentialRecord, DataCode, DeviceTelemetry, KeyValueStore, TelemetrySnapshot, keys,
};

use crate::error::{Error, Rejection, Result};

/// Production AquaTemp endpoint.
pub const DEFAULT_BASE_URL: &str = "https://cloud.linked-go.com:449";

const LOGIN_PATH: &str = "/crmservice/api/app/user/login";
const SHARED_DEVICES_PATH: &str = "/crmservice/api/app/device/getMyAppectDeviceShareDataList";
const DATA_BY_CODE_PATH: &str = "/crmservice/api/app/device/getDataByCode";
const TOKEN_HEADER: &str = "x-token";

/// Client for the AquaTemp cloud API.
#[derive(Debug, Clone)]
pub struct AquaTempClient {
    client: Client,
    base_url: String,
    username: String,
    password: SecretString,
}

/// One entry of a `getDataByCode` answer.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPoint {
    /// Vendor protocol code, e.g. `T02`.
    pub code: String,
    /// Reported value; the cloud sends numbers as strings.
    #[serde(default)]
    pub value: Value,
}

impl DataPoint {
    /// Numeric value of this point, if it parses.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl AquaTempClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. [`DEFAULT_BASE_URL`]
    /// * `username` - account user name
    /// * `password` - account password in clear text; only its MD5 is sent
    pub fn new(base_url: &str, username: &str, password: SecretString) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::invalid_config(format!("failed to build HTTP client: {}", e)))?;
        Self::with_client(base_url, username, password, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(
        base_url: &str,
        username: &str,
        password: SecretString,
        client: Client,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            password,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Obtain a session.
    ///
    /// Without `force`, a cached record is returned as-is and no request is
    /// made. Otherwise the cloud is asked for a fresh token and the new record
    /// replaces the cached one. A rejected login leaves the cache untouched.
    pub async fn login<S>(&self, store: &S, force: bool) -> Result<CredentialRecord>
    where
        S: KeyValueStore + ?Sized,
    {
        if !force && let Some(record) = cached_credentials(store)? {
            debug!("Using cached AquaTemp session for user {}", record.user_id);
            return Ok(record);
        }

        info!("Logging in to AquaTemp as {}", self.username);

        let body = json!({
            "userName": self.username,
            "password": hash_password(self.password.expose_secret()),
        });
        let result = self.call(LOGIN_PATH, None, &body, Error::Auth).await?;

        let token = result
            .get("x-token")
            .and_then(value_to_string)
            .ok_or_else(|| Error::invalid_response("login answer has no x-token"))?;
        let user_id = result
            .get("userId")
            .and_then(value_to_string)
            .ok_or_else(|| Error::invalid_response("login answer has no userId"))?;

        let record = CredentialRecord::new(token, user_id);
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| Error::invalid_response(format!("cannot encode credentials: {}", e)))?;
        store.set(keys::CREDENTIALS, &bytes).map_err(Error::store)?;

        info!("AquaTemp login succeeded for user {}", record.user_id);
        Ok(record)
    }

    /// Resolve the device code of the first heat pump shared with the account.
    ///
    /// The code is cached per user id and survives forced logins.
    pub async fn resolve_device<S>(&self, store: &S, credentials: &CredentialRecord) -> Result<String>
    where
        S: KeyValueStore + ?Sized,
    {
        let key = keys::device(&credentials.user_id);
        if let Some(bytes) = store.get(&key).map_err(Error::store)? {
            match String::from_utf8(bytes) {
                Ok(device) if !device.is_empty() => return Ok(device),
                _ => warn!("Ignoring unreadable cached device code under {}", key),
            }
        }

        debug!("Resolving AquaTemp device for user {}", credentials.user_id);

        let body = json!({ "toUser": credentials.user_id });
        let result = self
            .call(
                SHARED_DEVICES_PATH,
                Some(&credentials.token),
                &body,
                Error::DeviceResolution,
            )
            .await?;

        let device = result
            .get(0)
            .and_then(|d| d.get("deviceCode"))
            .and_then(value_to_string)
            .ok_or(Error::DeviceResolution(Rejection::Missing("shared devices")))?;

        store.set(&key, device.as_bytes()).map_err(Error::store)?;

        info!("Resolved AquaTemp device {}", device);
        Ok(device)
    }

    /// Read the current telemetry of the account's heat pump.
    pub async fn fetch_telemetry<S>(
        &self,
        store: &S,
        credentials: &CredentialRecord,
    ) -> Result<DeviceTelemetry>
    where
        S: KeyValueStore + ?Sized,
    {
        let device_code = self.resolve_device(store, credentials).await?;

        let codes: Vec<&str> = DataCode::ALL.iter().map(|c| c.as_str()).collect();
        let body = json!({
            "deviceCode": device_code,
            "protocalCodes": codes,
        });
        let result = self
            .call(
                DATA_BY_CODE_PATH,
                Some(&credentials.token),
                &body,
                Error::TelemetryFetch,
            )
            .await?;

        let points: Vec<DataPoint> = match result {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other)
                .map_err(|e| Error::invalid_response(format!("bad data points: {}", e)))?,
        };
        let snapshot = parse_data_points(&points);

        debug!(
            "Telemetry for {}: in={} out={} target={} on={}",
            device_code, snapshot.incoming, snapshot.outgoing, snapshot.target, snapshot.on
        );

        Ok(DeviceTelemetry {
            device_code,
            snapshot,
        })
    }

    /// POST `body` to `path` and unwrap the vendor envelope.
    ///
    /// `rejected` builds the error for non-success answers so that each
    /// endpoint reports its own failure kind.
    async fn call(
        &self,
        path: &str,
        token: Option<&str>,
        body: &Value,
        rejected: fn(Rejection) -> Error,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await.map_err(|e| Error::Transport {
            url: url.clone(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("AquaTemp answered {} on {}: {}", status, path, body);
            return Err(rejected(Rejection::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let envelope: Value = response.json().await.map_err(|e| Error::Transport {
            url: url.clone(),
            source: e,
        })?;

        let code = error_code(&envelope).ok_or_else(|| {
            Error::invalid_response(format!("{} answer has no error_code", path))
        })?;
        if code != 0 {
            let message = envelope
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            debug!("AquaTemp rejected {}: {}", path, envelope);
            return Err(rejected(Rejection::Vendor { code, message }));
        }

        Ok(envelope.get("objectResult").cloned().unwrap_or(Value::Null))
    }
}

/// Map data points onto a snapshot.
///
/// Unknown codes and unparseable values are skipped; fields without a point
/// keep their sentinel.
pub fn parse_data_points(points: &[DataPoint]) -> TelemetrySnapshot {
    let mut snapshot = TelemetrySnapshot::default();

    for point in points {
        let Some(code) = DataCode::from_code(&point.code) else {
            debug!("Ignoring unknown AquaTemp code {}", point.code);
            continue;
        };
        match point.as_f64() {
            Some(value) => snapshot.apply(code, value),
            None => warn!("Ignoring non-numeric value {} for {}", point.value, code),
        }
    }

    snapshot
}

/// Lowercase hex MD5 of the password, as the vendor expects.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn cached_credentials<S>(store: &S) -> Result<Option<CredentialRecord>>
where
    S: KeyValueStore + ?Sized,
{
    let Some(bytes) = store.get(keys::CREDENTIALS).map_err(Error::store)? else {
        return Ok(None);
    };

    match serde_json::from_slice(&bytes) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!("Ignoring unreadable cached AquaTemp credentials: {}", e);
            Ok(None)
        }
    }
}

fn error_code(envelope: &Value) -> Option<i64> {
    match envelope.get("error_code")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn normalize_base_url(base_url: &str) -> Result<String> {
    let base_url = base_url.trim_end_matches('/').to_string();

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(Error::invalid_config(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }

    Ok(base_url)
}
