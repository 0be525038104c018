// Integration tests for `AquaTempClient` using wiremock.

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poolheat_core::{AquaTempClient, CredentialRecord, Error, ErrorClass, Rejection};
use poolheat_store::Store;
use poolheat_types::{TelemetrySnapshot, keys};

const LOGIN: &str = "/crmservice/api/app/user/login";
const DEVICES: &str = "/crmservice/api/app/device/getMyAppectDeviceShareDataList";
const DATA: &str = "/crmservice/api/app/device/getDataByCode";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, AquaTempClient, Store) {
    let server = MockServer::start().await;
    let client = AquaTempClient::new(
        &server.uri(),
        "pool@example.com",
        SecretString::from("password".to_string()),
    )
    .unwrap();
    let store = Store::open_in_memory().unwrap();
    (server, client, store)
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "error_code": "0",
        "error_msg": "Success",
        "objectResult": result,
    }))
}

fn vendor_error(code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "error_code": code,
        "error_msg": message,
    }))
}

fn stored_credentials(store: &Store) -> Option<CredentialRecord> {
    store
        .get(keys::CREDENTIALS)
        .unwrap()
        .map(|bytes| serde_json::from_slice(&bytes).unwrap())
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_uses_cache_without_network() {
    let (server, client, store) = setup().await;
    let cached = CredentialRecord::new("T0", "U1");
    store
        .set(keys::CREDENTIALS, &serde_json::to_vec(&cached).unwrap())
        .unwrap();

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ok(json!({"x-token": "T1", "userId": "U1"})))
        .expect(0)
        .mount(&server)
        .await;

    let record = client.login(&store, false).await.unwrap();
    assert_eq!(record, cached);
}

#[tokio::test]
async fn test_login_sends_md5_and_persists() {
    let (server, client, store) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .and(body_json(json!({
            "userName": "pool@example.com",
            "password": "5f4dcc3b5aa765d61d8327deb882cf99",
        })))
        .respond_with(ok(json!({"x-token": "T1", "userId": "U1"})))
        .expect(1)
        .mount(&server)
        .await;

    let record = client.login(&store, false).await.unwrap();

    assert_eq!(record, CredentialRecord::new("T1", "U1"));
    assert_eq!(stored_credentials(&store), Some(record));
}

#[tokio::test]
async fn test_login_vendor_error_leaves_store_untouched() {
    let (server, client, store) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(vendor_error("1", "password error"))
        .mount(&server)
        .await;

    let err = client.login(&store, false).await.unwrap_err();

    match &err {
        Error::Auth(Rejection::Vendor { code, message }) => {
            assert_eq!(*code, 1);
            assert_eq!(message, "password error");
        }
        other => panic!("expected vendor auth error, got {other:?}"),
    }
    assert_eq!(err.class(), ErrorClass::AuthExpired);
    assert!(!store.contains(keys::CREDENTIALS).unwrap());
}

#[tokio::test]
async fn test_login_http_error() {
    let (server, client, store) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.login(&store, true).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Auth(Rejection::Status { status: 503, .. })
    ));
    assert_eq!(err.class(), ErrorClass::Other);
    assert!(!store.contains(keys::CREDENTIALS).unwrap());
}

#[tokio::test]
async fn test_forced_login_replaces_record() {
    let (server, client, store) = setup().await;
    store
        .set(
            keys::CREDENTIALS,
            &serde_json::to_vec(&CredentialRecord::new("OLD", "U1")).unwrap(),
        )
        .unwrap();

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ok(json!({"x-token": "T1", "userId": "U1"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ok(json!({"x-token": "T2", "userId": "U1"})))
        .expect(1)
        .mount(&server)
        .await;

    let first = client.login(&store, true).await.unwrap();
    assert_eq!(first, CredentialRecord::new("T1", "U1"));
    assert_eq!(stored_credentials(&store), Some(first));

    let second = client.login(&store, true).await.unwrap();
    assert_eq!(second, CredentialRecord::new("T2", "U1"));
    assert_eq!(stored_credentials(&store), Some(second.clone()));

    // A cached lookup afterwards stays off the network.
    let cached = client.login(&store, false).await.unwrap();
    assert_eq!(cached, second);
}

#[tokio::test]
async fn test_login_accepts_numeric_fields() {
    let (server, client, store) = setup().await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error_code": 0,
            "objectResult": {"x-token": "T1", "userId": 4711},
        })))
        .mount(&server)
        .await;

    let record = client.login(&store, false).await.unwrap();
    assert_eq!(record.user_id, "4711");
}

#[tokio::test]
async fn test_login_ignores_corrupt_cache() {
    let (server, client, store) = setup().await;
    store.set(keys::CREDENTIALS, b"not json").unwrap();

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ok(json!({"x-token": "T1", "userId": "U1"})))
        .expect(1)
        .mount(&server)
        .await;

    let record = client.login(&store, false).await.unwrap();
    assert_eq!(record.token, "T1");
}

// ── Device resolution ───────────────────────────────────────────────

#[tokio::test]
async fn test_resolve_device_cached_per_user() {
    let (server, client, store) = setup().await;
    let credentials = CredentialRecord::new("T1", "U1");

    Mock::given(method("POST"))
        .and(path(DEVICES))
        .and(header("x-token", "T1"))
        .and(body_json(json!({"toUser": "U1"})))
        .respond_with(ok(json!([{"deviceCode": "DEV-1"}, {"deviceCode": "DEV-2"}])))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(
        client.resolve_device(&store, &credentials).await.unwrap(),
        "DEV-1"
    );
    assert_eq!(
        client.resolve_device(&store, &credentials).await.unwrap(),
        "DEV-1"
    );
    assert_eq!(
        store.get(&keys::device("U1")).unwrap(),
        Some(b"DEV-1".to_vec())
    );
}

#[tokio::test]
async fn test_resolve_device_other_account_resolves_again() {
    let (server, client, store) = setup().await;
    store.set(&keys::device("U1"), b"DEV-1").unwrap();

    Mock::given(method("POST"))
        .and(path(DEVICES))
        .and(body_json(json!({"toUser": "U2"})))
        .respond_with(ok(json!([{"deviceCode": "DEV-9"}])))
        .expect(1)
        .mount(&server)
        .await;

    let device = client
        .resolve_device(&store, &CredentialRecord::new("T2", "U2"))
        .await
        .unwrap();
    assert_eq!(device, "DEV-9");
}

#[tokio::test]
async fn test_resolve_device_empty_list() {
    let (server, client, store) = setup().await;

    Mock::given(method("POST"))
        .and(path(DEVICES))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let err = client
        .resolve_device(&store, &CredentialRecord::new("T1", "U1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::DeviceResolution(Rejection::Missing(_))
    ));
    assert_eq!(err.class(), ErrorClass::Other);
    assert!(!store.contains(&keys::device("U1")).unwrap());
}

// ── Telemetry ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_telemetry() {
    let (server, client, store) = setup().await;
    store.set(&keys::device("U1"), b"DEV-1").unwrap();

    Mock::given(method("POST"))
        .and(path(DATA))
        .and(header("x-token", "T1"))
        .and(body_json(json!({
            "deviceCode": "DEV-1",
            "protocalCodes": ["R02", "T02", "T03", "Power"],
        })))
        .respond_with(ok(json!([
            {"code": "R02", "value": "21.0"},
            {"code": "T02", "value": "18.5"},
            {"code": "T03", "value": "19.0"},
            {"code": "Power", "value": "1.0"},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let telemetry = client
        .fetch_telemetry(&store, &CredentialRecord::new("T1", "U1"))
        .await
        .unwrap();

    assert_eq!(telemetry.device_code, "DEV-1");
    assert_eq!(
        telemetry.snapshot,
        TelemetrySnapshot {
            incoming: 18.5,
            outgoing: 19.0,
            target: 21.0,
            on: true,
        }
    );
}

#[tokio::test]
async fn test_fetch_telemetry_partial_answer() {
    let (server, client, store) = setup().await;
    store.set(&keys::device("U1"), b"DEV-1").unwrap();

    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(ok(json!([{"code": "T02", "value": "18.5"}])))
        .mount(&server)
        .await;

    let telemetry = client
        .fetch_telemetry(&store, &CredentialRecord::new("T1", "U1"))
        .await
        .unwrap();

    assert_eq!(telemetry.snapshot.incoming, 18.5);
    assert_eq!(telemetry.snapshot.outgoing, -1.0);
    assert_eq!(telemetry.snapshot.target, -1.0);
    assert!(!telemetry.snapshot.on);
}

#[tokio::test]
async fn test_fetch_telemetry_rejected_token() {
    let (server, client, store) = setup().await;
    store.set(&keys::device("U1"), b"DEV-1").unwrap();

    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(vendor_error("-100", "token expired"))
        .mount(&server)
        .await;

    let err = client
        .fetch_telemetry(&store, &CredentialRecord::new("STALE", "U1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::TelemetryFetch(Rejection::Vendor { code: -100, .. })
    ));
    assert_eq!(err.class(), ErrorClass::AuthExpired);
}

#[tokio::test]
async fn test_fetch_telemetry_server_error_is_not_auth() {
    let (server, client, store) = setup().await;
    store.set(&keys::device("U1"), b"DEV-1").unwrap();

    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client
        .fetch_telemetry(&store, &CredentialRecord::new("T1", "U1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::TelemetryFetch(Rejection::Status { status: 500, .. })
    ));
    assert_eq!(err.class(), ErrorClass::Other);
}
