// Integration tests for `HueBridge` using wiremock.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poolheat_core::{Error, HueBridge, Rejection};
use poolheat_store::Store;
use poolheat_types::keys;

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HueBridge, Store) {
    let server = MockServer::start().await;
    let bridge = HueBridge::with_client(&server.uri(), reqwest::Client::new()).unwrap();
    let store = Store::open_in_memory().unwrap();
    (server, bridge, store)
}

fn full_state() -> serde_json::Value {
    json!({
        "lights": {
            "1": {"name": "Kitchen", "state": {"on": true}},
            "4": {"name": "Poolpump", "state": {"on": false}},
            "9": {"name": "Poolpump light", "state": {"on": true}},
        },
        "config": {"name": "Philips hue"},
    })
}

// ── Access ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ensure_access_registers_and_persists() {
    let (server, bridge, store) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .and(body_json(json!({"devicetype": "poolheatmetrics#exporter"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"success": {"username": "ACCESS-1"}}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(bridge.ensure_access(&store).await.unwrap(), "ACCESS-1");
    // Second call is served from the store.
    assert_eq!(bridge.ensure_access(&store).await.unwrap(), "ACCESS-1");
    assert_eq!(
        store.get(keys::BRIDGE_ACCESS_ID).unwrap(),
        Some(b"ACCESS-1".to_vec())
    );
}

#[tokio::test]
async fn test_ensure_access_link_button_not_pressed() {
    let (server, bridge, store) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "error": {"type": 101, "address": "", "description": "link button not pressed"}
        }])))
        .mount(&server)
        .await;

    let err = bridge.ensure_access(&store).await.unwrap_err();

    assert!(matches!(err, Error::AccessNotGranted(ref msg) if msg == "link button not pressed"));
    assert!(!store.contains(keys::BRIDGE_ACCESS_ID).unwrap());
}

#[tokio::test]
async fn test_ensure_access_http_failure() {
    let (server, bridge, store) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = bridge.ensure_access(&store).await.unwrap_err();
    assert!(matches!(err, Error::AccessNotGranted(_)));
    assert!(!store.contains(keys::BRIDGE_ACCESS_ID).unwrap());
}

// ── Pump lookup ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_resolve_pump_device_exact_name() {
    let (server, bridge, _store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ACCESS-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_state()))
        .mount(&server)
        .await;

    let id = bridge
        .resolve_pump_device("ACCESS-1", "Poolpump")
        .await
        .unwrap();
    assert_eq!(id, "4");
}

#[tokio::test]
async fn test_resolve_pump_device_missing() {
    let (server, bridge, _store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ACCESS-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(full_state()))
        .mount(&server)
        .await;

    let err = bridge
        .resolve_pump_device("ACCESS-1", "Garden")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeviceNotFound(ref name) if name == "Garden"));
}

#[tokio::test]
async fn test_resolve_pump_device_unauthorized() {
    let (server, bridge, _store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/REVOKED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "error": {"type": 1, "address": "/", "description": "unauthorized user"}
        }])))
        .mount(&server)
        .await;

    let err = bridge
        .resolve_pump_device("REVOKED", "Poolpump")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AccessNotGranted(_)));
}

// ── State ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_is_on() {
    let (server, bridge, _store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ACCESS-1/lights/4"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "Poolpump", "state": {"on": true, "reachable": true}})),
        )
        .mount(&server)
        .await;

    assert!(bridge.is_on("ACCESS-1", "4").await.unwrap());
}

#[tokio::test]
async fn test_is_on_http_failure() {
    let (server, bridge, _store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ACCESS-1/lights/4"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = bridge.is_on("ACCESS-1", "4").await.unwrap_err();
    assert!(matches!(
        err,
        Error::StatusFetch(Rejection::Status { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_is_on_bridge_error() {
    let (server, bridge, _store) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ACCESS-1/lights/99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "error": {"type": 3, "address": "/lights/99", "description": "resource, /lights/99, not available"}
        }])))
        .mount(&server)
        .await;

    let err = bridge.is_on("ACCESS-1", "99").await.unwrap_err();
    assert!(matches!(
        err,
        Error::StatusFetch(Rejection::Vendor { code: 3, .. })
    ));
}
