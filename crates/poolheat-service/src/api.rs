//! HTTP endpoints.
//!
//! - `GET /metrics` - Prometheus text exposition of the last successful poll
//! - `GET /api/health` - Liveness and poll status
//!
//! # Metrics
//!
//! | Metric | Labels | Meaning |
//! |--------|--------|---------|
//! | `poolheat_incoming_celsius` | `id` | Incoming water temperature |
//! | `poolheat_outgoing_celsius` | `id` | Outgoing water temperature |
//! | `poolheat_target_celsius` | `id` | Target water temperature |
//! | `poolheat_heatpump_on` | `id` | Heat pump switched on (1/0) |
//! | `poolheat_pump_running` | `name` | Pool pump switch on (1/0) |
//! | `poolheat_last_poll_timestamp_seconds` | | Completion time of the last successful poll |
//! | `poolheat_poll_failures_total` | | Failed poll cycles since start |
//!
//! The five device gauges are absent until the first poll succeeds. `id` is
//! the AquaTemp device code.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    routing::get,
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::state::{AppState, Published};

/// Content type of the Prometheus text format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Create the router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Completion time of the last successful poll.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_poll: Option<OffsetDateTime>,
    /// Failed poll cycles since start.
    pub poll_failures: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let last_poll = state.latest().await.map(|p| p.polled_at);
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        last_poll,
        poll_failures: state.poll_failures(),
    })
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let latest = state.latest().await;
    let body = render(latest.as_deref(), state.poll_failures());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        body,
    )
}

/// Render the exposition body.
pub fn render(latest: Option<&Published>, poll_failures: u64) -> String {
    let mut out = String::with_capacity(1024);

    if let Some(p) = latest {
        let id = escape_label_value(&p.telemetry.device_code);
        let snapshot = &p.telemetry.snapshot;

        gauge(
            &mut out,
            "poolheat_incoming_celsius",
            "Incoming water temperature in degrees Celsius",
            &format!("id=\"{}\"", id),
            snapshot.incoming,
        );
        gauge(
            &mut out,
            "poolheat_outgoing_celsius",
            "Outgoing water temperature in degrees Celsius",
            &format!("id=\"{}\"", id),
            snapshot.outgoing,
        );
        gauge(
            &mut out,
            "poolheat_target_celsius",
            "Target water temperature in degrees Celsius",
            &format!("id=\"{}\"", id),
            snapshot.target,
        );
        gauge(
            &mut out,
            "poolheat_heatpump_on",
            "Whether the heat pump is switched on",
            &format!("id=\"{}\"", id),
            flag(snapshot.on),
        );
        gauge(
            &mut out,
            "poolheat_pump_running",
            "Whether the pool pump switch is on",
            &format!("name=\"{}\"", escape_label_value(&p.pump_name)),
            flag(p.pump_running),
        );
        gauge(
            &mut out,
            "poolheat_last_poll_timestamp_seconds",
            "Unix time of the last successful poll",
            "",
            p.polled_at.unix_timestamp() as f64,
        );
    }

    let _ = writeln!(
        out,
        "# HELP poolheat_poll_failures_total Failed poll cycles since start"
    );
    let _ = writeln!(out, "# TYPE poolheat_poll_failures_total counter");
    let _ = writeln!(out, "poolheat_poll_failures_total {}", poll_failures);

    out
}

fn gauge(out: &mut String, name: &str, help: &str, labels: &str, value: f64) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} gauge", name);
    if labels.is_empty() {
        let _ = writeln!(out, "{} {}", name, value);
    } else {
        let _ = writeln!(out, "{}{{{}}} {}", name, labels, value);
    }
}

fn flag(on: bool) -> f64 {
    if on { 1.0 } else { 0.0 }
}

/// Escape special characters in Prometheus label values.
fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
