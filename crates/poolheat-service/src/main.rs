//! poolheatmetrics - heat pump and pool pump exporter.
//!
//! Run with: `cargo run -p poolheat-service`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use poolheat_service::{AppState, Config, Poller, api, logging, poller};
use poolheat_store::Store;

/// Pool heat pump metrics exporter.
#[derive(Parser, Debug)]
#[command(name = "poolheatmetrics")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long, global = true)]
    bind: Option<String>,

    /// Database path (overrides config).
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the exporter in the foreground (default behavior).
    Run,

    /// Register with the Hue bridge and look up the pump switch, then exit.
    ///
    /// Press the bridge's link button right before running this.
    Pair,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(db_path) = args.database {
        config.storage.path = db_path;
    }

    config.validate()?;

    let _logging = logging::init(&config.logging)?;

    let result = match args.command {
        Some(Command::Pair) => pair(&config).await,
        Some(Command::Run) | None => run_exporter(&config).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

async fn run_exporter(config: &Config) -> anyhow::Result<()> {
    let store = Store::open(&config.storage.path).context("failed to open credential store")?;
    let state = AppState::new();

    let app = Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    let addr: SocketAddr = config.server.bind.parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Serving metrics on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server stopped: {}", e);
        }
    });

    let cancel = CancellationToken::new();
    let poller = Poller::init(config, store, state, &cancel).await?;
    poller.run(cancel).await?;

    Ok(())
}

async fn pair(config: &Config) -> anyhow::Result<()> {
    let store = Store::open(&config.storage.path).context("failed to open credential store")?;
    let cancel = CancellationToken::new();

    let bridge = poller::locate_bridge(&config.hue, &cancel).await?;
    let access_id = bridge.ensure_access(&store).await?;
    let device_id = bridge
        .resolve_pump_device(&access_id, &config.hue.pump_name)
        .await?;

    println!("Bridge:      {}", bridge.base_url());
    println!("Pump switch: '{}' (device {})", config.hue.pump_name, device_id);
    println!(
        "Pump state:  {}",
        if bridge.is_on(&access_id, &device_id).await? {
            "on"
        } else {
            "off"
        }
    );
    Ok(())
}
