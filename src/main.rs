mod command;
mod config;
mod panel;
mod settings;
mod transport;

use anyhow::Result;
use clap::Parser;
use command::{ChannelRegistry, RateLimitedDispatcher};
use panel::PanelContext;
use ptz_shared::throttle;
use settings::{JsonFileBackend, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use transport::{command_queue, HttpConfig, HttpTransport};

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Remote-control panel for pan-tilt-zoom cameras.
///
/// Reads widget events (joystick, sliders, toggles) line by line and turns
/// them into rate-limited requests to the camera backend.
#[derive(Parser, Debug)]
#[command(name = "ptz-panel", version, about)]
struct Cli {
    /// Path to the config file; created with defaults if missing.
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, env = "PTZ_PANEL_CONFIG")]
    config: PathBuf,

    /// Path to the sensitivity settings file. Settings are not kept across
    /// restarts when omitted.
    #[arg(long, env = "PTZ_PANEL_SETTINGS")]
    settings: Option<PathBuf>,

    /// Minimum spacing between two commands on one axis, in milliseconds.
    #[arg(long, default_value_t = throttle::DISPATCH_INTERVAL_MS)]
    interval_ms: u64,

    /// Also read panel events from stdin.
    #[arg(long)]
    stdin: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = config::load(&cli.config);

    info!("PTZ panel starting");
    info!("  Panel port: {}", config.server_port);
    info!("  Backend: {}:{}", config.backend_server, config.backend_port);

    let settings = Arc::new(match &cli.settings {
        Some(path) => SettingsStore::open(JsonFileBackend::new(path)).await,
        None => SettingsStore::in_memory(),
    });

    // Outbound queue drained by the HTTP sender
    let (outbox, outbound_rx) = command_queue();
    let http = HttpTransport::new(HttpConfig::new(
        config.backend_server.clone(),
        config.backend_port,
    ));
    let sender = tokio::spawn(transport::run_sender(outbound_rx, Arc::new(http)));

    let dispatcher = RateLimitedDispatcher::with_interval(
        ChannelRegistry::camera_defaults(),
        settings.clone(),
        outbox.clone(),
        Duration::from_millis(cli.interval_ms),
    );
    info!("Dispatcher ready ({:?} per axis)", dispatcher.interval());

    let ctx = PanelContext {
        dispatcher: dispatcher.clone(),
        settings,
        outbox,
    };

    if cli.stdin {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            if let Err(e) = panel::run_lines(ctx, stdin, tokio::io::stdout()).await {
                error!("[PANEL] stdin session failed: {}", e);
            }
            info!("[PANEL] stdin closed");
        });
    }

    let listener = TcpListener::bind(("0.0.0.0", config.server_port)).await?;

    tokio::select! {
        result = panel::serve(listener, ctx) => {
            if let Err(e) = result {
                error!("Panel server stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    // Deliver pending trailing values, then give the sender a moment
    dispatcher.shutdown().await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    sender.abort();

    Ok(())
}
