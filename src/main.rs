//! WiFi Link Supervisor - Main Entry Point

use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wifi_link_supervisor::{
    LinkSupervisor, ServiceError,
    backend::WifiCtrlBackend,
    config::{CliArgs, Settings},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wifi_link_supervisor=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();
    info!(?args, "Starting WiFi link supervisor");

    let settings = match Settings::try_from(args) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    // Create WiFi backend
    let backend =
        Arc::new(WifiCtrlBackend::new(settings.interface.clone(), &settings.ctrl_dir).await?);
    info!("WiFi backend initialized for interface: {}", settings.interface);

    let supervisor = Arc::new(LinkSupervisor::new(
        backend,
        settings.identity.clone(),
        settings.mode.clone(),
        settings.delays,
    ));

    let mut event_task = supervisor.start_connection().await?;

    #[cfg(feature = "systemd")]
    if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        warn!("Failed to notify systemd: {}", e);
    }

    if settings.provision_on_start {
        press_button(&supervisor).await;
    }

    info!("Supervisor started successfully");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut button = signal(SignalKind::user_defined1())?;
    let mut dump = signal(SignalKind::user_defined2())?;
    let mut ticker = tokio::time::interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                supervisor.poll_status().await;
            }
            _ = button.recv() => {
                press_button(&supervisor).await;
            }
            _ = dump.recv() => {
                match serde_json::to_string(&supervisor.snapshot().await) {
                    Ok(json) => info!("Status: {}", json),
                    Err(e) => warn!("Failed to serialize status: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = &mut event_task => {
                error!("Event handler stopped, shutting down");
                break;
            }
        }
    }

    info!(
        "Shutting down in state: {}",
        supervisor.connection_state_label()
    );
    event_task.abort();
    Ok(())
}

/// SIGUSR1 stands in for the physical WPS button
async fn press_button(supervisor: &LinkSupervisor<WifiCtrlBackend>) {
    match supervisor.start_provisioning().await {
        Ok(()) => info!("WPS push-button mode active"),
        Err(ServiceError::OperationInProgress) => {
            warn!("WPS already in progress, ignoring button press")
        }
        Err(e) => error!("Failed to start WPS: {}", e),
    }
}
