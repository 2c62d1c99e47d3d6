//! wrms - collaborative music queue server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wrms_server::api::{self, AppState};
use wrms_server::backend;
use wrms_server::config::{Cli, ServerConfig};
use wrms_server::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(cli).context("Failed to load configuration")?;

    let level = config.log_level.as_str();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("wrms={level},wrms_server={level},wrms_common={level},tower_http={level}").into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting wrms {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("WRMS_GIT_HASH"),
        env!("WRMS_BUILD_TIMESTAMP"),
        env!("WRMS_BUILD_PROFILE"),
    );
    info!("Configuration: {:?}", config);

    let (scheduler, player_commands) = Scheduler::new(config.session_queue_capacity);

    // Local backends scan the music directory, which blocks
    let (player_events_tx, player_events) = mpsc::unbounded_channel();
    let backend_config = config.clone();
    let backends = tokio::task::spawn_blocking(move || {
        backend::from_config(
            &backend_config.backends,
            backend_config.music_dir.as_deref(),
            backend_config.dummy_track_secs,
            player_events_tx,
        )
    })
    .await
    .context("Backend setup task failed")?
    .context("Failed to initialize backends")?;
    let backends = Arc::new(backends);

    let player = tokio::spawn(backend::run_player(
        Arc::clone(&backends),
        player_commands,
        player_events,
        scheduler.clone(),
    ));

    let app = api::create_router(AppState {
        scheduler: scheduler.clone(),
        backends,
        static_dir: config.static_dir.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Observer connections stay open until their queues close, so the
    // scheduler shuts down as soon as the signal arrives
    let shutdown_scheduler = scheduler.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_scheduler.shutdown().await;
        })
        .await
        .context("Server error")?;

    if tokio::time::timeout(Duration::from_secs(5), player).await.is_err() {
        info!("Player task did not stop in time");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
