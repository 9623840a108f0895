use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use peezme_core::WordValidator;
use peezme_server::{AppState, Stores, config::Config, create_routes};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting PeezMe server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Loading words from directory: {}", config.words_directory);
    let dictionary = match WordValidator::new(&config.words_directory) {
        Ok(dictionary) => {
            info!(words = dictionary.len(), "Dictionary loaded");
            Arc::new(dictionary)
        }
        Err(e) => {
            error!(
                "Failed to load words from directory '{}': {:#}",
                config.words_directory, e
            );
            error!("Set WORDS_DIRECTORY to a directory containing .txt word files.");
            std::process::exit(1);
        }
    };

    let stores = match Stores::connect(&config.database_url).await {
        Ok(stores) => stores,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {:#}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::build(&config, stores, dictionary);
    if let Err(e) = state.tickets.restore_pools(chrono::Utc::now()).await {
        warn!("Could not restore matchmaking pools: {:#}", e);
    }
    let routes = create_routes(state.clone());

    // Timeout sweep
    let sweep_state = state.clone();
    let sweep_interval = config.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            match sweep_state.sweep(chrono::Utc::now()).await {
                Ok(report) if !report.is_empty() => info!(?report, "Sweep finished"),
                Ok(_) => {}
                Err(e) => warn!("Sweep failed: {:#}", e),
            }
        }
    });

    let ip = match config.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown((ip, config.port), shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        match (
            unix_signal(SignalKind::interrupt()),
            unix_signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
            }
            _ => {
                warn!("Signal handlers unavailable, falling back to Ctrl+C");
                if signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down gracefully...");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }
}
