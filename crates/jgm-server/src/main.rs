//! Just Go Market API server.
//!
//! Loads settings, opens the connection pool and serves the axum router with
//! graceful shutdown on SIGTERM/SIGINT. Tables are not created here; run
//! `jgm-migrate` before the first start.

use jgm_server::{app, config, init_tracing, AppState};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// Failures that stop the server before or while serving.
#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Pool(#[from] jgm_db::PoolError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be installed yet if settings failed.
            eprintln!("jgm-server: {e}");
            tracing::error!(error = %e, "server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config_path = config::resolve_process_config_path();

    let settings = config::load_settings(Some(&config_path.path))?;
    init_tracing(&settings.logging);

    tracing::info!(
        source = config_path.source,
        path = %config_path.path,
        environment = %settings.environment,
        db_name = %settings.db_name,
        "resolved startup configuration"
    );

    let pool = jgm_db::create_pool(
        &settings.database_url,
        settings.database.runtime_settings(),
    )?;

    let addr = SocketAddr::new(settings.server.host, settings.server.port);
    let app = app(AppState {
        pool,
        settings: Arc::new(settings),
    });

    tracing::info!(%addr, "starting jgm server");

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("jgm server shut down");
    Ok(())
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
