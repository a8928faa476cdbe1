use anyhow::{Context, Result};
use std::{io::ErrorKind, net::SocketAddr};
use tokio::{net::TcpListener, signal};

mod config;
mod errors;
mod handlers;
mod logging;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use routes::routes::HttpLimits;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    logging::init_logging(cfg.log_format);
    tracing::info!("Starting user-media-api with config: {:?}", cfg);

    // --- Wire stores and services (creates media root and spool) ---
    let state = state::AppState::from_config(&cfg)
        .await
        .with_context(|| {
            format!(
                "preparing media dir {} and spool dir {}",
                cfg.media_dir.display(),
                cfg.spool_dir.display()
            )
        })?;
    tracing::info!(
        media_dir = %state.media.root().display(),
        spool_dir = %state.spool.dir().display(),
        seeded = cfg.seed_demo_users,
        "Storage ready"
    );

    // --- Build router ---
    let app = routes::routes::routes(
        state,
        HttpLimits {
            request_timeout: cfg.request_timeout,
            max_request_bytes: cfg.max_request_bytes,
        },
    );

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err).with_context(|| format!("binding {addr}")),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received termination signal, shutting down");
}
