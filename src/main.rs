//! VoiceFit resolver server entry point

use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower::limit::ConcurrencyLimitLayer;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tracing::{error, info, warn};

use voicefit_resolver::handlers::router::{build_protected_routes, build_public_routes};
use voicefit_resolver::{metrics, tracing_setup, ExerciseService, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = tracing_setup::init_logging() {
        eprintln!("logging setup failed: {e}");
    }

    info!("Starting VoiceFit resolver server...");

    let server_config = ServerConfig::from_env();
    server_config.log();

    if let Err(e) = metrics::register_metrics() {
        warn!("metrics registration failed: {}", e);
    }

    info!("Storage path: {:?}", server_config.storage_path);
    let service = Arc::new(ExerciseService::bootstrap(&server_config)?);

    // Keep a reference for shutdown cleanup before moving into the router
    let service_for_shutdown = Arc::clone(&service);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(server_config.rate_limit_per_second)
        .burst_size(server_config.rate_limit_burst)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?;
    let governor_layer = GovernorLayer::new(governor_conf);

    info!(
        "Rate limiting enabled: {} req/sec, burst of {}",
        server_config.rate_limit_per_second, server_config.rate_limit_burst
    );

    let cors = server_config.cors.to_layer();

    // Rate limiting applies only to the protected API routes; health and
    // metrics stay unthrottled for probes and scraping
    let protected_routes = build_protected_routes(service.clone()).layer(governor_layer);
    let public_routes = build_public_routes(service.clone());

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(
            voicefit_resolver::middleware::track_metrics,
        ))
        .layer(ConcurrencyLimitLayer::new(
            server_config.max_concurrent_requests,
        ))
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port).parse()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown signal received, flushing storage...");
    let cleanup = async { service_for_shutdown.flush() };
    match tokio::time::timeout(Duration::from_secs(10), cleanup).await {
        Ok(Ok(())) => info!("Server shutdown complete"),
        Ok(Err(e)) => error!("Flush failed during shutdown: {}", e),
        Err(_) => error!("Graceful shutdown timed out after 10s, forcing exit"),
    }

    Ok(())
}

/// Handle graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install signal handler: {}", e);
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

    info!("Shutdown signal received, starting graceful shutdown");
}
