use anyhow::Context;
use dotenvy::dotenv;
use registrar::logging::{init_tracing, shutdown_tracer};
use registrar::metrics::{init_metrics, metrics_app};
use registrar::router::init_router;
use registrar::state::init_app_state;
use registrar_config::ServerConfig;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing()?;

    let server_config = ServerConfig::from_env();
    let state = init_app_state().await?;

    if let Some(handle) = init_metrics() {
        let metrics_addr = format!("0.0.0.0:{}", server_config.metrics_port);
        let listener = tokio::net::TcpListener::bind(&metrics_addr)
            .await
            .with_context(|| format!("Failed to bind metrics listener on {metrics_addr}"))?;
        info!("Metrics available at http://{}/metrics", metrics_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                error!(error = %e, "Metrics server stopped");
            }
        });
    }

    let app = init_router(state);
    let listener = tokio::net::TcpListener::bind(&server_config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", server_config.addr))?;

    info!("Server running on http://{}", server_config.addr);
    info!("Swagger UI available at http://{}/swagger-ui", server_config.addr);
    info!("Scalar UI available at http://{}/scalar", server_config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown_tracer().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
