//! HTTP server lifecycle: bind, serve, shut down on Ctrl-C.

use tokio::net::TcpListener;

use crate::api::router::api_router;
use crate::api::types::ApiContext;
use crate::config::Settings;

/// Serve the API until Ctrl-C.
///
/// # Errors
/// Returns the I/O error if the address cannot be bound or the server fails.
pub async fn serve(settings: &Settings, ctx: ApiContext) -> std::io::Result<()> {
    let app = api_router(ctx, &settings.cors_origins);
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
