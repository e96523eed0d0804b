//! HTTP service
//!
//! Exposes the extraction pipeline and the calendar publisher to the chat
//! bot and any other client.

mod error;
mod extract;
mod handlers;
mod state;

pub use error::{ApiError, ErrorBody};
pub use extract::ApiJson;
pub use handlers::{CreatedEvent, ParseEventRequest};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/parse-event", post(handlers::parse_event))
        .route("/create-event", post(handlers::create_event))
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
