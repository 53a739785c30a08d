mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use state::AppState;
use std::io;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::quote::QuoteEngine;

pub fn build_router(engine: QuoteEngine) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/equipment", get(handlers::equipment))
        .route("/api/quote", post(handlers::quote))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c. Startup and transport failures are I/O
/// errors, separate from quote failures, which are answered per request.
pub async fn start(engine: QuoteEngine, host: &str, port: u16) -> io::Result<()> {
    let app = build_router(engine);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| io::Error::new(e.kind(), format!("cannot bind to {}: {}", addr, e)))?;

    info!("freight quote server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
