//! HTTP server setup and routing

use crate::error::{Error, Result};
use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
}

/// Build the router with all routes attached
pub fn create_router(state: Arc<SharedState>) -> Router {
    let ctx = AppContext { state };

    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))

        // Session lifecycle
        .route(
            "/session",
            get(super::handlers::get_session).post(super::handlers::start_session),
        )
        .route("/session/stop", post(super::handlers::stop_session))

        // Input from the front end
        .route("/permission", post(super::handlers::request_permission))
        .route("/input", post(super::handlers::submit_input))
        .route("/controls", post(super::handlers::submit_control))
        .route("/player/events", post(super::handlers::submit_player_event))

        // SSE event stream
        .route("/events", get(super::sse::event_stream))

        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the HTTP API server until `shutdown` resolves
pub async fn run<F>(state: Arc<SharedState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
