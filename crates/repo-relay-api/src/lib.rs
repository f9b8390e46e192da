//! # Repo-Relay HTTP Service
//!
//! HTTP server for the webhook ingestion path.
//!
//! This service provides:
//! - GitHub webhook endpoint with optional signature validation
//! - Health check endpoint
//!
//! The handler does the minimum before responding: validate, normalize, and
//! dispatch through the shared engine. GitHub retries on non-2xx, so only
//! genuinely rejectable requests (malformed, unauthenticated) get error
//! statuses; events the service merely has no use for are acknowledged.

pub mod signature;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use repo_relay_core::{normalize_webhook, DispatchEngine};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Dispatch engine shared with the polling path
    pub engine: Arc<DispatchEngine>,

    /// Shared secret for signature validation; `None` disables validation
    pub webhook_secret: Option<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(engine: Arc<DispatchEngine>, webhook_secret: Option<String>) -> Self {
        Self {
            engine,
            webhook_secret,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to bind {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("HTTP server failed: {message}")]
    ServerFailed { message: String },
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webhook/github", post(handle_webhook))
        .route("/health", get(handle_health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).into_inner())
        .with_state(state)
}

/// Start HTTP server, running until the shutdown signal flips to `true`.
pub async fn start_server(
    addr: SocketAddr,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ApiError> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::BindFailed {
            address: addr.to_string(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_signal = async move {
        // A closed channel also means the process is going down
        let _ = shutdown.wait_for(|stop| *stop).await;
        info!("Shutdown signal received, draining in-flight requests");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ApiError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Handle GitHub webhook requests.
///
/// Response contract:
/// - 400 when the event-type header is missing or the body is not JSON
/// - 401 when a secret is configured and the signature does not verify
/// - 200 otherwise, including `ping` events and event kinds the service
///   does not render (acknowledged so GitHub stops retrying)
#[instrument(skip(state, headers, body))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    let Some(event_type) = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    else {
        warn!(delivery_id, "Webhook request without X-GitHub-Event header");
        return (StatusCode::BAD_REQUEST, "Missing X-GitHub-Event header");
    };

    if let Some(secret) = &state.webhook_secret {
        let provided = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !signature::verify_signature(secret, &body, provided) {
            warn!(event_type, "Webhook signature verification failed");
            return (StatusCode::UNAUTHORIZED, "Invalid signature");
        }
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(event_type, %error, "Webhook body is not valid JSON");
            return (StatusCode::BAD_REQUEST, "Invalid JSON payload");
        }
    };

    if event_type == "ping" {
        info!("Webhook ping received");
        return (StatusCode::OK, "pong");
    }

    let Some(event) = normalize_webhook(event_type, payload) else {
        // Unsupported kind or no routable repository; acknowledged either way
        return (StatusCode::OK, "OK");
    };

    match state.engine.handle_immediate(&event).await {
        Ok(summary) => {
            info!(
                event_type,
                delivery_id,
                repo = %event.repository_url,
                delivered = summary.delivered,
                filtered = summary.filtered,
                failed = summary.failed,
                "Webhook dispatched"
            );
            (StatusCode::OK, "OK")
        }
        Err(error) => {
            error!(event_type, %error, "Webhook dispatch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

/// Handle health check requests
async fn handle_health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
