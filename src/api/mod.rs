//! REST API server module
//!
//! Query-parameter driven GET surface over the job pipeline, plus health and
//! documentation endpoints.

use crate::error::{Error, Result};
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Media jobs
/// - `GET /video` - Fetch one video (mp4 attachment)
/// - `GET /audio` - Fetch one audio track (mp3 attachment)
/// - `GET /playlist` - Fetch a playlist (zip attachment)
/// - `GET /download` - Classify by URL shape and dispatch
/// - `GET /process` - Fetch one video, deliver a resized copy
///
/// ## System
/// - `GET /health` - Health check with uptime
/// - `GET /` - JSON documentation of endpoints
/// - `GET /openapi.json` - OpenAPI specification
pub fn create_router(state: AppState) -> Router {
    let cors_enabled = state.config.server.cors_enabled;

    let router = Router::new()
        // Media jobs
        .route("/video", get(routes::video))
        .route("/audio", get(routes::audio))
        .route("/playlist", get(routes::playlist))
        .route("/download", get(routes::download))
        .route("/process", get(routes::process))
        // System
        .route("/health", get(routes::health_check))
        .route("/", get(routes::index))
        .route("/openapi.json", get(routes::openapi_spec))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Start the API server on the configured bind address
///
/// Sweeps stale workspaces left by a prior run, binds the listener, and
/// serves until the process is shut down.
pub async fn start_api_server(state: AppState) -> Result<()> {
    let bind_address = state.config.server.bind_address;

    // Clear leftovers from a crashed prior run before accepting jobs
    state.workspaces.sweep_stale();

    let workspaces = Arc::clone(&state.workspaces);
    let app = create_router(state);

    let listener = TcpListener::bind(bind_address).await.map_err(Error::Io)?;
    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(workspaces))
        .await
        .map_err(|e| Error::ApiServer(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

/// Wait for a termination signal, then release all active workspaces
///
/// - **Unix:** listens for SIGTERM and SIGINT, with a ctrl_c fallback if
///   signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
async fn shutdown_signal(workspaces: Arc<crate::workspace::WorkspaceManager>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                None
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGINT handler");
                None
            }
        };

        match (sigterm.as_mut(), sigint.as_mut()) {
            (Some(term), Some(int)) => {
                tokio::select! {
                    _ = term.recv() => tracing::info!("received SIGTERM"),
                    _ = int.recv() => tracing::info!("received SIGINT"),
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("received Ctrl+C");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received Ctrl+C");
    }

    workspaces.sweep_active();
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
