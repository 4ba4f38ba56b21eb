//! System handlers: health, root documentation, OpenAPI.

use crate::api::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

/// GET /health - Health check with uptime
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = (chrono::Utc::now() - state.started_at).num_seconds();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime,
        "active_jobs": state.workspaces.active_count(),
    }))
}

/// GET / - JSON documentation of endpoints and parameters
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Endpoint documentation")
    )
)]
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "name": "media-dl",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/video": {
                "method": "GET",
                "params": { "url": "required", "quality": "resolution ceiling, default 720" },
                "response": "video/mp4 attachment"
            },
            "/audio": {
                "method": "GET",
                "params": { "url": "required", "quality": "bitrate in kbit/s, default 192" },
                "response": "audio/mpeg attachment"
            },
            "/playlist": {
                "method": "GET",
                "params": {
                    "url": "required",
                    "format": "video|audio, default video",
                    "quality": "resolution or bitrate ceiling"
                },
                "response": "application/zip attachment"
            },
            "/download": {
                "method": "GET",
                "params": {
                    "url": "required",
                    "format": "video|audio, default video",
                    "quality": "resolution or bitrate ceiling"
                },
                "response": "dispatches to /video, /audio or /playlist by URL shape"
            },
            "/process": {
                "method": "GET",
                "params": {
                    "url": "required",
                    "quality": "resolution ceiling for the fetch, default 720",
                    "width": "target width in pixels, default 640"
                },
                "response": "resized video/mp4 attachment"
            },
            "/health": { "method": "GET", "response": "status and uptime" },
            "/openapi.json": { "method": "GET", "response": "OpenAPI specification" }
        }
    }))
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    use crate::api::openapi::ApiDoc;
    use utoipa::OpenApi;

    Json(ApiDoc::openapi())
}
