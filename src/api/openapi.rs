//! OpenAPI documentation and schema generation
//!
//! Compile-time OpenAPI spec for the media-dl HTTP surface, generated with
//! utoipa and served at `/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl API",
        version = "0.2.0",
        description = "HTTP gateway for media downloads via an external acquisition tool",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Media jobs
        crate::api::routes::media::video,
        crate::api::routes::media::audio,
        crate::api::routes::media::playlist,
        crate::api::routes::media::download,
        crate::api::routes::media::process,

        // System
        crate::api::routes::system::health_check,
        crate::api::routes::system::index,
        crate::api::routes::system::openapi_spec,
    ),
    components(
        schemas(
            crate::error::ApiError,
            crate::error::ErrorDetail,
        )
    ),
    tags(
        (name = "media", description = "Media download jobs"),
        (name = "system", description = "Health and documentation")
    )
)]
pub struct ApiDoc;
