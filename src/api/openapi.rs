//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "Probe media URLs, download a chosen format in the background, poll progress and fetch the finished file",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::probe,
        crate::api::routes::start_download,
        crate::api::routes::get_progress,
        crate::api::routes::list_tasks,
        crate::api::routes::fetch_file,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::TaskInfo,
        crate::types::FormatInfo,
        crate::types::ProbeResult,
        crate::types::ProbeRequest,
        crate::types::DownloadRequest,
        crate::types::DownloadStarted,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::EngineConfig,
        crate::config::RetentionConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
        crate::error::ExtractionErrorKind,
    )),
    tags(
        (name = "tasks", description = "Download tasks - Probe a URL, start a download, poll progress, fetch the file"),
        (name = "system", description = "System endpoints - Health check and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
