//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::setup::routes;
use filedrop_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filedrop API",
        version = "0.1.0",
        description = "Batch file upload service: validated, collision-safe storage with background PNG to JPEG conversion, category listing, deletion and ZIP download of everything stored."
    ),
    paths(
        handlers::upload::upload_files,
        handlers::download::download_archive,
        handlers::files::list_files,
        handlers::files::delete_file,
        routes::health::health_check,
        routes::health::readiness_check,
    ),
    components(
        schemas(
            models::BatchResult,
            models::FilesByCategory,
            handlers::files::DeleteFileResponse,
            routes::health::HealthResponse,
            routes::health::ReadinessResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "files", description = "Upload, list, delete and download stored files"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
