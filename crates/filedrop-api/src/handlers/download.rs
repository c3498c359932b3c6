use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};

use filedrop_core::{constants::ARCHIVE_FILE_NAME, AppError};

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/download",
    tag = "files",
    responses(
        (status = 200, description = "ZIP archive of every stored file", body = Vec<u8>, content_type = "application/zip"),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "download_archive"))]
pub async fn download_archive(
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, HttpAppError> {
    let archive = state.archive.build().await?;

    let content_disposition = format!("attachment; filename=\"{}\"", ARCHIVE_FILE_NAME);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, archive.size_bytes)
        .body(Body::from_stream(archive.stream))
        .map_err(|e| HttpAppError(AppError::Internal(format!("Failed to build response: {}", e))))
}
