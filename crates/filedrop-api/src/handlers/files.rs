use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use filedrop_core::{AppError, FilesByCategory};
use filedrop_storage::StorageError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponse {
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "Stored files grouped by category", body = FilesByCategory),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FilesByCategory>, HttpAppError> {
    let files = state.catalog.list_by_category().await?;
    Ok(Json(files))
}

#[utoipa::path(
    delete,
    path = "/files/{name}",
    tag = "files",
    params(("name" = String, Path, description = "Exact on-disk file name")),
    responses(
        (status = 200, description = "File deleted", body = DeleteFileResponse),
        (status = 400, description = "Invalid file name", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Deletion failed", body = ErrorResponse)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<DeleteFileResponse>, HttpAppError> {
    state.catalog.delete(&name).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidName(_) => HttpAppError::from(e),
        other => HttpAppError(AppError::Storage(format!("Error deleting file: {}", other))),
    })?;

    Ok(Json(DeleteFileResponse {
        message: format!("File {} deleted successfully", name),
    }))
}
