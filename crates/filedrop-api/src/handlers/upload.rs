//! Batch upload over multipart.

use std::io::{self, SeekFrom};
use std::sync::Arc;

use axum::{
    extract::{multipart::Field, Multipart, State},
    Json,
};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use filedrop_core::{AppError, BatchResult};
use filedrop_services::IncomingFile;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Per-file outcome of the batch", body = BatchResult),
        (status = 400, description = "Too many files or malformed multipart body", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_files"))]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BatchResult>, HttpAppError> {
    let max_file_size = state.config.max_file_size_bytes();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        // Plain form fields carry no filename; an empty one counts as none
        let Some(file_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            continue;
        };
        state.ingest.check_batch_size(files.len() + 1)?;
        files.push(spool_part(field, file_name, max_file_size).await?);
    }

    tracing::debug!(batch_size = files.len(), "Multipart body read");
    let result = state.ingest.ingest(files).await?;
    Ok(Json(result))
}

/// Copy one part into an anonymous temp file.
///
/// A part that outgrows `max_file_size` is drained without being kept; its
/// declared size is the byte count seen so the validator rejects it.
async fn spool_part(
    mut field: Field<'_>,
    file_name: String,
    max_file_size: u64,
) -> Result<IncomingFile, HttpAppError> {
    let spool = tempfile::tempfile().map_err(spool_error)?;
    let mut spool = Some(tokio::fs::File::from_std(spool));
    let mut received: u64 = 0;

    while let Some(chunk) = field.chunk().await? {
        received += chunk.len() as u64;
        if received > max_file_size {
            spool = None;
            continue;
        }
        if let Some(file) = spool.as_mut() {
            file.write_all(&chunk).await.map_err(spool_error)?;
        }
    }

    let Some(mut file) = spool else {
        tracing::debug!(file_name = %file_name, size_bytes = received, "Oversized part drained");
        return Ok(IncomingFile::new(
            file_name,
            received,
            Box::new(tokio::io::empty()),
        ));
    };

    file.flush().await.map_err(spool_error)?;
    file.seek(SeekFrom::Start(0)).await.map_err(spool_error)?;

    Ok(IncomingFile::new(file_name, received, Box::new(file)))
}

fn spool_error(e: io::Error) -> AppError {
    AppError::Internal(format!("Failed to spool upload: {}", e))
}
