use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use common::StorageError;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Stream a stored blob (article and block images, avatars).
///
/// Paths are the opaque values persisted on the owning rows, e.g.
/// `content_blocks/<uuid>.jpg`. The blob store rejects traversal attempts.
#[utoipa::path(
    get,
    path = "/storage/{path}",
    tag = "Public",
    operation_id = "serveBlob",
    summary = "Serve a stored image",
    params(("path" = String, Path, description = "Blob path, e.g. content_blocks/<uuid>.jpg")),
    responses(
        (status = 200, description = "Blob content"),
        (status = 404, description = "Blob not found"),
    ),
)]
#[instrument(skip(state))]
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let reader = state.blob_store.open(&path).await.map_err(|e| match e {
        StorageError::NotFound(_) | StorageError::InvalidPath(_) => {
            AppError::NotFound("File not found".into())
        }
        other => AppError::from(other),
    })?;

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
