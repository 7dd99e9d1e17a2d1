use crate::services::artifacts::content_type_for;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use service_core::error::AppError;

/// Serve a file from the artifacts directory for inline viewing.
pub async fn serve_artifact(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let data = state.artifacts.read(&file_name).await?;
    let content_type = content_type_for(&file_name, &data);

    tracing::debug!(file_name = %file_name, size = data.len(), "Serving artifact");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        data,
    )
        .into_response())
}

/// Serve a file from the artifacts directory as an attachment.
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, AppError> {
    let data = state.artifacts.read(&file_name).await?;
    let content_type = content_type_for(&file_name, &data);

    tracing::info!(file_name = %file_name, size = data.len(), "Artifact download");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        data,
    )
        .into_response())
}
