use crate::AppState;
use axum::{extract::State, response::Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub status: &'static str,
    pub removed: Vec<String>,
}

/// Delete the upload and generated slots. Never fails; see [`ArtifactStore::cleanup`].
///
/// [`ArtifactStore::cleanup`]: crate::services::ArtifactStore::cleanup
pub async fn cleanup_handler(State(state): State<AppState>) -> Json<CleanupResponse> {
    let removed = state.artifacts.cleanup().await;
    tracing::info!(removed = removed.len(), "Cleanup completed");

    Json(CleanupResponse {
        status: "success",
        removed,
    })
}
