use crate::handlers::app::IndexTemplate;
use crate::models::{FlashLevel, FlashMessage, Flashes, ResponseMode};
use crate::services::artifacts::has_allowed_extension;
use crate::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use metrics::counter;
use serde_json::json;
use service_core::error::AppError;
use thiserror::Error;

const FILE_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file selected")]
    NoFile,

    #[error("Please select a valid image file")]
    InvalidType,

    #[error("File too large")]
    TooLarge,

    #[error("Failed to read upload: {0}")]
    Malformed(String),

    #[error("Failed to save upload")]
    Storage(#[source] AppError),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge
        } else {
            UploadError::Malformed(err.body_text())
        }
    }
}

impl From<MultipartRejection> for UploadError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Request is not a multipart upload");
        UploadError::NoFile
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge => AppError::PayloadTooLarge(anyhow::anyhow!("File too large")),
            UploadError::Storage(inner) => inner,
            other => AppError::BadRequest(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl UploadError {
    fn outcome(&self) -> &'static str {
        match self {
            UploadError::NoFile => "no_file",
            UploadError::InvalidType => "invalid_type",
            UploadError::TooLarge => "too_large",
            UploadError::Malformed(_) => "malformed",
            UploadError::Storage(_) => "storage_error",
        }
    }
}

/// Find the `file` field, check its extension and overwrite the upload slot.
async fn receive_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<String, UploadError> {
    let mut multipart = multipart?;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err(UploadError::NoFile);
        }
        if !has_allowed_extension(&file_name) {
            return Err(UploadError::InvalidType);
        }

        let data = field.bytes().await?;
        state
            .artifacts
            .save_upload(&data)
            .await
            .map_err(UploadError::Storage)?;

        tracing::info!(
            file_name = %file_name,
            size = data.len(),
            "File uploaded successfully"
        );
        return Ok(file_name);
    }

    Err(UploadError::NoFile)
}

pub async fn upload_handler(
    State(state): State<AppState>,
    mode: ResponseMode,
    flashes: Flashes,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match receive_upload(&state, multipart).await {
        Ok(file_name) => {
            counter!("uploads_total", "outcome" => "success").increment(1);

            if mode.is_json() {
                return Json(json!({
                    "status": "success",
                    "message": "File uploaded successfully!",
                    "file_name": file_name,
                    "image_url": format!("/artifacts/{}", state.artifacts.uploaded_file_name()),
                }))
                .into_response();
            }

            let mut messages = flashes.take().await;
            messages.push(FlashMessage {
                level: FlashLevel::Success,
                text: "File uploaded successfully!".to_string(),
            });
            IndexTemplate::new(&state, messages, true, false).into_response()
        }
        Err(err) => {
            counter!("uploads_total", "outcome" => err.outcome()).increment(1);
            match &err {
                UploadError::Storage(inner) => {
                    tracing::error!(error = %inner, "Failed to save upload")
                }
                other => tracing::warn!(error = %other, "Upload rejected"),
            }

            if mode.is_json() {
                return AppError::from(err).into_response();
            }

            flashes.error(err.to_string()).await;
            Redirect::to("/").into_response()
        }
    }
}
