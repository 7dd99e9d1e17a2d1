use crate::handlers::app::IndexTemplate;
use crate::models::{response_mode::has_json_body, FlashLevel, FlashMessage, Flashes, ResponseMode};
use crate::services::GenerationError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;

/// Body of `POST /generate`. Accepted as a urlencoded form or JSON; an empty
/// body means "use the default key".
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, alias = "user_api_key")]
    pub api_key: Option<String>,
}

impl GenerateRequest {
    pub fn parse(headers: &HeaderMap, body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        if has_json_body(headers) {
            serde_json::from_slice(body).map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e))
            })
        } else {
            serde_urlencoded::from_bytes(body).map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Invalid form body: {}", e))
            })
        }
    }
}

fn body_rejection(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("Request body too large"))
    } else {
        AppError::BadRequest(anyhow::anyhow!(
            "Failed to read request body: {}",
            rejection.body_text()
        ))
    }
}

pub async fn generate_handler(
    State(state): State<AppState>,
    mode: ResponseMode,
    flashes: Flashes,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let request = match body
        .map_err(body_rejection)
        .and_then(|body| GenerateRequest::parse(&headers, &body))
    {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "Rejected generate request body");
            if mode.is_json() {
                return err.into_response();
            }
            flashes.error("Invalid generate request").await;
            return Redirect::to("/").into_response();
        }
    };

    match state.generator.generate(request.api_key).await {
        Ok(outcome) => {
            if mode.is_json() {
                return Json(json!({
                    "status": "success",
                    "message": "Image generated successfully!",
                    "image_url": format!("/artifacts/{}", outcome.file_name),
                    "download_url": format!("/download/{}", outcome.file_name),
                    "model_text": outcome.model_text,
                }))
                .into_response();
            }

            let mut messages = flashes.take().await;
            messages.push(FlashMessage {
                level: FlashLevel::Success,
                text: "Image generated successfully!".to_string(),
            });
            IndexTemplate::new(&state, messages, true, true).into_response()
        }
        Err(GenerationError::MissingUpload) => {
            tracing::warn!("Generate requested before any upload");
            if mode.is_json() {
                return AppError::from(GenerationError::MissingUpload).into_response();
            }
            flashes.error(GenerationError::MissingUpload.to_string()).await;
            Redirect::to("/").into_response()
        }
        Err(err) => {
            if mode.is_json() {
                return AppError::from(err).into_response();
            }

            let mut messages = flashes.take().await;
            messages.push(FlashMessage {
                level: FlashLevel::Error,
                text: format!("Error generating image: {}", err),
            });
            IndexTemplate::new(&state, messages, true, false).into_response()
        }
    }
}
