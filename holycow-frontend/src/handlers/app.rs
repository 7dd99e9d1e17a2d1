use crate::models::{FlashMessage, Flashes};
use crate::AppState;
use askama::Template;
use axum::{extract::State, response::IntoResponse};
use uuid::Uuid;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub flashes: Vec<FlashMessage>,
    pub uploaded: bool,
    pub generated: bool,
    pub upload_url: String,
    pub image_url: String,
    pub download_url: String,
}

impl IndexTemplate {
    /// Page for the given slot state. Image URLs carry a fresh query string so
    /// browsers do not show a stale copy of an overwritten slot.
    pub fn new(
        state: &AppState,
        flashes: Vec<FlashMessage>,
        uploaded: bool,
        generated: bool,
    ) -> Self {
        let version = Uuid::new_v4().simple().to_string();
        let generated_name = state.artifacts.generated_file_name();
        Self {
            flashes,
            uploaded,
            generated,
            upload_url: format!(
                "/artifacts/{}?v={}",
                state.artifacts.uploaded_file_name(),
                version
            ),
            image_url: format!("/artifacts/{}?v={}", generated_name, version),
            download_url: format!("/download/{}", generated_name),
        }
    }
}

pub async fn index(State(state): State<AppState>, flashes: Flashes) -> impl IntoResponse {
    IndexTemplate::new(&state, flashes.take().await, false, false)
}

pub async fn health_check() -> &'static str {
    "OK"
}
