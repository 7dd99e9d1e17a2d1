pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use config::Settings;
use services::{ArtifactStore, ImageGenerator};
use std::sync::Arc;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub artifacts: Arc<ArtifactStore>,
    pub generator: Arc<ImageGenerator>,
}

impl AppState {
    pub fn new(
        settings: Arc<Settings>,
        artifacts: Arc<ArtifactStore>,
        generator: Arc<ImageGenerator>,
    ) -> Self {
        Self {
            settings,
            artifacts,
            generator,
        }
    }
}
