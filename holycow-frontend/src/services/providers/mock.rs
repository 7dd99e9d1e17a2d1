//! Mock provider implementation for testing.

use super::{GeneratedImage, ImageInput, ImageProvider, ProviderError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::sync::Mutex;

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return these bytes as the generated image.
    Image(Vec<u8>),
    /// Reply with text only.
    NoImage,
    /// Fail with an API error carrying this text.
    Fail(String),
}

/// A call the mock received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub credential: String,
    pub prompt: String,
    pub image_count: usize,
}

/// Mock image provider for testing.
pub struct MockImageProvider {
    behavior: Mutex<MockBehavior>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockImageProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        if let Ok(mut current) = self.behavior.lock() {
            *current = behavior;
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    async fn generate(
        &self,
        credential: &Secret<String>,
        prompt: &str,
        images: &[ImageInput],
    ) -> Result<GeneratedImage, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                credential: credential.expose_secret().clone(),
                prompt: prompt.to_string(),
                image_count: images.len(),
            });
        }

        let behavior = self
            .behavior
            .lock()
            .map(|b| b.clone())
            .map_err(|_| ProviderError::NotConfigured("Mock state poisoned".to_string()))?;

        match behavior {
            MockBehavior::Image(data) => Ok(GeneratedImage {
                mime_type: "image/png".to_string(),
                data,
                text: vec![format!("Mock image for: {}", prompt)],
            }),
            MockBehavior::NoImage => Err(ProviderError::NoImage),
            MockBehavior::Fail(message) => Err(ProviderError::ApiError(message)),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
