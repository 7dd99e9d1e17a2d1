//! Image generation provider abstractions and implementations.
//!
//! The generator talks to a provider through [`ImageProvider`] so the Gemini
//! backend can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use secrecy::Secret;
use thiserror::Error;

/// Error type for provider operations.
///
/// The display text is what the failure classifier matches against, so API
/// errors keep the upstream status code and body in their message.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Content blocked: {0}")]
    ContentBlocked(String),

    #[error("No image data received from the model")]
    NoImage,
}

/// One image sent to the model.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            data,
        }
    }
}

/// First image part of a model reply.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Vec<u8>,
    /// Text parts the model returned alongside the image.
    pub text: Vec<String>,
}

/// Trait for prompt + images → image providers (e.g., Gemini image models).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image from the prompt and the input images, in order.
    async fn generate(
        &self,
        credential: &Secret<String>,
        prompt: &str,
        images: &[ImageInput],
    ) -> Result<GeneratedImage, ProviderError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}
