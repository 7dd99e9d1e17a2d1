//! Upload → model → artifact orchestration.

use crate::services::artifacts::ArtifactStore;
use crate::services::error_classifier::{retry_after_seconds, FailureCategory};
use crate::services::providers::{ImageInput, ImageProvider};
use anyhow::Context;
use image::ImageFormat;
use metrics::counter;
use secrecy::Secret;
use service_core::error::AppError;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Instruction sent with the reference image (first) and the upload (second).
pub const COMPOSITE_PROMPT: &str = "Using the first image of the cow generate a new image where Instead of the \
cow's head, use the zoomed head of the person from the second picture, adjust the person's head pose \
and face just like the cow from the first image, also include the glasses, keep the red background \
style, dont inlcude the person's photo below the neck so only the head and neck is seen in the image \
where the person is posing with the head upwards and the pov of the photo captures the person from a \
sideview exactly like the cow, then change the colour and style of the person's face like the cow's, \
the final output image should be in 1:1 ratio";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Please upload an image first")]
    MissingUpload,

    #[error("{message}")]
    Failed {
        category: FailureCategory,
        message: String,
        /// Upstream retry hint in seconds, quota failures only.
        retry_after: Option<u64>,
    },
}

impl GenerationError {
    fn classified(raw: &str) -> Self {
        let category = FailureCategory::classify(raw);
        let retry_after = match category {
            FailureCategory::QuotaExceeded => retry_after_seconds(raw),
            _ => None,
        };
        GenerationError::Failed {
            category,
            message: category.user_message(raw),
            retry_after,
        }
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::MissingUpload => {
                AppError::BadRequest(anyhow::anyhow!("Please upload an image first"))
            }
            GenerationError::Failed {
                category,
                message,
                retry_after,
            } => match category {
                FailureCategory::QuotaExceeded => AppError::TooManyRequests(message, retry_after),
                FailureCategory::Authentication => {
                    AppError::Unauthorized(anyhow::anyhow!(message))
                }
                FailureCategory::ServiceUnavailable => AppError::ServiceUnavailable(message),
                FailureCategory::PermissionDenied => AppError::Forbidden(anyhow::anyhow!(message)),
                FailureCategory::Other => AppError::BadGateway(message),
            },
        }
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub path: PathBuf,
    pub file_name: String,
    /// Any text the model returned next to the image.
    pub model_text: Vec<String>,
}

pub struct ImageGenerator {
    provider: Arc<dyn ImageProvider>,
    artifacts: Arc<ArtifactStore>,
    reference_image: PathBuf,
    default_credential: Option<Secret<String>>,
    prompt: String,
}

impl ImageGenerator {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        artifacts: Arc<ArtifactStore>,
        reference_image: impl Into<PathBuf>,
        default_credential: Option<Secret<String>>,
    ) -> Self {
        Self {
            provider,
            artifacts,
            reference_image: reference_image.into(),
            default_credential,
            prompt: COMPOSITE_PROMPT.to_string(),
        }
    }

    /// Composite the current upload onto the reference image.
    ///
    /// `user_credential` overrides the process-wide default key when it is
    /// present and not blank.
    pub async fn generate(
        &self,
        user_credential: Option<String>,
    ) -> Result<GenerationOutcome, GenerationError> {
        if !self.artifacts.has_upload().await {
            return Err(GenerationError::MissingUpload);
        }

        let credential = match user_credential
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
        {
            Some(key) => {
                tracing::info!("Using user-provided API key");
                Secret::new(key)
            }
            None => match &self.default_credential {
                Some(key) => {
                    tracing::info!("Using default API key");
                    key.clone()
                }
                None => {
                    tracing::error!("No API key supplied and no default credential configured");
                    counter!("image_generations_total", "outcome" => "authentication")
                        .increment(1);
                    return Err(GenerationError::classified(
                        "authentication: no API key configured",
                    ));
                }
            },
        };

        match self.run(&credential).await {
            Ok(outcome) => {
                counter!("image_generations_total", "outcome" => "success").increment(1);
                tracing::info!(
                    path = %outcome.path.display(),
                    provider = self.provider.name(),
                    "Generated image saved"
                );
                Ok(outcome)
            }
            Err(e) => {
                let raw = format!("{:#}", e);
                tracing::error!(error = %raw, provider = self.provider.name(), "Image generation failed");
                let err = GenerationError::classified(&raw);
                if let GenerationError::Failed { category, .. } = &err {
                    counter!("image_generations_total", "outcome" => category.as_str())
                        .increment(1);
                }
                Err(err)
            }
        }
    }

    async fn run(&self, credential: &Secret<String>) -> anyhow::Result<GenerationOutcome> {
        let reference = tokio::fs::read(&self.reference_image)
            .await
            .with_context(|| {
                format!(
                    "Failed to read reference image {}",
                    self.reference_image.display()
                )
            })?;
        let upload = self
            .artifacts
            .read_upload()
            .await
            .context("Failed to read uploaded image")?;

        let (reference_png, upload_png) = tokio::task::spawn_blocking(move || {
            let reference = encode_png(&reference).context("Failed to decode reference image")?;
            let upload = encode_png(&upload).context("Failed to decode uploaded image")?;
            Ok::<_, anyhow::Error>((reference, upload))
        })
        .await
        .context("Image encoding task failed")??;

        let images = [ImageInput::png(reference_png), ImageInput::png(upload_png)];
        let generated = self
            .provider
            .generate(credential, &self.prompt, &images)
            .await?;

        let model_text = generated.text;
        let data = generated.data;
        let png = tokio::task::spawn_blocking(move || encode_png(&data))
            .await
            .context("Image encoding task failed")?
            .context("Failed to decode generated image")?;

        let path = self
            .artifacts
            .write_generated(&png)
            .await
            .context("Failed to save generated image")?;

        Ok(GenerationOutcome {
            path,
            file_name: self.artifacts.generated_file_name().to_string(),
            model_text,
        })
    }
}

/// Decode any supported image format and re-encode it as PNG.
pub fn encode_png(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let mut buffer = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)?;
    Ok(buffer)
}
