use dotenvy::dotenv;
use holycow_frontend::config::get_configuration;
use holycow_frontend::services::providers::gemini::{GeminiConfig, GeminiImageProvider};
use holycow_frontend::services::providers::ImageProvider;
use holycow_frontend::startup::Application;
use service_core::observability::{init_metrics, init_tracing};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "holycow-frontend",
        &configuration.server.log_level,
        configuration.server.otlp_endpoint.as_deref(),
    );

    if let Err(e) = init_metrics() {
        tracing::warn!("Failed to install Prometheus recorder: {}", e);
    }

    let provider: Arc<dyn ImageProvider> = Arc::new(
        GeminiImageProvider::new(GeminiConfig {
            base_url: configuration.gemini.base_url.clone(),
            model: configuration.gemini.model.clone(),
            timeout: Duration::from_secs(configuration.gemini.timeout_seconds),
        })
        .map_err(|e| anyhow::anyhow!("Failed to initialize Gemini provider: {}", e))?,
    );

    info!(
        model = %configuration.gemini.model,
        "Initialized Gemini image provider"
    );

    let application = Application::build(configuration, provider)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start holycow-frontend: {}", e))?;

    info!("Starting holycow-frontend on port {}", application.port());
    application.run_until_stopped().await.map_err(|e| {
        tracing::error!("Server error: {}", e);
        anyhow::anyhow!("Server error: {}", e)
    })?;

    info!("Service shutdown complete");
    Ok(())
}
