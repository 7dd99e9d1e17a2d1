use crate::config::Settings;
use crate::handlers::{
    app::{health_check, index},
    artifacts::{download_artifact, serve_artifact},
    cleanup::cleanup_handler,
    generate::generate_handler,
    metrics::metrics,
    upload::upload_handler,
};
use crate::services::providers::ImageProvider;
use crate::services::{ArtifactStore, ImageGenerator};
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

pub fn build_router(state: AppState) -> Router {
    // Session setup (flash messages only)
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false) // Set to true in production with HTTPS
        .with_expiry(Expiry::OnInactivity(Duration::hours(24)));

    let max_upload_bytes = state.settings.server.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/upload", post(upload_handler))
        .route("/generate", post(generate_handler))
        .route("/artifacts/:filename", get(serve_artifact))
        .route("/download/:filename", get(download_artifact))
        .route("/cleanup", post(cleanup_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri().path(),
                    version = ?request.version(),
                )
            }),
        )
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Wire the store, generator and router together from settings.
pub async fn build_state(
    settings: Settings,
    provider: Arc<dyn ImageProvider>,
) -> Result<AppState, AppError> {
    let reference_image = settings.storage.reference_image.clone();
    if !tokio::fs::try_exists(&reference_image).await.unwrap_or(false) {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "Reference image not found at {}",
            reference_image.display()
        )));
    }

    let artifacts = Arc::new(
        ArtifactStore::new(
            &settings.storage.artifacts_dir,
            settings.storage.uploaded_file_name.clone(),
            settings.storage.generated_file_name.clone(),
        )
        .await
        .map_err(|e| {
            tracing::error!(
                "Failed to initialize artifacts directory at {}: {}",
                settings.storage.artifacts_dir.display(),
                e
            );
            e
        })?,
    );

    let generator = Arc::new(ImageGenerator::new(
        provider,
        artifacts.clone(),
        reference_image,
        settings.gemini.default_credential(),
    ));

    if settings.gemini.default_credential().is_none() {
        tracing::warn!("No default Gemini API key configured; callers must supply their own");
    }

    Ok(AppState::new(Arc::new(settings), artifacts, generator))
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(
        settings: Settings,
        provider: Arc<dyn ImageProvider>,
    ) -> Result<Self, AppError> {
        let address = format!("{}:{}", settings.server.host, settings.server.port);
        let state = build_state(settings, provider).await?;
        let app = build_router(state);

        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let local_addr: SocketAddr = listener.local_addr()?;

        tracing::info!("Listening on {}", local_addr);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port: local_addr.port(),
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
