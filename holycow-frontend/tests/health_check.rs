use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use holycow_frontend::config::{GeminiSettings, ServerSettings, Settings, StorageSettings};
use holycow_frontend::services::providers::mock::{MockBehavior, MockImageProvider};
use holycow_frontend::startup::{build_router, build_state};
use std::path::PathBuf;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

fn settings(root: &PathBuf) -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "debug".to_string(),
            max_upload_bytes: 1024 * 1024,
            otlp_endpoint: None,
        },
        storage: StorageSettings {
            artifacts_dir: root.join("artifacts"),
            reference_image: root.join("reference.png"),
            uploaded_file_name: "uploaded_image".to_string(),
            generated_file_name: "generated_image.png".to_string(),
        },
        gemini: GeminiSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            model: "test-model".to_string(),
            timeout_seconds: 5,
            api_key: None,
            fallback_api_key: None,
        },
    }
}

async fn router() -> (axum::Router, PathBuf) {
    let root = PathBuf::from(format!("target/test-health-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&root).await.unwrap();
    tokio::fs::write(root.join("reference.png"), b"png").await.unwrap();

    let provider = Arc::new(MockImageProvider::new(MockBehavior::NoImage));
    let state = build_state(settings(&root), provider).await.unwrap();
    (build_router(state), root)
}

#[tokio::test]
async fn health_check_works() {
    let (app, root) = router().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");

    tokio::fs::remove_dir_all(root).await.ok();
}

#[tokio::test]
async fn index_renders_upload_form() {
    let (app, root) = router().await;

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("action=\"/upload\""));
    assert!(!page.contains("action=\"/generate\""));

    tokio::fs::remove_dir_all(root).await.ok();
}

#[tokio::test]
async fn missing_reference_image_fails_startup() {
    let root = PathBuf::from(format!("target/test-health-{}", Uuid::new_v4()));
    let provider = Arc::new(MockImageProvider::new(MockBehavior::NoImage));

    let result = build_state(settings(&root), provider).await;

    assert!(result.is_err());
}
