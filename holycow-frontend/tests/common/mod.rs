#![allow(dead_code)]

use holycow_frontend::config::{GeminiSettings, ServerSettings, Settings, StorageSettings};
use holycow_frontend::services::providers::mock::{MockBehavior, MockImageProvider};
use holycow_frontend::startup::Application;
use image::{ImageBuffer, ImageFormat, Rgb};
use reqwest::multipart;
use secrecy::Secret;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_KEY: &str = "default-test-key";
pub const GENERATED_NAME: &str = "generated_image.png";
pub const UPLOADED_NAME: &str = "uploaded_image";

/// Encode a solid-colour image in the given format.
pub fn image_bytes(format: ImageFormat, colour: [u8; 3]) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(8, 8, Rgb(colour));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .expect("Failed to encode test image");
    buffer
}

pub fn png_bytes() -> Vec<u8> {
    image_bytes(ImageFormat::Png, [200, 24, 32])
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub artifacts_dir: PathBuf,
    pub provider: Arc<MockImageProvider>,
    /// Follows redirects and keeps the session cookie.
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_default_key(Some(DEFAULT_KEY)).await
    }

    pub async fn spawn_with_default_key(default_key: Option<&str>) -> Self {
        let root = PathBuf::from(format!("target/test-artifacts-{}", Uuid::new_v4()));
        let artifacts_dir = root.join("artifacts");
        tokio::fs::create_dir_all(&root)
            .await
            .expect("Failed to create test directory");

        let reference_image = root.join("reference.png");
        tokio::fs::write(&reference_image, image_bytes(ImageFormat::Png, [10, 10, 10]))
            .await
            .expect("Failed to write reference image");

        let settings = Settings {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port for testing
                log_level: "debug".to_string(),
                max_upload_bytes: 1024 * 1024,
                otlp_endpoint: None,
            },
            storage: StorageSettings {
                artifacts_dir: artifacts_dir.clone(),
                reference_image,
                uploaded_file_name: UPLOADED_NAME.to_string(),
                generated_file_name: GENERATED_NAME.to_string(),
            },
            gemini: GeminiSettings {
                base_url: "http://127.0.0.1:1".to_string(),
                model: "test-model".to_string(),
                timeout_seconds: 5,
                api_key: default_key.map(|k| Secret::new(k.to_string())),
                fallback_api_key: None,
            },
        };

        let provider = Arc::new(MockImageProvider::new(MockBehavior::Image(image_bytes(
            ImageFormat::Png,
            [0, 200, 0],
        ))));

        let app = Application::build(settings, provider.clone())
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build HTTP client");

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            artifacts_dir,
            provider,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Client that does not follow redirects, for asserting on 303s.
    pub fn no_redirect_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client")
    }

    pub fn upload_form(file_name: &str, data: Vec<u8>) -> multipart::Form {
        multipart::Form::new().part(
            "file",
            multipart::Part::bytes(data)
                .file_name(file_name.to_string())
                .mime_str("application/octet-stream")
                .unwrap(),
        )
    }

    /// Upload via the JSON API.
    pub async fn upload_json(&self, file_name: &str, data: Vec<u8>) -> reqwest::Response {
        self.client
            .post(self.url("/upload"))
            .header("Accept", "application/json")
            .multipart(Self::upload_form(file_name, data))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Generate via the JSON API.
    pub async fn generate_json(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url("/generate"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.artifacts_dir.join(name)
    }

    pub async fn artifact_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.artifacts_dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }

    /// Remove the test directory.
    pub async fn cleanup(&self) {
        if let Some(root) = self.artifacts_dir.parent() {
            let _ = tokio::fs::remove_dir_all(root).await;
        }
    }
}
