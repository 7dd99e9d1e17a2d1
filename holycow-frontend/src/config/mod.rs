use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const CRATE_DIR: &str = "holycow-frontend";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub gemini: GeminiSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound for request bodies, which caps upload size.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// OTLP/gRPC collector. Spans are only exported when set.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

#[derive(Deserialize, Clone, Debug)]
pub struct StorageSettings {
    /// Directory holding the upload and generated slots.
    pub artifacts_dir: PathBuf,
    /// Bundled image every upload is composited against.
    pub reference_image: PathBuf,
    #[serde(default = "default_uploaded_file_name")]
    pub uploaded_file_name: String,
    #[serde(default = "default_generated_file_name")]
    pub generated_file_name: String,
}

fn default_uploaded_file_name() -> String {
    "uploaded_image".to_string()
}

fn default_generated_file_name() -> String {
    "generated_image.png".to_string()
}

impl StorageSettings {
    /// Anchor relative paths at `root` so the service behaves the same whether it
    /// is started from the workspace or from the crate directory.
    pub fn resolve_relative_to(&mut self, root: &Path) {
        if self.artifacts_dir.is_relative() {
            self.artifacts_dir = root.join(&self.artifacts_dir);
        }
        if self.reference_image.is_relative() {
            self.reference_image = root.join(&self.reference_image);
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Process-wide default credential (`GEMINI_API_KEY`).
    #[serde(default)]
    pub api_key: Option<Secret<String>>,
    /// Used when the primary key is unset (`FALLBACK_GEMINI_API_KEY`).
    #[serde(default)]
    pub fallback_api_key: Option<Secret<String>>,
}

fn default_timeout_seconds() -> u64 {
    120
}

impl GeminiSettings {
    /// The key used when a caller does not supply their own.
    pub fn default_credential(&self) -> Option<Secret<String>> {
        [&self.api_key, &self.fallback_api_key]
            .into_iter()
            .flatten()
            .find(|key| !key.expose_secret().trim().is_empty())
            .cloned()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;

    // Check if we're already in the crate directory or need to navigate to it
    let crate_root = if base_path.ends_with(CRATE_DIR) {
        base_path
    } else {
        base_path.join(CRATE_DIR)
    };
    let configuration_directory = crate_root.join("config");

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("gemini.api_key", non_empty_env("GEMINI_API_KEY"))?
        .set_override_option(
            "gemini.fallback_api_key",
            non_empty_env("FALLBACK_GEMINI_API_KEY"),
        )?
        .build()?;

    let mut settings = settings.try_deserialize::<Settings>()?;
    settings.storage.resolve_relative_to(&crate_root);
    Ok(settings)
}
