use service_core::error::AppError;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

/// Extensions accepted for uploads (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// The on-disk slots for the current upload and the current generated image.
///
/// There is exactly one upload slot and one output slot for the whole process.
/// They are not keyed by user or session, so concurrent users overwrite each
/// other's files (last writer wins) and cleanup by one user removes another's.
pub struct ArtifactStore {
    base_path: PathBuf,
    uploaded_file_name: String,
    generated_file_name: String,
}

impl ArtifactStore {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        uploaded_file_name: impl Into<String>,
        generated_file_name: impl Into<String>,
    ) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self {
            base_path,
            uploaded_file_name: uploaded_file_name.into(),
            generated_file_name: generated_file_name.into(),
        })
    }

    pub fn uploaded_file_name(&self) -> &str {
        &self.uploaded_file_name
    }

    pub fn generated_file_name(&self) -> &str {
        &self.generated_file_name
    }

    pub fn uploaded_path(&self) -> PathBuf {
        self.base_path.join(&self.uploaded_file_name)
    }

    pub fn generated_path(&self) -> PathBuf {
        self.base_path.join(&self.generated_file_name)
    }

    pub async fn has_upload(&self) -> bool {
        fs::try_exists(self.uploaded_path()).await.unwrap_or(false)
    }

    /// Overwrite the upload slot.
    pub async fn save_upload(&self, data: &[u8]) -> Result<(), AppError> {
        fs::write(self.uploaded_path(), data).await?;
        Ok(())
    }

    pub async fn read_upload(&self) -> Result<Vec<u8>, AppError> {
        Ok(fs::read(self.uploaded_path()).await?)
    }

    /// Overwrite the output slot, returning its path.
    pub async fn write_generated(&self, data: &[u8]) -> Result<PathBuf, AppError> {
        let path = self.generated_path();
        fs::write(&path, data).await?;
        Ok(path)
    }

    /// Read a file from the artifacts directory by bare file name.
    pub async fn read(&self, file_name: &str) -> Result<Vec<u8>, AppError> {
        if !is_safe_file_name(file_name) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid file name: {}",
                file_name
            )));
        }

        match fs::read(self.base_path.join(file_name)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::NotFound(
                anyhow::anyhow!("File not found: {}", file_name),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete both slots. Missing files are skipped; other failures are logged
    /// and otherwise ignored. Returns the names that were actually removed.
    pub async fn cleanup(&self) -> Vec<String> {
        let mut removed = Vec::new();
        for name in [&self.uploaded_file_name, &self.generated_file_name] {
            match fs::remove_file(self.base_path.join(name)).await {
                Ok(()) => {
                    tracing::info!(file = %name, "Removed artifact");
                    removed.push(name.clone());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Failed to remove artifact");
                }
            }
        }
        removed
    }
}

/// A bare file name: no separators, no parent references, not hidden.
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}

/// Whether an uploaded file name carries one of [`ALLOWED_EXTENSIONS`].
pub fn has_allowed_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Content type from the bytes when they are a recognised image, otherwise from
/// the file extension.
pub fn content_type_for(file_name: &str, data: &[u8]) -> String {
    image::guess_format(data)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| {
            mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn store() -> (ArtifactStore, PathBuf) {
        let dir = PathBuf::from(format!("target/test-artifacts-{}", Uuid::new_v4()));
        let store = ArtifactStore::new(&dir, "uploaded_image", "generated_image.png")
            .await
            .unwrap();
        (store, dir)
    }

    #[test]
    fn extension_whitelist_is_case_insensitive() {
        assert!(has_allowed_extension("me.PNG"));
        assert!(has_allowed_extension("me.jpeg"));
        assert!(has_allowed_extension("archive.tar.bmp"));
        assert!(!has_allowed_extension("me.webp"));
        assert!(!has_allowed_extension("notes.txt"));
        assert!(!has_allowed_extension("png"));
    }

    #[test]
    fn rejects_unsafe_file_names() {
        assert!(is_safe_file_name("generated_image.png"));
        assert!(!is_safe_file_name(""));
        assert!(!is_safe_file_name("../secret"));
        assert!(!is_safe_file_name("a/b.png"));
        assert!(!is_safe_file_name("a\\b.png"));
        assert!(!is_safe_file_name(".env"));
    }

    #[test]
    fn content_type_prefers_sniffed_bytes() {
        let png_magic = b"\x89PNG\r\n\x1a\n\0\0\0\0";
        assert_eq!(content_type_for("uploaded_image", png_magic), "image/png");
        assert_eq!(content_type_for("notes.txt", b"hello"), "text/plain");
        assert_eq!(
            content_type_for("uploaded_image", b"hello"),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let (store, dir) = store().await;
        store.save_upload(b"up").await.unwrap();
        store.write_generated(b"gen").await.unwrap();

        let removed = store.cleanup().await;
        assert_eq!(removed, vec!["uploaded_image", "generated_image.png"]);
        assert!(!store.has_upload().await);

        assert!(store.cleanup().await.is_empty());

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn read_maps_missing_and_unsafe_names() {
        let (store, dir) = store().await;

        assert!(matches!(
            store.read("generated_image.png").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.read("../Cargo.toml").await,
            Err(AppError::BadRequest(_))
        ));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
