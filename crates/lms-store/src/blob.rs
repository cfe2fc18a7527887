//! Filesystem blob store for cover images and profile photos.
//!
//! Objects live under a root directory at their blob path, e.g.
//! `{root}/bookCovers/9780141439518.jpg`, and are addressed by `file://` URLs.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use lms_client::{BackendError, BackendResult, BlobStore, ImageUpload};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Blob store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a blob path under the root. Only plain relative components are
    /// allowed, so a path can never escape the root.
    fn resolve(&self, path: &str) -> BackendResult<PathBuf> {
        let relative = Path::new(path);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !plain {
            return Err(BackendError::Storage(format!("invalid blob path: {path}")));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> BackendError {
    BackendError::Storage(format!("{}: {e}", path.display()))
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, upload: &ImageUpload) -> BackendResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        fs::write(&full, &upload.bytes)
            .await
            .map_err(|e| io_error(&full, e))?;
        debug!(
            path,
            bytes = upload.bytes.len(),
            content_type = %upload.content_type,
            "blob stored"
        );
        Ok(())
    }

    async fn download_url(&self, path: &str) -> BackendResult<String> {
        let full = self.resolve(path)?;
        let canonical = fs::canonicalize(&full)
            .await
            .map_err(|e| io_error(&full, e))?;
        Ok(format!("file://{}", canonical.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());

        store
            .put("bookCovers/123.jpg", &ImageUpload::jpeg(vec![0xff, 0xd8]))
            .await
            .unwrap();

        let on_disk = std::fs::read(dir.path().join("bookCovers/123.jpg")).unwrap();
        assert_eq!(on_disk, vec![0xff, 0xd8]);
        let url = store.download_url("bookCovers/123.jpg").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("bookCovers/123.jpg"));
    }

    #[tokio::test]
    async fn test_missing_object_has_no_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.download_url("bookCovers/none.jpg").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs"));
        let upload = ImageUpload::jpeg(vec![1]);
        assert!(store.put("../outside.jpg", &upload).await.is_err());
        assert!(store.put("/etc/passwd", &upload).await.is_err());
        assert!(store.put("", &upload).await.is_err());
        assert!(!dir.path().join("outside.jpg").exists());
    }
}
