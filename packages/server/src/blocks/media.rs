use common::BlobStore;

use crate::error::AppError;
use crate::models::shared::ImageUpload;
use crate::utils::filename::validate_image_upload;

/// Blob namespace for content-block images.
pub const BLOCK_IMAGE_NAMESPACE: &str = "content_blocks";
/// Blob namespace for article main images.
pub const NEWS_IMAGE_NAMESPACE: &str = "news";
/// Blob namespace for user avatars.
pub const AVATAR_NAMESPACE: &str = "avatars";

/// Tracks blob writes made during one mutation attempt.
///
/// The blob store cannot join the relational transaction, so every stored
/// path is recorded here; if the surrounding transaction aborts, `cleanup`
/// deletes what this attempt wrote as a compensating action. Deletions of
/// superseded blobs are best-effort and immediate — a later rollback cannot
/// restore them, which matches the store's non-transactional nature.
pub struct BlockMediaLifecycle<'a> {
    store: &'a dyn BlobStore,
    written: Vec<String>,
}

impl<'a> BlockMediaLifecycle<'a> {
    pub fn new(store: &'a dyn BlobStore) -> Self {
        Self {
            store,
            written: Vec::new(),
        }
    }

    /// Validate and store an uploaded image, recording the path for
    /// cleanup-on-failure. `field` names the request field in validation
    /// errors.
    pub async fn store_image(
        &mut self,
        upload: &ImageUpload,
        namespace: &str,
        field: &str,
    ) -> Result<String, AppError> {
        let ext = validate_image_upload(upload.filename.as_deref(), &upload.data)
            .map_err(|msg| AppError::field_validation(field, msg))?;
        let path = self
            .store
            .store(&upload.data, namespace, Some(&ext))
            .await?;
        self.written.push(path.clone());
        Ok(path)
    }

    /// Best-effort deletion of a superseded blob. A `None` path or an absent
    /// blob is a no-op; real failures are logged, never propagated.
    pub async fn delete_image(&self, path: Option<&str>) {
        let Some(path) = path else { return };
        if let Err(e) = self.store.delete(path).await {
            tracing::warn!("Failed to delete blob '{}': {}", path, e);
        }
    }

    /// Paths written during this attempt.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Compensating cleanup after a failed attempt: delete every blob this
    /// attempt wrote. Individual failures are logged and swallowed so they
    /// never mask the original error.
    pub async fn cleanup(self) {
        for path in &self.written {
            match self.store.delete(path).await {
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Cleanup failed to delete blob '{}': {}", path, e);
                }
            }
        }
    }
}
