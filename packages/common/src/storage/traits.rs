use async_trait::async_trait;
use tokio::io::AsyncRead;

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Path-addressed blob storage for uploaded media.
///
/// Every `store` call generates a fresh unique path, so two concurrent
/// writers can never collide and deleting one owner's blob can never free
/// bytes another owner still references. Writes are durable immediately and
/// do not participate in any relational transaction; callers that need
/// rollback semantics must track returned paths and compensate.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under the given namespace and return the opaque path.
    ///
    /// `ext` is an optional file extension (without the dot) appended to the
    /// generated name so served files keep a meaningful content type.
    async fn store(
        &self,
        data: &[u8],
        namespace: &str,
        ext: Option<&str>,
    ) -> Result<String, StorageError>;

    /// Open a blob for streaming reads.
    async fn open(&self, path: &str) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Delete a blob by path.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}
