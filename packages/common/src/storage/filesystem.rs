use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::traits::{BlobStore, BoxReader};

/// Filesystem-backed blob store.
///
/// Blobs live under `{root}/{namespace}/{uuid-v4}[.ext]`. Writes go through
/// a temp file in `{root}/.tmp` and are renamed into place, so a crashed
/// write never leaves a partial blob at a servable path.
pub struct FilesystemBlobStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store rooted at `root`.
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self { root, max_size })
    }

    /// Resolve a stored path to its absolute filesystem location.
    fn blob_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_blob_path(path)?;
        Ok(self.root.join(path))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root.join(".tmp").join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn store(
        &self,
        data: &[u8],
        namespace: &str,
        ext: Option<&str>,
    ) -> Result<String, StorageError> {
        validate_namespace(namespace)?;
        if let Some(ext) = ext {
            validate_extension(ext)?;
        }

        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let name = match ext {
            Some(ext) => format!("{}.{ext}", uuid::Uuid::new_v4()),
            None => uuid::Uuid::new_v4().to_string(),
        };
        let rel_path = format!("{namespace}/{name}");
        let abs_path = self.root.join(&rel_path);

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &abs_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(rel_path)
    }

    async fn open(&self, path: &str) -> Result<BoxReader, StorageError> {
        let abs_path = self.blob_path(path)?;
        match fs::File::open(&abs_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let abs_path = self.blob_path(path)?;
        Ok(fs::try_exists(&abs_path).await?)
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let abs_path = self.blob_path(path)?;
        match fs::remove_file(&abs_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Validate a namespace: a single sane path segment.
fn validate_namespace(namespace: &str) -> Result<(), StorageError> {
    if namespace.is_empty() || namespace.len() > 64 {
        return Err(StorageError::InvalidPath(
            "namespace must be 1-64 characters".into(),
        ));
    }
    if !namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(StorageError::InvalidPath(format!(
            "invalid namespace '{namespace}'"
        )));
    }
    Ok(())
}

/// Validate a file extension appended to generated names.
fn validate_extension(ext: &str) -> Result<(), StorageError> {
    if ext.is_empty() || ext.len() > 16 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StorageError::InvalidPath(format!(
            "invalid extension '{ext}'"
        )));
    }
    Ok(())
}

/// Validate a stored blob path before touching the filesystem.
///
/// Paths are always `namespace/name` as produced by `store`; anything with
/// traversal components, absolute roots, or hidden segments is rejected.
fn validate_blob_path(path: &str) -> Result<(), StorageError> {
    if path.is_empty() || path.len() > 512 {
        return Err(StorageError::InvalidPath(
            "path must be 1-512 characters".into(),
        ));
    }
    if path.contains('\0') || path.contains('\\') {
        return Err(StorageError::InvalidPath(
            "path must not contain null bytes or backslashes".into(),
        ));
    }
    if path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(StorageError::InvalidPath(
            "path must be a relative segment sequence".into(),
        ));
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment == ".." || segment.starts_with('.') {
            return Err(StorageError::InvalidPath(format!(
                "invalid path segment in '{path}'"
            )));
        }
    }
    Ok(())
}
