//! Blob storage behind the run workspace.
//!
//! Input and output files live in an object store addressed by string
//! keys; a run downloads what it needs into its workspace and uploads what
//! the engine produced. The local implementation backs development and
//! tests, the S3 implementation production.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

/// Errors from the blob store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blob store error: {0}")]
    Provider(String),
}

/// Key-addressed file storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the blob at `key` into the local file `dest`, creating parent
    /// directories as needed.
    async fn download(&self, key: &str, dest: &Path) -> Result<(), StorageError>;

    /// Store the local file `src` under `key`, replacing any previous
    /// content.
    async fn upload(&self, src: &Path, key: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// Local filesystem store
// ---------------------------------------------------------------------------

/// Blob store rooted at a local directory; keys are relative paths.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn download(&self, key: &str, dest: &Path) -> Result<(), StorageError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(self.root.join(key), dest).await?;
        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<(), StorageError> {
        let target = self.root.join(key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(src, target).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// S3 store
// ---------------------------------------------------------------------------

/// Blob store backed by an S3 bucket.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    /// Build a client from the ambient AWS environment (credentials chain,
    /// region).
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_s3::Client::new(&config),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn download(&self, key: &str, dest: &Path) -> Result<(), StorageError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::Provider(e.to_string()))?;
        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Provider(e.to_string()))?
            .into_bytes();

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    async fn upload(&self, src: &Path, key: &str) -> Result<(), StorageError> {
        let body = ByteStream::from_path(src)
            .await
            .map_err(|e| StorageError::Provider(e.to_string()))?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::Provider(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_store_round_trips_a_file() {
        let root = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(root.path());

        let src = work.path().join("out.particles");
        tokio::fs::write(&src, b"0.1 0.2 0.3").await.unwrap();
        store
            .upload(&src, "projects/1/particles/out.particles")
            .await
            .unwrap();

        let dest = work.path().join("nested/dir/in.particles");
        store
            .download("projects/1/particles/out.particles", &dest)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"0.1 0.2 0.3");
    }

    #[tokio::test]
    async fn local_store_missing_key_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(root.path());

        let result = store
            .download("projects/1/missing.nrrd", &work.path().join("missing.nrrd"))
            .await;
        assert!(result.is_err());
    }
}
