//! Object storage for branch images.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

/// Buckets the engine deletes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Original uploads.
    BranchImages,
    /// Resized variants.
    BranchImagesResized,
}

impl Bucket {
    /// Bucket name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::BranchImages => "branch-images",
            Bucket::BranchImagesResized => "branch-images-resized",
        }
    }
}

/// Object storage failures.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    /// The key would escape its bucket.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    /// Underlying I/O failure.
    #[error("I/O error on {key}: {source}")]
    Io {
        /// Offending key.
        key: String,
        /// Cause.
        #[source]
        source: std::io::Error,
    },
}

/// Deletes objects by key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Deletes every key in `bucket`. Missing keys are not an error.
    async fn delete_objects(&self, bucket: Bucket, keys: &[String]) -> Result<(), ObjectStoreError>;
}

/// Object store on the local filesystem: one directory per bucket.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Serves buckets under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Filesystem path of `key` in `bucket`.
    ///
    /// # Errors
    ///
    /// Rejects keys that are not a single plain file name.
    pub fn path_of(&self, bucket: Bucket, key: &str) -> Result<PathBuf, ObjectStoreError> {
        let mut components = Path::new(key).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(bucket.as_str()).join(key)),
            _ => Err(ObjectStoreError::InvalidKey(key.to_string())),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self, keys), fields(bucket = bucket.as_str(), count = keys.len()))]
    async fn delete_objects(&self, bucket: Bucket, keys: &[String]) -> Result<(), ObjectStoreError> {
        for key in keys {
            let path = self.path_of(bucket, key)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(key = %key, "object deleted"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(ObjectStoreError::Io {
                        key: key.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}
