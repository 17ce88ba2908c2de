//! Blob-store abstraction trait
//!
//! This module defines the BlobStore trait that all storage backends must
//! implement.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Download failed: {0}")]
    GetFailed(String),

    #[error("Upload failed: {0}")]
    PutFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Bucket-addressed blob store.
///
/// All backends must treat `copy` as a by-reference operation: the object
/// bytes are never re-encoded or pulled through the caller.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download an object's bytes.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes>;

    /// Upload bytes to `bucket/key` with an explicit content type.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Server-side copy between locations, setting the content type on the
    /// destination.
    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Check whether an object exists.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;
}
