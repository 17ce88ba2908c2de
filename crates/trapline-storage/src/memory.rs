//! In-memory blob-store backend.
//!
//! Used as the test double across the workspace; behaves like the S3 backend
//! at the trait boundary, including copy-by-reference between buckets and
//! idempotent deletes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::traits::{BlobStore, StorageError, StorageResult};

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

/// Map-backed blob store. Cloning shares the underlying objects.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<(String, String), StoredObject>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the trait.
    pub async fn seed(&self, bucket: &str, key: &str, data: Bytes, content_type: &str) {
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
    }

    /// All keys currently stored under a bucket, sorted.
    pub async fn keys_in(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Content type recorded for an object, if present.
    pub async fn content_type_of(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        self.seed(bucket, key, data, content_type).await;
        Ok(())
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let mut objects = self.objects.write().await;
        let source = objects
            .get(&(src_bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::CopyFailed(format!(
                "source object missing: {}/{}",
                src_bucket, src_key
            )))?;
        objects.insert(
            (dst_bucket.to_string(), dst_key.to_string()),
            StoredObject {
                data: source.data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self
            .objects
            .read()
            .await
            .contains_key(&(bucket.to_string(), key.to_string())))
    }
}
