//! Staging download into the invocation scratch directory.

use std::path::{Path, PathBuf};

use trapline_storage::{BlobStore, StorageResult};
use uuid::Uuid;

/// Materialize `bucket/key` at a collision-free local path under `scratch`.
pub async fn fetch_to_scratch(
    store: &dyn BlobStore,
    bucket: &str,
    key: &str,
    scratch: &Path,
) -> StorageResult<PathBuf> {
    let data = store.get(bucket, key).await?;
    let path = scratch.join(scratch_file_name(key));
    tokio::fs::write(&path, &data).await?;

    tracing::info!(
        bucket = %bucket,
        key = %key,
        path = %path.display(),
        size_bytes = data.len(),
        "Fetched staging object"
    );

    Ok(path)
}

/// A random prefix avoids collisions; separators and spaces are stripped from
/// the key to form a safe suffix that still ends with the real extension.
fn scratch_file_name(key: &str) -> String {
    let suffix = key.replace('/', "").replace(' ', "_");
    format!("{}{}", Uuid::new_v4(), suffix)
}
