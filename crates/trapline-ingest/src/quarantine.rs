//! Dead-letter handling for records the catalog rejected, and for records
//! that failed before registration (see DESIGN.md).

use trapline_storage::{BlobStore, StorageResult};

use crate::registrar::CatalogError;

/// Sub-directory used when no error carries a recognizable code.
pub const UNKNOWN_ERROR_DIR: &str = "UNKNOWN_ERROR";

/// Dead-letter destination: the first coded error selects the sub-directory,
/// and the object keeps its original file name.
pub fn dead_letter_key(errors: &[CatalogError], file_name: &str) -> String {
    let code = errors
        .iter()
        .find_map(|e| e.code.as_deref())
        .unwrap_or(UNKNOWN_ERROR_DIR);
    format!("{}/{}", code, file_name)
}

/// Copy the staging object into the dead-letter bucket. Terminal and
/// non-retried; content type is preserved.
pub async fn quarantine(
    store: &dyn BlobStore,
    src_bucket: &str,
    src_key: &str,
    file_name: &str,
    content_type: &str,
    errors: &[CatalogError],
    dead_letter_bucket: &str,
) -> StorageResult<String> {
    let key = dead_letter_key(errors, file_name);

    tracing::warn!(
        bucket = %dead_letter_bucket,
        key = %key,
        src_bucket = %src_bucket,
        src_key = %src_key,
        error_count = errors.len(),
        "Transferring record to dead letter"
    );

    store
        .copy(src_bucket, src_key, dead_letter_bucket, &key, content_type)
        .await?;

    Ok(key)
}
