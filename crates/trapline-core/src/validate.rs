//! Inbound file-name classification.

use std::path::Path;

const IMAGE_FILE_TYPES: [&str; 2] = ["jpg", "png"];
const BATCH_FILE_TYPES: [&str; 1] = ["zip"];

/// How a staged object should be handled, decided from its file name alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestKind {
    /// Runs the full image pipeline.
    Image,
    /// Redirected to the asynchronous batch queue.
    Batch,
    /// Rejected; only cleanup runs.
    Unsupported,
}

/// Classify a file name by its extension, case-insensitively.
pub fn classify(file_name: &str) -> IngestKind {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if IMAGE_FILE_TYPES.contains(&ext.as_str()) {
        IngestKind::Image
    } else if BATCH_FILE_TYPES.contains(&ext.as_str()) {
        IngestKind::Batch
    } else {
        IngestKind::Unsupported
    }
}

/// Basename of an object key with the extension lowercased.
///
/// `cam1/IMG_0001.JPG` becomes `IMG_0001.jpg`; the stem keeps its case.
pub fn normalize_file_name(key: &str) -> String {
    let base = key.rsplit('/').next().unwrap_or(key);
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            format!("{}.{}", stem, ext.to_lowercase())
        }
        _ => base.to_string(),
    }
}
