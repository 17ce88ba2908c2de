//! Content-addressed identity: a digest over decoded pixel data.
//!
//! Hashing the pixel buffer instead of the file bytes makes re-encodes of
//! identical pixel content collide on purpose: the hash is the sole
//! cross-system identity key, and byte-level re-encodes of the same capture
//! must land on the same destination keys.

use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Hash task aborted: {0}")]
    TaskAborted(String),
}

/// SHA-256 (hex) over the RGBA8 pixel buffer of an encoded image.
pub fn pixel_hash_bytes(data: &[u8]) -> Result<String, HashError> {
    let img = image::load_from_memory(data)?;
    let pixels = img.into_rgba8();
    let digest = Sha256::digest(pixels.as_raw());
    Ok(hex::encode(digest))
}

/// Decode the image at `path` and hash its pixel buffer.
///
/// Decode is CPU-bound; runs off the async pool.
pub async fn pixel_hash(path: &Path) -> Result<String, HashError> {
    let data = tokio::fs::read(path).await?;
    tokio::task::spawn_blocking(move || pixel_hash_bytes(&data))
        .await
        .map_err(|e| HashError::TaskAborted(e.to_string()))?
}
