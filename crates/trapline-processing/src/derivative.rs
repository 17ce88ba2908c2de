//! Derivative generation: locally resized copies of the original.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use trapline_core::SizeVariant;

#[derive(Debug, Error)]
pub enum DeriveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Resize task aborted: {0}")]
    TaskAborted(String),
}

/// Produce one resized file per dimensioned variant.
///
/// The source is decoded once; each variant is bounded by its max dimensions
/// on the longest edge, preserving aspect ratio. Output files land in
/// `scratch` named `{hash}-{variant}.{ext}`, the same basename the serving
/// key uses. Variants without dimensions (the original class) are skipped
/// here; the distributor copies them by reference.
pub async fn generate_derivatives(
    source: &Path,
    scratch: &Path,
    variants: &[SizeVariant],
    content_hash: &str,
    extension: &str,
) -> Result<BTreeMap<String, PathBuf>, DeriveError> {
    let data = tokio::fs::read(source).await?;
    let scratch = scratch.to_path_buf();
    let hash = content_hash.to_string();
    let ext = extension.to_string();
    let variants: Vec<SizeVariant> = variants
        .iter()
        .filter(|v| v.max_dims.is_some())
        .cloned()
        .collect();

    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&data)?;
        let mut outputs = BTreeMap::new();

        for variant in variants {
            let Some((max_w, max_h)) = variant.max_dims else {
                continue;
            };
            let resized = img.thumbnail(max_w, max_h);
            let path = scratch.join(format!("{}-{}.{}", hash, variant.name, ext));
            resized.save(&path)?;

            tracing::debug!(
                variant = %variant.name,
                width = resized.width(),
                height = resized.height(),
                path = %path.display(),
                "Generated derivative"
            );
            outputs.insert(variant.name, path);
        }

        Ok(outputs)
    })
    .await
    .map_err(|e| DeriveError::TaskAborted(e.to_string()))?
}
