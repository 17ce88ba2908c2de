//! Embedded-metadata extraction via the external exiftool binary.
//!
//! The extractor is a trait so the pipeline can be exercised against a fake;
//! the production implementation shells out to `exiftool -json` and flattens
//! the namespaced tag names it reports.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to launch extraction tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Extraction tool failed (status {status}): {stderr}")]
    Tool { status: i32, stderr: String },

    #[error("Unparseable extraction output: {0}")]
    Parse(String),
}

/// Injected metadata-extraction capability.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Extract a flat key/value mapping for the file at `path`.
    async fn extract(&self, path: &Path) -> Result<BTreeMap<String, String>, ExtractError>;
}

/// Production extractor backed by the exiftool binary.
pub struct ExifToolExtractor {
    exiftool_path: String,
}

impl ExifToolExtractor {
    pub fn new(exiftool_path: String) -> Self {
        Self { exiftool_path }
    }
}

#[async_trait]
impl MetadataExtractor for ExifToolExtractor {
    async fn extract(&self, path: &Path) -> Result<BTreeMap<String, String>, ExtractError> {
        let output = Command::new(&self.exiftool_path)
            .arg("-json")
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(ExtractError::Tool {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let documents: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::Parse(e.to_string()))?;
        let tags = documents
            .as_array()
            .and_then(|docs| docs.first())
            .and_then(|doc| doc.as_object())
            .ok_or_else(|| {
                ExtractError::Parse("expected a one-element array of tag objects".to_string())
            })?;

        let mut flattened = BTreeMap::new();
        for (key, value) in tags {
            // The local scratch path is meaningless downstream.
            if key == "SourceFile" {
                continue;
            }
            if let Some(text) = stringify_tag_value(value) {
                flattened.insert(flatten_key(key), text);
            }
        }

        tracing::debug!(
            path = %path.display(),
            tag_count = flattened.len(),
            "Extracted metadata"
        );

        Ok(flattened)
    }
}

/// Strip any `namespace:` prefix, keeping the last segment.
fn flatten_key(key: &str) -> String {
    key.rsplit(':').next().unwrap_or(key).to_string()
}

/// String form of a tag value; nulls are dropped.
fn stringify_tag_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_strips_namespace_prefixes() {
        assert_eq!(flatten_key("EXIF:Make"), "Make");
        assert_eq!(flatten_key("File:System:FileName"), "FileName");
        assert_eq!(flatten_key("Make"), "Make");
    }

    #[test]
    fn stringify_covers_scalar_shapes() {
        use serde_json::json;
        assert_eq!(stringify_tag_value(&json!("BuckEyeCam")).unwrap(), "BuckEyeCam");
        assert_eq!(stringify_tag_value(&json!(940)).unwrap(), "940");
        assert_eq!(stringify_tag_value(&json!(1.5)).unwrap(), "1.5");
        assert_eq!(stringify_tag_value(&json!(true)).unwrap(), "true");
        assert_eq!(stringify_tag_value(&json!(null)), None);
        assert_eq!(stringify_tag_value(&json!([1, 2])).unwrap(), "[1,2]");
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let extractor = ExifToolExtractor::new("/definitely/not/exiftool".to_string());
        let err = extractor.extract(Path::new("/tmp/x.jpg")).await.unwrap_err();
        assert!(matches!(err, ExtractError::Spawn(_)));
    }
}
