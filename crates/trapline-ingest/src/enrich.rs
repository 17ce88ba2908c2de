//! Metadata enrichment: merge extraction results into the canonical record.
//!
//! Order matters and is fixed: vendor quirks first, then the extracted
//! mapping as the base with identity fields overlaid (identity wins), then
//! the normalization fallbacks, then the content hash, then the destination
//! buckets from configuration.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;

use trapline_core::{apply_vendor_quirks, builtin_quirks, ImageRecord, IngestConfig, RecordIdentity};
use trapline_processing::{pixel_hash, HashError};

const EXIF_DATE_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";
const ISO_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DEFAULT_MIME_TYPE: &str = "image/jpeg";
const UNKNOWN_SERIAL: &str = "unknown";

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("No capture timestamp in extracted metadata")]
    MissingTimestamp,

    #[error("Unparseable capture timestamp: {0}")]
    BadTimestamp(String),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Build the canonical record from the extracted mapping.
///
/// The timestamp is mandatory downstream, so a missing or unparseable
/// `DateTimeOriginal` fails the record.
pub async fn enrich(
    identity: RecordIdentity,
    mut extracted: BTreeMap<String, String>,
    guessed_mime: Option<String>,
    local_path: &Path,
    config: &IngestConfig,
) -> Result<ImageRecord, EnrichError> {
    apply_vendor_quirks(&mut extracted, &builtin_quirks());

    let file_type_extension = extracted
        .remove("FileTypeExtension")
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| file_name_extension(&identity.file_name));

    let date_time_original = extracted
        .remove("DateTimeOriginal")
        .ok_or(EnrichError::MissingTimestamp)?;
    let date_time_original = convert_exif_timestamp(&date_time_original)?;

    let mime_type = extracted
        .remove("MIMEType")
        .filter(|m| !m.is_empty())
        .or(guessed_mime)
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

    let serial_number = extracted
        .remove("SerialNumber")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SERIAL.to_string());

    // Identity and canonical fields take precedence over same-named
    // extraction results.
    for shadowed in [
        "SourceBucket",
        "SourceKey",
        "FileName",
        "ContentHash",
        "ArchiveBucket",
        "ProdBucket",
    ] {
        extracted.remove(shadowed);
    }

    let content_hash = pixel_hash(local_path).await?;

    Ok(ImageRecord {
        source_bucket: identity.source_bucket,
        source_key: identity.source_key,
        file_name: identity.file_name,
        content_hash,
        file_type_extension,
        date_time_original,
        mime_type,
        serial_number,
        archive_bucket: config.archive_bucket.clone(),
        prod_bucket: config.serving_bucket.clone(),
        extra: extracted,
    })
}

/// Lowercased extension parsed from a file name, without the dot.
fn file_name_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Camera timestamp text (`2021:06:01 04:30:00`) to ISO-8601.
fn convert_exif_timestamp(raw: &str) -> Result<String, EnrichError> {
    let parsed = NaiveDateTime::parse_from_str(raw, EXIF_DATE_TIME_FORMAT)
        .map_err(|_| EnrichError::BadTimestamp(raw.to_string()))?;
    Ok(parsed.format(ISO_DATE_TIME_FORMAT).to_string())
}
