//! The canonical image record submitted to the catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identity of a staged object, known before any extraction runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordIdentity {
    pub source_bucket: String,
    pub source_key: String,
    /// Basename of the key with the extension lowercased.
    pub file_name: String,
}

/// The enriched, catalog-ready image document.
///
/// Built exactly once per successfully validated image event and passed by
/// ownership through the pipeline stages. Field keys serialize in the
/// PascalCase form the catalog contract expects; extraction leftovers that
/// have no named field ride along in `extra`. Named fields always win over
/// same-named extraction results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageRecord {
    pub source_bucket: String,
    pub source_key: String,
    pub file_name: String,
    /// Digest over decoded pixel data; the cross-system identity key.
    pub content_hash: String,
    /// Never empty: falls back to the extension parsed from the file name.
    pub file_type_extension: String,
    /// ISO-8601 form of the camera timestamp.
    pub date_time_original: String,
    #[serde(rename = "MIMEType")]
    pub mime_type: String,
    /// String form of the extracted value, else `"unknown"`.
    pub serial_number: String,
    pub archive_bucket: String,
    pub prod_bucket: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// A named serving size. `max_dims == None` marks the original-class variant,
/// which is copied by reference instead of being locally regenerated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SizeVariant {
    pub name: String,
    pub max_dims: Option<(u32, u32)>,
}

impl SizeVariant {
    pub fn original() -> Self {
        Self {
            name: "original".to_string(),
            max_dims: None,
        }
    }

    pub fn bounded(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            max_dims: Some((width, height)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ImageRecord {
        ImageRecord {
            source_bucket: "staging".to_string(),
            source_key: "cam/IMG_0001.jpg".to_string(),
            file_name: "IMG_0001.jpg".to_string(),
            content_hash: "abc123".to_string(),
            file_type_extension: "jpg".to_string(),
            date_time_original: "2021-06-01T04:30:00".to_string(),
            mime_type: "image/jpeg".to_string(),
            serial_number: "SN-77".to_string(),
            archive_bucket: "archive".to_string(),
            prod_bucket: "serving".to_string(),
            extra: BTreeMap::from([("Make".to_string(), "RidgeTec".to_string())]),
        }
    }

    #[test]
    fn serializes_with_catalog_field_names() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["SourceBucket"], "staging");
        assert_eq!(json["FileName"], "IMG_0001.jpg");
        assert_eq!(json["ContentHash"], "abc123");
        assert_eq!(json["MIMEType"], "image/jpeg");
        assert_eq!(json["SerialNumber"], "SN-77");
        // Flattened extras sit beside the named fields.
        assert_eq!(json["Make"], "RidgeTec");
    }

    #[test]
    fn round_trips_through_json() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: ImageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
