//! Storage-upload notification payload and per-record events.

use percent_encoding::percent_decode_str;
use serde::Deserialize;

/// One upload notification: the staging location of a newly arrived object.
///
/// The key is stored URL-decoded. Immutable once parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestEvent {
    pub bucket: String,
    pub key: String,
}

/// The storage service's notification document: a batch of records, each
/// carrying a bucket name and a percent-encoded object key.
#[derive(Debug, Deserialize)]
pub struct Notification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

impl Notification {
    /// Parse a notification JSON document into per-record events, decoding
    /// each object key.
    pub fn parse(payload: &str) -> Result<Vec<IngestEvent>, serde_json::Error> {
        let notification: Notification = serde_json::from_str(payload)?;
        Ok(notification
            .records
            .into_iter()
            .map(|r| IngestEvent {
                bucket: r.s3.bucket.name,
                key: decode_object_key(&r.s3.object.key),
            })
            .collect())
    }
}

/// Decode a notification object key: `+` means space, then percent-decode.
///
/// Notification keys are form-encoded, not plain percent-encoded.
pub fn decode_object_key(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or(plus_decoded)
}
