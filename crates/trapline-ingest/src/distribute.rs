//! Fan-out to the archive and serving destinations.
//!
//! The two destinations are independent best-effort operations reported
//! together; a failed copy never rolls back one that completed. Destination
//! keys are functions of the content hash, so re-ingesting identical pixel
//! content overwrites instead of duplicating.

use std::collections::BTreeMap;
use std::path::PathBuf;

use bytes::Bytes;

use trapline_core::{ImageRecord, SizeVariant};
use trapline_storage::{BlobStore, StorageError};

/// Per-destination outcomes of one fan-out. Values are the destination keys.
#[derive(Debug)]
pub struct DistributionReport {
    pub archive: Result<String, StorageError>,
    pub serving: Vec<(String, Result<String, StorageError>)>,
}

impl DistributionReport {
    pub fn failure_count(&self) -> usize {
        self.serving.iter().filter(|(_, r)| r.is_err()).count()
            + usize::from(self.archive.is_err())
    }

    pub fn is_complete(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Serving key: variant directory, hash-derived basename. Never derived from
/// the original file name.
pub fn serving_key(variant: &str, content_hash: &str, extension: &str) -> String {
    format!("{}/{}-{}.{}", variant, content_hash, variant, extension)
}

/// Archive key: serial-number prefix plus the original basename, suffixed
/// with the hash to preserve provenance without sacrificing uniqueness.
pub fn archive_key(record: &ImageRecord) -> String {
    let (base, ext) = match record.file_name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base, format!(".{}", ext)),
        _ => (record.file_name.as_str(), String::new()),
    };
    format!(
        "{}/{}_{}{}",
        record.serial_number, base, record.content_hash, ext
    )
}

/// Copy the record to both destinations.
///
/// Resized variants upload their local derivative with the record's content
/// type; the original-class variant and the archive copy go by reference
/// from the staging object, so the original bytes are never re-encoded.
pub async fn distribute(
    store: &dyn BlobStore,
    record: &ImageRecord,
    derivatives: &BTreeMap<String, PathBuf>,
    variants: &[SizeVariant],
) -> DistributionReport {
    let mut serving = Vec::with_capacity(variants.len());

    for variant in variants {
        let key = serving_key(&variant.name, &record.content_hash, &record.file_type_extension);
        let result = match variant.max_dims {
            Some(_) => upload_derivative(store, record, derivatives, &variant.name, &key).await,
            None => store
                .copy(
                    &record.source_bucket,
                    &record.source_key,
                    &record.prod_bucket,
                    &key,
                    &record.mime_type,
                )
                .await,
        };

        match &result {
            Ok(()) => tracing::info!(
                bucket = %record.prod_bucket,
                key = %key,
                variant = %variant.name,
                content_hash = %record.content_hash,
                "Transferred serving variant"
            ),
            Err(e) => tracing::error!(
                bucket = %record.prod_bucket,
                key = %key,
                variant = %variant.name,
                error = %e,
                "Serving transfer failed"
            ),
        }

        serving.push((variant.name.clone(), result.map(|_| key)));
    }

    let archive_dst = archive_key(record);
    let archive = store
        .copy(
            &record.source_bucket,
            &record.source_key,
            &record.archive_bucket,
            &archive_dst,
            &record.mime_type,
        )
        .await
        .map(|_| archive_dst.clone());

    match &archive {
        Ok(key) => tracing::info!(
            bucket = %record.archive_bucket,
            key = %key,
            content_hash = %record.content_hash,
            "Transferred archive copy"
        ),
        Err(e) => tracing::error!(
            bucket = %record.archive_bucket,
            key = %archive_dst,
            error = %e,
            "Archive transfer failed"
        ),
    }

    DistributionReport { archive, serving }
}

async fn upload_derivative(
    store: &dyn BlobStore,
    record: &ImageRecord,
    derivatives: &BTreeMap<String, PathBuf>,
    variant: &str,
    key: &str,
) -> Result<(), StorageError> {
    let path = derivatives.get(variant).ok_or_else(|| {
        StorageError::PutFailed(format!("no derivative generated for variant {}", variant))
    })?;
    let data = tokio::fs::read(path).await?;
    store
        .put(&record.prod_bucket, key, Bytes::from(data), &record.mime_type)
        .await
}
