//! Per-record ingestion state machine.
//!
//! Each notification batch runs through one pipeline invocation with one
//! scratch directory. Records are independent: any fatal per-record failure
//! is absorbed here, and the staging object is deleted on every path:
//! success, quarantine, rejection, or error.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

use trapline_core::{
    classify, normalize_file_name, IngestConfig, IngestEvent, IngestKind, RecordIdentity,
};
use trapline_processing::{generate_derivatives, MetadataExtractor};
use trapline_storage::BlobStore;

use crate::distribute::distribute;
use crate::enrich::enrich;
use crate::fetch::fetch_to_scratch;
use crate::quarantine::quarantine;
use crate::queue::BatchQueue;
use crate::registrar::{CatalogClient, CatalogError};

/// Dead-letter code for records whose metadata could not be extracted.
pub const EXTRACTION_FAILED_CODE: &str = "EXTRACTION_FAILED";
/// Dead-letter code for records that failed enrichment.
pub const ENRICHMENT_FAILED_CODE: &str = "ENRICHMENT_FAILED";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Terminal state of one record.
#[derive(Clone, Debug)]
pub enum RecordOutcome {
    /// Registered and fanned out (possibly with reported copy failures).
    Ingested {
        content_hash: String,
        distribution_failures: usize,
    },
    /// Redirected to the batch queue.
    Enqueued,
    /// Unsupported file type; only cleanup ran.
    Rejected,
    /// Copied to the dead-letter bucket.
    Quarantined { dead_letter_key: String },
    /// Fatal failure with no dead-letter copy.
    Failed {
        stage: &'static str,
        message: String,
    },
}

/// Drives notification batches through validation, the image pipeline, the
/// batch redirect, and guaranteed cleanup.
pub struct IngestPipeline {
    store: Arc<dyn BlobStore>,
    extractor: Arc<dyn MetadataExtractor>,
    catalog: Arc<dyn CatalogClient>,
    batch_queue: Arc<dyn BatchQueue>,
    config: IngestConfig,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn BlobStore>,
        extractor: Arc<dyn MetadataExtractor>,
        catalog: Arc<dyn CatalogClient>,
        batch_queue: Arc<dyn BatchQueue>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            catalog,
            batch_queue,
            config,
        }
    }

    /// Process one notification batch.
    ///
    /// The scratch directory lives exactly as long as this call; records are
    /// processed independently and in order, and every staging object is
    /// deleted once regardless of its record's outcome.
    pub async fn process_batch(
        &self,
        events: Vec<IngestEvent>,
    ) -> Result<Vec<RecordOutcome>, anyhow::Error> {
        let scratch = TempDir::new()?;
        let mut outcomes = Vec::with_capacity(events.len());

        for event in &events {
            tracing::info!(
                bucket = %event.bucket,
                key = %event.key,
                "New file detected"
            );

            let outcome = self.process_record(scratch.path(), event).await;

            tracing::info!(
                bucket = %event.bucket,
                key = %event.key,
                outcome = ?outcome,
                "Record finished"
            );

            self.cleanup(event).await;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn process_record(&self, scratch: &Path, event: &IngestEvent) -> RecordOutcome {
        let file_name = normalize_file_name(&event.key);

        match classify(&file_name) {
            IngestKind::Image => {
                let budget = Duration::from_secs(self.config.record_timeout_secs);
                match timeout(budget, self.process_image(scratch, event, &file_name)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::error!(
                            bucket = %event.bucket,
                            key = %event.key,
                            timeout_secs = self.config.record_timeout_secs,
                            stage = "timeout",
                            "Record exceeded its processing budget"
                        );
                        RecordOutcome::Failed {
                            stage: "timeout",
                            message: format!(
                                "record exceeded {}s budget",
                                self.config.record_timeout_secs
                            ),
                        }
                    }
                }
            }
            IngestKind::Batch => self.redirect_batch(event, &file_name).await,
            IngestKind::Unsupported => {
                tracing::info!(
                    bucket = %event.bucket,
                    key = %event.key,
                    file_name = %file_name,
                    stage = "validate",
                    "Unsupported file type"
                );
                RecordOutcome::Rejected
            }
        }
    }

    async fn process_image(
        &self,
        scratch: &Path,
        event: &IngestEvent,
        file_name: &str,
    ) -> RecordOutcome {
        let local_path =
            match fetch_to_scratch(self.store.as_ref(), &event.bucket, &event.key, scratch).await {
                Ok(path) => path,
                Err(e) => {
                    tracing::error!(
                        bucket = %event.bucket,
                        key = %event.key,
                        error = %e,
                        stage = "fetch",
                        "Fetch failed"
                    );
                    return RecordOutcome::Failed {
                        stage: "fetch",
                        message: e.to_string(),
                    };
                }
            };

        let guessed_mime = mime_guess::from_path(&local_path)
            .first()
            .map(|m| m.to_string());

        let extracted = match self.extractor.extract(&local_path).await {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::error!(
                    bucket = %event.bucket,
                    key = %event.key,
                    error = %e,
                    stage = "extract",
                    "Metadata extraction failed"
                );
                let content_type = guessed_mime.as_deref().unwrap_or(FALLBACK_CONTENT_TYPE);
                return self
                    .quarantine_record(
                        event,
                        file_name,
                        content_type,
                        EXTRACTION_FAILED_CODE,
                        &e.to_string(),
                    )
                    .await;
            }
        };

        let identity = RecordIdentity {
            source_bucket: event.bucket.clone(),
            source_key: event.key.clone(),
            file_name: file_name.to_string(),
        };

        let record = match enrich(
            identity,
            extracted,
            guessed_mime.clone(),
            &local_path,
            &self.config,
        )
        .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    bucket = %event.bucket,
                    key = %event.key,
                    error = %e,
                    stage = "enrich",
                    "Enrichment failed"
                );
                let content_type = guessed_mime.as_deref().unwrap_or(FALLBACK_CONTENT_TYPE);
                return self
                    .quarantine_record(
                        event,
                        file_name,
                        content_type,
                        ENRICHMENT_FAILED_CODE,
                        &e.to_string(),
                    )
                    .await;
            }
        };

        match self.catalog.create_image(&record).await {
            Ok(image_id) => {
                tracing::info!(
                    bucket = %event.bucket,
                    key = %event.key,
                    content_hash = %record.content_hash,
                    image_id = %image_id,
                    stage = "register",
                    "Record registered with catalog"
                );

                let derivatives = match generate_derivatives(
                    &local_path,
                    scratch,
                    &self.config.variants,
                    &record.content_hash,
                    &record.file_type_extension,
                )
                .await
                {
                    Ok(derivatives) => derivatives,
                    Err(e) => {
                        // Reported through the distribution outcome below;
                        // the by-reference copies can still proceed.
                        tracing::error!(
                            bucket = %event.bucket,
                            key = %event.key,
                            content_hash = %record.content_hash,
                            error = %e,
                            stage = "derive",
                            "Derivative generation failed"
                        );
                        Default::default()
                    }
                };

                let report = distribute(
                    self.store.as_ref(),
                    &record,
                    &derivatives,
                    &self.config.variants,
                )
                .await;

                RecordOutcome::Ingested {
                    content_hash: record.content_hash,
                    distribution_failures: report.failure_count(),
                }
            }
            Err(failure) => {
                tracing::warn!(
                    bucket = %event.bucket,
                    key = %event.key,
                    content_hash = %record.content_hash,
                    error_count = failure.errors.len(),
                    stage = "register",
                    "Catalog rejected record"
                );
                match quarantine(
                    self.store.as_ref(),
                    &event.bucket,
                    &event.key,
                    file_name,
                    &record.mime_type,
                    &failure.errors,
                    &self.config.dead_letter_bucket,
                )
                .await
                {
                    Ok(key) => RecordOutcome::Quarantined {
                        dead_letter_key: key,
                    },
                    Err(e) => {
                        tracing::error!(
                            bucket = %event.bucket,
                            key = %event.key,
                            error = %e,
                            stage = "quarantine",
                            "Dead-letter copy failed"
                        );
                        RecordOutcome::Failed {
                            stage: "quarantine",
                            message: e.to_string(),
                        }
                    }
                }
            }
        }
    }

    /// Dead-letter a record that failed before registration, under a
    /// synthetic error code.
    async fn quarantine_record(
        &self,
        event: &IngestEvent,
        file_name: &str,
        content_type: &str,
        code: &str,
        message: &str,
    ) -> RecordOutcome {
        let errors = [CatalogError {
            message: message.to_string(),
            code: Some(code.to_string()),
        }];

        match quarantine(
            self.store.as_ref(),
            &event.bucket,
            &event.key,
            file_name,
            content_type,
            &errors,
            &self.config.dead_letter_bucket,
        )
        .await
        {
            Ok(key) => RecordOutcome::Quarantined {
                dead_letter_key: key,
            },
            Err(e) => {
                tracing::error!(
                    bucket = %event.bucket,
                    key = %event.key,
                    error = %e,
                    stage = "quarantine",
                    "Dead-letter copy failed"
                );
                RecordOutcome::Failed {
                    stage: "quarantine",
                    message: e.to_string(),
                }
            }
        }
    }

    async fn redirect_batch(&self, event: &IngestEvent, file_name: &str) -> RecordOutcome {
        let payload = serde_json::json!({
            "Bucket": event.bucket,
            "Key": event.key,
            "FileName": file_name,
        });

        match self.batch_queue.send(payload).await {
            Ok(()) => RecordOutcome::Enqueued,
            Err(e) => {
                tracing::error!(
                    bucket = %event.bucket,
                    key = %event.key,
                    error = %e,
                    stage = "enqueue",
                    "Batch redirect failed"
                );
                RecordOutcome::Failed {
                    stage: "enqueue",
                    message: e.to_string(),
                }
            }
        }
    }

    /// Delete the staging object. Failures are logged and never mask the
    /// record's primary outcome.
    async fn cleanup(&self, event: &IngestEvent) {
        tracing::info!(
            bucket = %event.bucket,
            key = %event.key,
            stage = "cleanup",
            "Deleting staging object"
        );
        if let Err(e) = self.store.delete(&event.bucket, &event.key).await {
            tracing::warn!(
                bucket = %event.bucket,
                key = %event.key,
                error = %e,
                stage = "cleanup",
                "Failed to delete staging object"
            );
        }
    }
}
