//! Configuration module
//!
//! Provides the [`IngestConfig`] struct consumed by the ingestion pipeline.
//! Configuration is resolved once at startup from the process environment and
//! passed into the orchestrator at construction; pipeline code never reads
//! the environment directly.

use std::env;

use crate::models::SizeVariant;

const RECORD_TIMEOUT_SECS: u64 = 300;
const REGISTRATION_MAX_RETRIES: u32 = 3;
const SQS_WAIT_TIME_SECS: i32 = 20;
const EXIFTOOL_PATH: &str = "exiftool";

/// Resolved configuration for one pipeline instance.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    /// Catalog API endpoint accepting the image-registration mutation.
    pub api_url: String,
    /// API key sent as `x-api-key` on registration requests.
    pub api_key: String,
    /// Name of the queue receiving redirected batch (`.zip`) submissions.
    pub batch_queue: String,
    /// Bucket receiving the provenance-preserving archive copy.
    pub archive_bucket: String,
    /// Bucket receiving the serving variants.
    pub serving_bucket: String,
    /// Bucket receiving dead-lettered records.
    pub dead_letter_bucket: String,
    /// URL of the queue delivering storage-upload notifications to the worker.
    pub notify_queue_url: String,
    /// Path to the external exiftool binary.
    pub exiftool_path: String,
    /// Custom S3 endpoint for S3-compatible providers (MinIO etc.).
    pub s3_endpoint: Option<String>,
    /// Upper bound on fetch+extract+enrich+register for a single record.
    pub record_timeout_secs: u64,
    /// Attempts for the registration call before routing to quarantine.
    pub registration_max_retries: u32,
    /// SQS long-poll wait time for the notification queue.
    pub sqs_wait_time_secs: i32,
    /// Serving size variants. The `original` variant has no dimensions and is
    /// copied by reference at distribution time.
    pub variants: Vec<SizeVariant>,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let variants = match env::var("IMAGE_VARIANTS") {
            Ok(spec) => parse_variants(&spec)?,
            Err(_) => default_variants(),
        };

        let config = IngestConfig {
            api_url: env::var("API_URL")
                .map_err(|_| anyhow::anyhow!("API_URL must be set"))?,
            api_key: env::var("API_KEY")
                .map_err(|_| anyhow::anyhow!("API_KEY must be set"))?,
            batch_queue: env::var("BATCH_QUEUE")
                .map_err(|_| anyhow::anyhow!("BATCH_QUEUE must be set"))?,
            archive_bucket: env::var("ARCHIVE_BUCKET")
                .map_err(|_| anyhow::anyhow!("ARCHIVE_BUCKET must be set"))?,
            serving_bucket: env::var("SERVING_BUCKET")
                .map_err(|_| anyhow::anyhow!("SERVING_BUCKET must be set"))?,
            dead_letter_bucket: env::var("DEAD_LETTER_BUCKET")
                .map_err(|_| anyhow::anyhow!("DEAD_LETTER_BUCKET must be set"))?,
            notify_queue_url: env::var("NOTIFY_QUEUE_URL")
                .map_err(|_| anyhow::anyhow!("NOTIFY_QUEUE_URL must be set"))?,
            exiftool_path: env::var("EXIFTOOL_PATH")
                .unwrap_or_else(|_| EXIFTOOL_PATH.to_string()),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            record_timeout_secs: env::var("RECORD_TIMEOUT_SECS")
                .unwrap_or_else(|_| RECORD_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(RECORD_TIMEOUT_SECS),
            registration_max_retries: env::var("REGISTRATION_MAX_RETRIES")
                .unwrap_or_else(|_| REGISTRATION_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(REGISTRATION_MAX_RETRIES),
            sqs_wait_time_secs: env::var("SQS_WAIT_TIME_SECS")
                .unwrap_or_else(|_| SQS_WAIT_TIME_SECS.to_string())
                .parse()
                .unwrap_or(SQS_WAIT_TIME_SECS),
            variants,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!("API_URL must be an http(s) URL"));
        }

        if self.record_timeout_secs == 0 {
            return Err(anyhow::anyhow!("RECORD_TIMEOUT_SECS must be greater than zero"));
        }

        if self.registration_max_retries == 0 {
            return Err(anyhow::anyhow!(
                "REGISTRATION_MAX_RETRIES must be greater than zero"
            ));
        }

        if !self.variants.iter().any(|v| v.max_dims.is_none()) {
            return Err(anyhow::anyhow!(
                "IMAGE_VARIANTS must include an undimensioned original variant"
            ));
        }

        Ok(())
    }
}

/// The stock variant set: the untouched original plus two bounded sizes.
pub fn default_variants() -> Vec<SizeVariant> {
    vec![
        SizeVariant::original(),
        SizeVariant::bounded("medium", 940, 940),
        SizeVariant::bounded("small", 120, 120),
    ]
}

/// Parse an `IMAGE_VARIANTS` spec such as `"medium=940x940,small=120x120"`.
///
/// The undimensioned `original` variant is always included and need not be
/// listed.
fn parse_variants(spec: &str) -> Result<Vec<SizeVariant>, anyhow::Error> {
    let mut variants = vec![SizeVariant::original()];
    for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, dims) = entry
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid variant entry: {}", entry))?;
        let (w, h) = dims
            .split_once('x')
            .ok_or_else(|| anyhow::anyhow!("invalid variant dimensions: {}", entry))?;
        let width: u32 = w
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid variant width: {}", entry))?;
        let height: u32 = h
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid variant height: {}", entry))?;
        variants.push(SizeVariant::bounded(name.trim(), width, height));
    }
    Ok(variants)
}
