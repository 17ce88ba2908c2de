//! Shared fakes and fixtures for pipeline integration tests.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};

use trapline_core::{ImageRecord, IngestConfig};
use trapline_ingest::{
    BatchQueue, CatalogClient, CatalogError, IngestPipeline, QueueError, RegistrationFailure,
};
use trapline_processing::{ExtractError, MetadataExtractor};
use trapline_storage::MemoryBlobStore;

pub fn test_config(record_timeout_secs: u64) -> IngestConfig {
    IngestConfig {
        api_url: "https://catalog.example/graphql".to_string(),
        api_key: "test-key".to_string(),
        batch_queue: "batch-queue".to_string(),
        archive_bucket: "archive".to_string(),
        serving_bucket: "serving".to_string(),
        dead_letter_bucket: "dead-letter".to_string(),
        notify_queue_url: "https://sqs.example/notify".to_string(),
        exiftool_path: "exiftool".to_string(),
        s3_endpoint: None,
        record_timeout_secs,
        registration_max_retries: 3,
        sqs_wait_time_secs: 20,
        variants: trapline_core::config::default_variants(),
    }
}

/// Deterministic RGB test image encoded in the given container format.
pub fn encode_test_image(format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8 * 4, y as u8 * 5, 60]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    buffer
}

/// The extraction result every camera upload in these tests starts from.
pub fn base_tags() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "DateTimeOriginal".to_string(),
        "2021:06:01 04:30:00".to_string(),
    )])
}

pub enum ExtractorMode {
    Tags(BTreeMap<String, String>),
    Fail,
    Delay(Duration),
}

pub struct FakeExtractor {
    mode: ExtractorMode,
}

impl FakeExtractor {
    pub fn new(mode: ExtractorMode) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl MetadataExtractor for FakeExtractor {
    async fn extract(&self, _path: &Path) -> Result<BTreeMap<String, String>, ExtractError> {
        match &self.mode {
            ExtractorMode::Tags(tags) => Ok(tags.clone()),
            ExtractorMode::Fail => Err(ExtractError::Parse("corrupt image".to_string())),
            ExtractorMode::Delay(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(BTreeMap::new())
            }
        }
    }
}

pub enum CatalogMode {
    Succeed,
    Reject(Vec<CatalogError>),
}

pub struct FakeCatalog {
    mode: CatalogMode,
    pub calls: AtomicUsize,
    pub records: Mutex<Vec<ImageRecord>>,
}

impl FakeCatalog {
    pub fn new(mode: CatalogMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn create_image(&self, record: &ImageRecord) -> Result<String, RegistrationFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(record.clone());
        match &self.mode {
            CatalogMode::Succeed => Ok(format!("img-{}", call)),
            CatalogMode::Reject(errors) => Err(RegistrationFailure {
                errors: errors.clone(),
            }),
        }
    }
}

#[derive(Default)]
pub struct FakeQueue {
    pub payloads: Mutex<Vec<serde_json::Value>>,
}

#[async_trait]
impl BatchQueue for FakeQueue {
    async fn send(&self, payload: serde_json::Value) -> Result<(), QueueError> {
        self.payloads.lock().unwrap().push(payload);
        Ok(())
    }
}

pub struct TestHarness {
    pub store: MemoryBlobStore,
    pub catalog: Arc<FakeCatalog>,
    pub queue: Arc<FakeQueue>,
    pub pipeline: IngestPipeline,
}

/// Wire a pipeline against in-memory collaborators.
pub fn harness(extractor: FakeExtractor, catalog: FakeCatalog, config: IngestConfig) -> TestHarness {
    let store = MemoryBlobStore::new();
    let catalog = Arc::new(catalog);
    let queue = Arc::new(FakeQueue::default());

    let pipeline = IngestPipeline::new(
        Arc::new(store.clone()),
        Arc::new(extractor),
        catalog.clone(),
        queue.clone(),
        config,
    );

    TestHarness {
        store,
        catalog,
        queue,
        pipeline,
    }
}
