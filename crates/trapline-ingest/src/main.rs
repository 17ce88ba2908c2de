//! Trapline ingest service: wires configuration, storage, the extractor, the
//! catalog client, and the batch queue into the pipeline, then runs the
//! notification poll loop.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trapline_core::IngestConfig;
use trapline_ingest::{GraphqlCatalogClient, IngestPipeline, IngestWorker, SqsBatchQueue};
use trapline_processing::ExifToolExtractor;
use trapline_storage::S3BlobStore;

fn init_telemetry() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "trapline=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry();

    let config = IngestConfig::from_env()?;

    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = Arc::new(S3BlobStore::new(config.s3_endpoint.clone()).await?);
    let extractor = Arc::new(ExifToolExtractor::new(config.exiftool_path.clone()));
    let catalog = Arc::new(GraphqlCatalogClient::new(
        config.api_url.clone(),
        config.api_key.clone(),
        config.registration_max_retries,
    ));
    let sqs = aws_sdk_sqs::Client::new(&aws);
    let batch_queue = Arc::new(SqsBatchQueue::new(sqs.clone(), config.batch_queue.clone()));

    let queue_url = config.notify_queue_url.clone();
    let wait_time = config.sqs_wait_time_secs;
    let pipeline = Arc::new(IngestPipeline::new(
        store,
        extractor,
        catalog,
        batch_queue,
        config,
    ));

    IngestWorker::new(sqs, pipeline, queue_url, wait_time)
        .run()
        .await
}
