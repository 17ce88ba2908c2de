//! Trapline Ingest Library
//!
//! The ingestion orchestration layer: fetch, enrich, register, distribute,
//! quarantine, batch redirect, and the per-record state machine that ties
//! them together. The service binary in this crate polls the notification
//! queue and drives batches through [`IngestPipeline`].

pub mod distribute;
pub mod enrich;
pub mod fetch;
pub mod orchestrator;
pub mod quarantine;
pub mod queue;
pub mod registrar;
pub mod worker;

// Re-export commonly used types
pub use distribute::{distribute, DistributionReport};
pub use enrich::{enrich, EnrichError};
pub use orchestrator::{IngestPipeline, RecordOutcome};
pub use queue::{BatchQueue, QueueError, SqsBatchQueue};
pub use registrar::{CatalogClient, CatalogError, GraphqlCatalogClient, RegistrationFailure};
pub use worker::IngestWorker;
