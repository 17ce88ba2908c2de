//! Trapline Storage Library
//!
//! Blob-store abstraction and backends for the ingestion pipeline.
//!
//! Unlike a single-bucket media store, every operation here is addressed by
//! `(bucket, key)`: one pipeline run touches the staging, archive, serving,
//! and dead-letter buckets, and relies on server-side copy-by-reference
//! between them.

pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use memory::MemoryBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{BlobStore, StorageError, StorageResult};
